//! Answers form a reply tree under a question: top-level answers have no
//! parent, replies point at the answer they reply to. Every answer id is also
//! listed on the question.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use bazaar_engine::{
    Projection, collect_subtree, link, object_id, paginate, populate, require, unlink, with_parent,
};
use bazaar_query::{Clause, FilterSpec, PageSpec, Sort};
use bazaar_store::Collection;
use bson::{Bson, Document, doc};
use serde::Deserialize;
use serde_json::Value;
use tracing::info;

use crate::auth::Caller;
use crate::entities::{ANSWER_LISTING, ANSWERS, AUTHOR, AnswerField, QUESTIONS, USERS};
use crate::error::ApiError;
use crate::input::max_chars;
use crate::params::QueryParams;
use crate::state::{AppState, blocking};
use crate::wire::{self, JsonBody};

const CONTENT_MAX: usize = 2000;

fn content(raw: &str) -> Result<&str, ApiError> {
    let text = raw.trim();
    if text.is_empty() {
        return Err(ApiError::bad_request("content is required"));
    }
    max_chars(text, CONTENT_MAX, "Content")?;
    Ok(text)
}

fn populate_replies(state: &AppState, docs: &mut [Document]) -> Result<(), ApiError> {
    let users = state.collection(USERS);
    populate(users.as_ref(), docs, "user", AUTHOR)?;
    populate(state.collection(ANSWERS).as_ref(), docs, "replies", Projection::All)?;
    populate(users.as_ref(), docs, "replies.user", AUTHOR)?;
    Ok(())
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAnswer {
    question_id: String,
    #[serde(default)]
    parent_id: Option<String>,
    content: String,
}

pub async fn create(
    State(state): State<AppState>,
    caller: Caller,
    JsonBody(body): JsonBody<NewAnswer>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    blocking(move || {
        let text = content(&body.content)?.to_string();
        let question_id = wire::body_id(&body.question_id, "questionId")?;
        let questions = state.collection(QUESTIONS);
        let answers = state.collection(ANSWERS);
        require(questions.as_ref(), &question_id, "Question")?;

        let parent_id = match body.parent_id.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => {
                let id = wire::body_id(raw, "parentId")?;
                let parent = require(answers.as_ref(), &id, "Parent answer")?;
                if parent.get("question").and_then(object_id) != Some(question_id) {
                    return Err(ApiError::bad_request(
                        "Parent answer does not belong to the specified question",
                    ));
                }
                Some(id)
            }
        };

        let answer = answers.insert(doc! {
            "question": question_id,
            "user": caller.id,
            "content": text,
            "parent": parent_id.map_or(Bson::Null, Bson::ObjectId),
            "replies": [],
            "votes": 0,
        })?;
        let answer_id = answer
            .get_object_id("_id")
            .map_err(|e| ApiError::Internal(format!("stored answer has no id: {e}")))?;

        if let Some(parent_id) = parent_id {
            with_parent(answers.as_ref(), &parent_id, "Parent answer", |parent| {
                link(parent, "replies", answer_id);
                Ok(())
            })?;
        }
        with_parent(questions.as_ref(), &question_id, "Question", |question| {
            link(question, "answers", answer_id);
            Ok(())
        })?;

        info!(answer = %answer_id, question = %question_id, "answer created");
        Ok((
            StatusCode::CREATED,
            wire::message_with("Answer created successfully", "answer", answer),
        ))
    })
    .await
}

/// Top-level answers of a question, newest first, with one level of replies.
pub async fn list_for_question(
    State(state): State<AppState>,
    Path(question_id): Path<String>,
    QueryParams(params): QueryParams,
) -> Result<Json<Value>, ApiError> {
    blocking(move || {
        let id = wire::path_id(&question_id, "Question")?;
        let question = require(state.collection(QUESTIONS).as_ref(), &id, "Question")?;

        let filter = FilterSpec::new()
            .with(Clause::equals(AnswerField::Question, id))
            .with(Clause::equals(AnswerField::Parent, Bson::Null));
        let mut page = paginate(
            state.collection(ANSWERS).as_ref(),
            &filter,
            &[Sort::newest_first()],
            PageSpec::from_params(&params),
        )?;
        populate_replies(&state, &mut page.items)?;

        let mut out = page.envelope(ANSWER_LISTING);
        out.insert("question", question);
        Ok(Json(wire::doc_json(out)))
    })
    .await
}

pub async fn get(
    State(state): State<AppState>,
    Path(answer_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    blocking(move || {
        let id = wire::path_id(&answer_id, "Answer")?;
        let answer = require(state.collection(ANSWERS).as_ref(), &id, "Answer")?;
        let mut docs = [answer];
        populate_replies(&state, &mut docs)?;
        let [answer] = docs;
        Ok(wire::wrapped("answer", answer))
    })
    .await
}

#[derive(Deserialize)]
pub struct AnswerPatch {
    content: Option<String>,
}

pub async fn update(
    State(state): State<AppState>,
    caller: Caller,
    Path(answer_id): Path<String>,
    JsonBody(body): JsonBody<AnswerPatch>,
) -> Result<Json<Value>, ApiError> {
    blocking(move || {
        let id = wire::path_id(&answer_id, "Answer")?;
        let answers = state.collection(ANSWERS);
        let answer = require(answers.as_ref(), &id, "Answer")?;
        if !caller.owns(&answer, "user") {
            return Err(ApiError::forbidden("Unauthorized to update this answer"));
        }

        let mut patch = Document::new();
        if let Some(raw) = body.content.as_deref() {
            patch.insert("content", content(raw)?);
        }
        let saved = answers
            .update(&id, patch)?
            .ok_or_else(|| ApiError::not_found("Answer"))?;
        Ok(wire::message_with("Answer updated successfully", "answer", saved))
    })
    .await
}

/// Removes the answer with every reply below it, and unhooks them from the
/// parent answer and the question.
pub async fn delete(
    State(state): State<AppState>,
    caller: Caller,
    Path(answer_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    blocking(move || {
        let id = wire::path_id(&answer_id, "Answer")?;
        let answers = state.collection(ANSWERS);
        let answer = require(answers.as_ref(), &id, "Answer")?;
        caller.ensure_owner(&answer, "user", "Unauthorized to delete this answer")?;

        let subtree = collect_subtree(answers.as_ref(), id, AnswerField::Parent)?;

        if let Some(parent_id) = answer.get("parent").and_then(object_id) {
            // A parent deleted out from under us needs no unlinking.
            if answers.get(&parent_id)?.is_some() {
                with_parent(answers.as_ref(), &parent_id, "Parent answer", |parent| {
                    Ok(unlink(parent, "replies", &[id]))
                })?;
            }
        }
        if let Some(question_id) = answer.get("question").and_then(object_id) {
            if state.collection(QUESTIONS).get(&question_id)?.is_some() {
                with_parent(
                    state.collection(QUESTIONS).as_ref(),
                    &question_id,
                    "Question",
                    |question| Ok(unlink(question, "answers", &subtree)),
                )?;
            }
        }

        let removed = answers.delete_many(&subtree)?;
        info!(answer = %id, removed, "answer tree deleted");
        Ok(wire::message("Answer and its replies deleted successfully"))
    })
    .await
}
