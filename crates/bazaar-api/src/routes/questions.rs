use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use bazaar_engine::{Projection, paginate, populate, require};
use bazaar_query::{
    Clause, CommonField, FilterSpec, PageSpec, Query, Sort, parse_fuzzy, parse_one_of, parse_sort,
};
use bazaar_store::Collection;
use bson::oid::ObjectId;
use bson::{Bson, Document, doc};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::info;

use crate::auth::Caller;
use crate::entities::{
    ANSWERS, AUTHOR, AnswerField, QUESTION_LISTING, QUESTIONS, QuestionField, USERS,
};
use crate::error::ApiError;
use crate::input::{as_number, max_chars, normalise_tags, optional_str, required_str};
use crate::params::QueryParams;
use crate::state::{AppState, blocking};
use crate::wire::{self, JsonBody};

const TITLE_MAX: usize = 150;
const DESCRIPTION_MAX: usize = 2000;

/// Author cards on the question, its answers, and the answers' authors.
fn populate_thread(state: &AppState, docs: &mut [Document]) -> Result<(), ApiError> {
    let users = state.collection(USERS);
    populate(users.as_ref(), docs, "user", AUTHOR)?;
    populate(state.collection(ANSWERS).as_ref(), docs, "answers", Projection::All)?;
    populate(users.as_ref(), docs, "answers.user", AUTHOR)?;
    Ok(())
}

/// Only the author-editable fields, validated.
fn question_fields(body: Value, creating: bool) -> Result<Document, ApiError> {
    let raw = wire::body_document(body)?;
    let mut out = Document::new();
    if creating || raw.contains_key("title") {
        let title = required_str(&raw, "title")?;
        max_chars(title, TITLE_MAX, "Title")?;
        out.insert("title", title.trim());
    }
    if let Some(description) = optional_str(&raw, "description")? {
        max_chars(description, DESCRIPTION_MAX, "Description")?;
        out.insert("description", description);
    }
    if let Some(tags) = raw.get("tags") {
        out.insert("tags", tags.clone());
        normalise_tags(&mut out)?;
    }
    Ok(out)
}

pub async fn create(
    State(state): State<AppState>,
    caller: Caller,
    JsonBody(body): JsonBody<Value>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    blocking(move || {
        let mut question = question_fields(body, true)?;
        question.insert("user", caller.id);
        question.insert("answers", Bson::Array(Vec::new()));
        question.insert("views", 0);
        question.insert("votes", 0);

        let saved = state.collection(QUESTIONS).insert(question)?;
        info!(question = ?saved.get("_id"), user = %caller.id, "question created");
        Ok((
            StatusCode::CREATED,
            wire::message_with("Question created successfully", "question", saved),
        ))
    })
    .await
}

/// `search`, `tags`, and `user` (questions that user has answered).
pub async fn list(
    State(state): State<AppState>,
    QueryParams(params): QueryParams,
) -> Result<Json<Value>, ApiError> {
    blocking(move || {
        let mut filter = FilterSpec::new()
            .maybe(parse_fuzzy(
                &params,
                "search",
                &[QuestionField::Title, QuestionField::Description],
            ))
            .maybe(parse_one_of(&params, "tags", QuestionField::Tags));

        if let Some(raw) = params.first("user") {
            // An unknown or malformed id matches no answers, hence no questions.
            let answered: Vec<Bson> = match ObjectId::parse_str(raw.trim()) {
                Ok(user) => state
                    .collection(ANSWERS)
                    .find(&Query::new(
                        FilterSpec::new().with(Clause::equals(AnswerField::User, user)),
                    ))?
                    .iter()
                    .filter_map(|answer| answer.get("question").cloned())
                    .collect(),
                Err(_) => Vec::new(),
            };
            filter.push(Clause::one_of(CommonField::Id, answered));
        }

        let sort = parse_sort(
            &params,
            &[QuestionField::CreatedAt, QuestionField::Votes, QuestionField::Views],
            Sort::newest_first(),
        );
        let mut page = paginate(
            state.collection(QUESTIONS).as_ref(),
            &filter,
            &[sort],
            PageSpec::from_params(&params),
        )?;
        populate_thread(&state, &mut page.items)?;
        Ok(Json(wire::doc_json(page.envelope(QUESTION_LISTING))))
    })
    .await
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ByIds {
    #[serde(default)]
    question_ids: Vec<String>,
}

pub async fn by_ids(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<ByIds>,
) -> Result<Json<Value>, ApiError> {
    blocking(move || {
        if body.question_ids.is_empty() {
            return Err(ApiError::bad_request(
                "Please provide a valid array of question IDs",
            ));
        }
        let ids = body
            .question_ids
            .iter()
            .map(|raw| wire::body_id(raw, "question id"))
            .collect::<Result<Vec<_>, _>>()?;

        let mut questions = state.collection(QUESTIONS).get_many(&ids)?;
        if questions.is_empty() {
            return Err(ApiError::NotFound(
                "No questions found for the given IDs".into(),
            ));
        }
        populate_thread(&state, &mut questions)?;
        Ok(Json(json!({ "questions": wire::docs_json(questions) })))
    })
    .await
}

/// Reading a question counts as a view.
pub async fn get(
    State(state): State<AppState>,
    Path(question_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    blocking(move || {
        let id = wire::path_id(&question_id, "Question")?;
        let questions = state.collection(QUESTIONS);
        let current = require(questions.as_ref(), &id, "Question")?;
        let views = current.get("views").and_then(as_number).unwrap_or(0.0) as i64 + 1;
        let question = questions
            .update(&id, doc! { "views": views })?
            .ok_or_else(|| ApiError::not_found("Question"))?;

        let mut docs = [question];
        populate_thread(&state, &mut docs)?;
        let [question] = docs;
        Ok(wire::wrapped("question", question))
    })
    .await
}

pub async fn update(
    State(state): State<AppState>,
    caller: Caller,
    Path(question_id): Path<String>,
    JsonBody(body): JsonBody<Value>,
) -> Result<Json<Value>, ApiError> {
    blocking(move || {
        let id = wire::path_id(&question_id, "Question")?;
        let questions = state.collection(QUESTIONS);
        let question = require(questions.as_ref(), &id, "Question")?;
        caller.ensure_owner(&question, "user", "Unauthorized to update this question")?;

        let patch = question_fields(body, false)?;
        let saved = questions
            .update(&id, patch)?
            .ok_or_else(|| ApiError::not_found("Question"))?;
        Ok(wire::message_with("Question updated successfully", "question", saved))
    })
    .await
}

pub async fn delete(
    State(state): State<AppState>,
    caller: Caller,
    Path(question_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    blocking(move || {
        let id = wire::path_id(&question_id, "Question")?;
        let questions = state.collection(QUESTIONS);
        let question = require(questions.as_ref(), &id, "Question")?;
        caller.ensure_owner(&question, "user", "Unauthorized to delete this question")?;

        let answers = state
            .collection(ANSWERS)
            .delete_where(&FilterSpec::new().with(Clause::equals(AnswerField::Question, id)))?;
        questions.delete(&id)?;
        info!(question = %id, answers, "question deleted");
        Ok(wire::message(
            "Question and associated answers deleted successfully",
        ))
    })
    .await
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vote {
    vote_type: String,
}

pub async fn vote(
    State(state): State<AppState>,
    _caller: Caller,
    Path(question_id): Path<String>,
    JsonBody(body): JsonBody<Vote>,
) -> Result<Json<Value>, ApiError> {
    let delta: i64 = match body.vote_type.as_str() {
        "upvote" => 1,
        "downvote" => -1,
        _ => return Err(ApiError::bad_request("Invalid vote type")),
    };
    blocking(move || {
        let id = wire::path_id(&question_id, "Question")?;
        let questions = state.collection(QUESTIONS);
        let question = require(questions.as_ref(), &id, "Question")?;
        let votes = question.get("votes").and_then(as_number).unwrap_or(0.0) as i64 + delta;
        questions.update(&id, doc! { "votes": votes })?;
        Ok(Json(json!({ "message": "Vote updated successfully", "votes": votes })))
    })
    .await
}
