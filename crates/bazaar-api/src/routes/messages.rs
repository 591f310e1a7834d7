use std::collections::HashSet;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use bazaar_engine::{object_id, paginate_in_memory, populate, require};
use bazaar_query::{Clause, FilterSpec, PageSpec, Query, Sort};
use bazaar_store::Collection;
use bson::oid::ObjectId;
use bson::{Document, doc};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::info;

use crate::auth::Caller;
use crate::entities::{CONVERSATION_LISTING, MESSAGES, MessageField, PUBLIC_USER, USERS};
use crate::error::ApiError;
use crate::params::QueryParams;
use crate::state::{AppState, blocking};
use crate::wire::{self, JsonBody};

const NOT_YOURS: &str = "Message not found or not authorized";

fn between(a: ObjectId, b: ObjectId) -> FilterSpec {
    FilterSpec::new()
        .with(Clause::equals(MessageField::Sender, a))
        .with(Clause::equals(MessageField::Receiver, b))
}

fn involving(user: ObjectId) -> FilterSpec {
    FilterSpec::new().with(Clause::any(vec![
        FilterSpec::new().with(Clause::equals(MessageField::Sender, user)),
        FilterSpec::new().with(Clause::equals(MessageField::Receiver, user)),
    ]))
}

fn populate_parties(state: &AppState, messages: &mut [Document]) -> Result<(), ApiError> {
    let users = state.collection(USERS);
    populate(users.as_ref(), messages, "sender", PUBLIC_USER)?;
    populate(users.as_ref(), messages, "receiver", PUBLIC_USER)?;
    Ok(())
}

/// The message addressed by `raw` if `field` names the caller.
fn addressed(state: &AppState, caller: &Caller, raw: &str, field: &str) -> Result<ObjectId, ApiError> {
    let not_yours = || ApiError::NotFound(NOT_YOURS.into());
    let id = ObjectId::parse_str(raw.trim()).map_err(|_| not_yours())?;
    match state.collection(MESSAGES).get(&id)? {
        Some(message) if caller.owns(&message, field) => Ok(id),
        _ => Err(not_yours()),
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewMessage {
    receiver_id: String,
    content: String,
}

pub async fn send(
    State(state): State<AppState>,
    caller: Caller,
    JsonBody(body): JsonBody<NewMessage>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    blocking(move || {
        if body.content.trim().is_empty() {
            return Err(ApiError::bad_request("content is required"));
        }
        let receiver = wire::body_id(&body.receiver_id, "receiverId")?;
        require(state.collection(USERS).as_ref(), &receiver, "User")?;

        let message = state.collection(MESSAGES).insert(doc! {
            "sender": caller.id,
            "receiver": receiver,
            "content": body.content,
            "isRead": false,
        })?;
        info!(message = ?message.get("_id"), from = %caller.id, to = %receiver, "message sent");

        let mut docs = [message];
        populate_parties(&state, &mut docs)?;
        let [message] = docs;
        Ok((
            StatusCode::CREATED,
            wire::message_with("Message sent successfully", "data", message),
        ))
    })
    .await
}

/// Both directions of the conversation with `otherUserId`, oldest first.
pub async fn thread(
    State(state): State<AppState>,
    caller: Caller,
    QueryParams(params): QueryParams,
) -> Result<Json<Value>, ApiError> {
    blocking(move || {
        let raw = params
            .first("otherUserId")
            .ok_or_else(|| ApiError::bad_request("otherUserId is required"))?;
        let other = wire::body_id(raw, "otherUserId")?;

        let users = state.collection(USERS);
        let me = require(users.as_ref(), &caller.id, "User")?;
        let them = require(users.as_ref(), &other, "User")?;

        let filter = FilterSpec::new().with(Clause::any(vec![
            between(caller.id, other),
            between(other, caller.id),
        ]));
        let mut messages = state
            .collection(MESSAGES)
            .find(&Query::new(filter).sort(Sort::asc(MessageField::CreatedAt)))?;
        populate_parties(&state, &mut messages)?;

        Ok(Json(json!({
            "messages": wire::docs_json(messages),
            "sender": wire::doc_json(PUBLIC_USER.apply(me)),
            "receiver": wire::doc_json(PUBLIC_USER.apply(them)),
        })))
    })
    .await
}

/// The latest message with each counterpart, newest first.
pub async fn conversations(
    State(state): State<AppState>,
    caller: Caller,
    QueryParams(params): QueryParams,
) -> Result<Json<Value>, ApiError> {
    blocking(move || {
        let all = state
            .collection(MESSAGES)
            .find(&Query::new(involving(caller.id)).sort(Sort::desc(MessageField::CreatedAt)))?;

        let mut seen = HashSet::new();
        let latest: Vec<Document> = all
            .into_iter()
            .filter(|message| {
                let counterpart = if caller.owns(message, "sender") {
                    message.get("receiver")
                } else {
                    message.get("sender")
                };
                counterpart
                    .and_then(object_id)
                    .is_some_and(|id| seen.insert(id))
            })
            .collect();

        let mut page = paginate_in_memory(latest, PageSpec::from_params(&params));
        populate_parties(&state, &mut page.items)?;
        Ok(Json(wire::doc_json(page.envelope(CONVERSATION_LISTING))))
    })
    .await
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagePatch {
    is_read: bool,
}

/// Only the receiver may mark a message read or unread.
pub async fn update(
    State(state): State<AppState>,
    caller: Caller,
    Path(message_id): Path<String>,
    JsonBody(body): JsonBody<MessagePatch>,
) -> Result<Json<Value>, ApiError> {
    blocking(move || {
        let id = addressed(&state, &caller, &message_id, "receiver")?;
        let message = state
            .collection(MESSAGES)
            .update(&id, doc! { "isRead": body.is_read })?
            .ok_or_else(|| ApiError::NotFound(NOT_YOURS.into()))?;
        let mut docs = [message];
        populate_parties(&state, &mut docs)?;
        let [message] = docs;
        Ok(wire::message_with("Message updated successfully", "data", message))
    })
    .await
}

/// Only the sender may delete a message.
pub async fn delete(
    State(state): State<AppState>,
    caller: Caller,
    Path(message_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    blocking(move || {
        let id = addressed(&state, &caller, &message_id, "sender")?;
        state.collection(MESSAGES).delete(&id)?;
        Ok(wire::message("Message deleted successfully"))
    })
    .await
}
