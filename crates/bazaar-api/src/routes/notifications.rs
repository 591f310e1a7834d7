use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use bazaar_engine::{paginate, require};
use bazaar_query::{Clause, Field, FilterSpec, PageSpec, Sort};
use bazaar_store::Collection;
use bson::Document;
use bson::oid::ObjectId;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::info;

use crate::auth::Caller;
use crate::entities::{NOTIFICATION_LISTING, NOTIFICATIONS, NotificationField, USERS};
use crate::error::ApiError;
use crate::notify::PushMessage;
use crate::params::QueryParams;
use crate::state::{AppState, blocking};
use crate::wire::{self, JsonBody};

/// The caller's own notification history, newest first.
pub async fn list(
    State(state): State<AppState>,
    caller: Caller,
    QueryParams(params): QueryParams,
) -> Result<Json<Value>, ApiError> {
    blocking(move || {
        let filter = FilterSpec::new().with(Clause::equals(NotificationField::User, caller.id));
        let page = paginate(
            state.collection(NOTIFICATIONS).as_ref(),
            &filter,
            &[Sort::desc(NotificationField::SentAt)],
            PageSpec::from_params(&params),
        )?;
        Ok(Json(wire::doc_json(page.envelope(NOTIFICATION_LISTING))))
    })
    .await
}

/// The device token registered on a user, when there is a usable one.
fn stored_token(user: &Document) -> Option<&str> {
    user.get_str("token")
        .ok()
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceSend {
    user_id: String,
    title: String,
    body: String,
}

/// Push to the device registered on one user.
pub async fn device(
    State(state): State<AppState>,
    caller: Caller,
    JsonBody(req): JsonBody<DeviceSend>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    caller.require_admin()?;
    blocking(move || {
        let user_id = wire::body_id(&req.user_id, "userId")?;
        let user = state.collection(USERS).get(&user_id)?;
        let token = user
            .as_ref()
            .and_then(stored_token)
            .ok_or_else(|| ApiError::NotFound("User or token not found".into()))?;
        let message = PushMessage {
            title: req.title,
            body: req.body,
        };
        let records = state.collection(NOTIFICATIONS);
        let sent = state
            .notifier
            .send_to_device(records.as_ref(), user_id, token, &message)?;
        Ok((
            StatusCode::CREATED,
            wire::message_with("Notification sent successfully", "notification", sent),
        ))
    })
    .await
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MulticastSend {
    #[serde(default)]
    user_ids: Vec<String>,
    title: String,
    body: String,
}

/// Push to every listed user that has a registered device. Users without
/// one, or unknown ids, come back in `skippedUsers`.
pub async fn devices(
    State(state): State<AppState>,
    caller: Caller,
    JsonBody(req): JsonBody<MulticastSend>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    caller.require_admin()?;
    blocking(move || {
        if req.user_ids.is_empty() {
            return Err(ApiError::bad_request("Please provide a valid array of user IDs"));
        }
        let requested = req
            .user_ids
            .iter()
            .map(|raw| wire::body_id(raw, "userId"))
            .collect::<Result<Vec<_>, _>>()?;

        let found = state.collection(USERS).get_many(&requested)?;
        let (users, tokens): (Vec<ObjectId>, Vec<String>) = found
            .iter()
            .filter_map(|user| {
                let id = user.get_object_id("_id").ok()?;
                Some((id, stored_token(user)?.to_owned()))
            })
            .unzip();
        if tokens.is_empty() {
            return Err(ApiError::bad_request(
                "No valid tokens found for the provided user IDs",
            ));
        }
        let skipped: Vec<String> = requested
            .iter()
            .filter(|id| !users.contains(id))
            .map(|id| id.to_hex())
            .collect();

        let message = PushMessage {
            title: req.title,
            body: req.body,
        };
        let records = state.collection(NOTIFICATIONS);
        let sent = state
            .notifier
            .send_to_devices(records.as_ref(), &users, &tokens, &message)?;
        info!(sent = sent.len(), skipped = skipped.len(), "multicast sent");
        Ok((
            StatusCode::CREATED,
            Json(json!({
                "message": "Notifications sent successfully",
                "notifications": wire::docs_json(sent),
                "skippedUsers": skipped,
            })),
        ))
    })
    .await
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicSend {
    topic: String,
    user_id: String,
    title: String,
    body: String,
}

pub async fn topic(
    State(state): State<AppState>,
    caller: Caller,
    JsonBody(req): JsonBody<TopicSend>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    caller.require_admin()?;
    blocking(move || {
        let user = wire::body_id(&req.user_id, "userId")?;
        let message = PushMessage {
            title: req.title,
            body: req.body,
        };
        let records = state.collection(NOTIFICATIONS);
        let sent = state
            .notifier
            .send_to_topic(records.as_ref(), user, &req.topic, &message)?;
        Ok((
            StatusCode::CREATED,
            wire::message_with("Notification sent successfully", "notification", sent),
        ))
    })
    .await
}

/// Owners and admins may delete a notification record.
pub async fn delete(
    State(state): State<AppState>,
    caller: Caller,
    Path(notification_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    blocking(move || {
        let id = wire::path_id(&notification_id, "Notification")?;
        let records = state.collection(NOTIFICATIONS);
        let record = require(records.as_ref(), &id, "Notification")?;
        caller.ensure_owner(
            &record,
            NotificationField::User.path(),
            "You can only delete your own notifications",
        )?;
        records.delete(&id)?;
        info!(notification = %id, by = %caller.id, "notification deleted");
        Ok(wire::message("Notification deleted successfully"))
    })
    .await
}
