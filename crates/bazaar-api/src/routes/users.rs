use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use bazaar_engine::embedded::assign_ids;
use bazaar_engine::require;
use bazaar_query::{Clause, FilterSpec};
use bazaar_store::Collection;
use bson::oid::ObjectId;
use bson::{Bson, Document};
use serde_json::Value;
use tracing::info;

use crate::auth::Caller;
use crate::entities::{DELIVERY_ADDRESSES, PUBLIC_USER, USER_ROLES, USERS, UserField};
use crate::error::ApiError;
use crate::input::{SERVER_MANAGED, optional_str, required_str, strip};
use crate::state::{AppState, blocking};
use crate::wire::{self, JsonBody};

/// Register a user. Credentials and OTP verification live elsewhere; this
/// stores the profile keyed by a unique phone number.
pub async fn create(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<Value>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    blocking(move || {
        let users = state.collection(USERS);
        let mut user = wire::body_document(body)?;
        strip(&mut user, SERVER_MANAGED);

        let phone = required_str(&user, "phoneNumber")?.trim().to_string();
        let role = optional_str(&user, "role")?
            .unwrap_or("Home Owner")
            .to_string();
        if !USER_ROLES.contains(&role.as_str()) {
            return Err(ApiError::bad_request(format!("Invalid role: {role}")));
        }

        let taken = FilterSpec::new().with(Clause::equals(UserField::PhoneNumber, phone.as_str()));
        let id = ObjectId::new();
        let hex = id.to_hex();
        user.insert("_id", id);
        user.insert("phoneNumber", phone);
        user.insert("customId", format!("{role}-{}", &hex[hex.len() - 10..]));
        user.insert("role", role);
        if !user.contains_key("deliveryAddresses") {
            user.insert("deliveryAddresses", Bson::Array(Vec::new()));
        }
        assign_ids(&mut user, &[DELIVERY_ADDRESSES.field]);

        let saved = users
            .insert_unless(user, &taken)?
            .ok_or_else(|| ApiError::bad_request("User already exists"))?;
        info!(user = %id, "user registered");
        Ok((
            StatusCode::CREATED,
            wire::message_with("User created successfully", "user", PUBLIC_USER.apply(saved)),
        ))
    })
    .await
}

pub async fn me(State(state): State<AppState>, caller: Caller) -> Result<Json<Value>, ApiError> {
    blocking(move || profile(&state, &caller.id)).await
}

pub async fn get(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    blocking(move || {
        let id = wire::path_id(&user_id, "User")?;
        profile(&state, &id)
    })
    .await
}

fn profile(state: &AppState, id: &ObjectId) -> Result<Json<Value>, ApiError> {
    let user: Document = require(state.collection(USERS).as_ref(), id, "User")?;
    Ok(Json(wire::doc_json(PUBLIC_USER.apply(user))))
}
