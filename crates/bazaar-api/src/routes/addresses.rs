use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use bazaar_engine::embedded;
use bazaar_engine::{require, with_parent};
use bson::{Bson, DateTime};
use serde_json::Value;

use crate::auth::Caller;
use crate::entities::{DELIVERY_ADDRESSES, USERS};
use crate::error::ApiError;
use crate::input::non_negative;
use crate::state::{AppState, blocking};
use crate::wire::{self, JsonBody};

pub async fn create(
    State(state): State<AppState>,
    caller: Caller,
    JsonBody(body): JsonBody<Value>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    blocking(move || {
        let mut address = wire::body_document(body)?;
        address.remove("_id");
        non_negative(&address, "pincode")?;
        let now = DateTime::now();
        address.insert("createdAt", now);
        address.insert("updatedAt", now);

        let users = state.collection(USERS);
        let (added, _) = with_parent(users.as_ref(), &caller.id, "User", |user| {
            let id = embedded::push(user, DELIVERY_ADDRESSES, address);
            Ok(embedded::find(user, DELIVERY_ADDRESSES, &id)?.clone())
        })?;
        Ok((
            StatusCode::CREATED,
            wire::message_with("Delivery address added successfully", "deliveryAddress", added),
        ))
    })
    .await
}

pub async fn list(State(state): State<AppState>, caller: Caller) -> Result<Json<Value>, ApiError> {
    blocking(move || {
        let user = require(state.collection(USERS).as_ref(), &caller.id, "User")?;
        let addresses = match user.get(DELIVERY_ADDRESSES.field) {
            Some(Bson::Array(items)) => items.clone(),
            _ => Vec::new(),
        };
        Ok(Json(serde_json::json!({
            "deliveryAddresses": wire::to_json(Bson::Array(addresses)),
        })))
    })
    .await
}

pub async fn get(
    State(state): State<AppState>,
    caller: Caller,
    Path(address_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    blocking(move || {
        let id = wire::path_id(&address_id, DELIVERY_ADDRESSES.entity)?;
        let user = require(state.collection(USERS).as_ref(), &caller.id, "User")?;
        let address = embedded::find(&user, DELIVERY_ADDRESSES, &id)?;
        Ok(Json(wire::doc_json(address.clone())))
    })
    .await
}

pub async fn update(
    State(state): State<AppState>,
    caller: Caller,
    Path(address_id): Path<String>,
    JsonBody(body): JsonBody<Value>,
) -> Result<Json<Value>, ApiError> {
    blocking(move || {
        let id = wire::path_id(&address_id, DELIVERY_ADDRESSES.entity)?;
        let mut patch = wire::body_document(body)?;
        patch.remove("createdAt");
        non_negative(&patch, "pincode")?;
        patch.insert("updatedAt", DateTime::now());

        let users = state.collection(USERS);
        let (updated, _) = with_parent(users.as_ref(), &caller.id, "User", |user| {
            Ok(embedded::update(user, DELIVERY_ADDRESSES, &id, patch)?.clone())
        })?;
        Ok(wire::message_with(
            "Delivery address updated successfully",
            "deliveryAddress",
            updated,
        ))
    })
    .await
}

pub async fn delete(
    State(state): State<AppState>,
    caller: Caller,
    Path(address_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    blocking(move || {
        let id = wire::path_id(&address_id, DELIVERY_ADDRESSES.entity)?;
        let users = state.collection(USERS);
        with_parent(users.as_ref(), &caller.id, "User", |user| {
            embedded::remove(user, DELIVERY_ADDRESSES, &id)
        })?;
        Ok(wire::message("Delivery address deleted successfully"))
    })
    .await
}
