//! JSON ⇄ BSON at the HTTP boundary.
//!
//! Responses render ObjectIds as hex strings and datetimes as RFC 3339.
//! Request bodies map JSON integers to `Int32` when they fit, otherwise
//! `Int64`, and other numbers to `Double`. Strings are never reinterpreted as
//! ids; handlers convert reference fields explicitly.

use axum::Json;
use axum::extract::{FromRequest, Request};
use bson::oid::ObjectId;
use bson::{Bson, Document};
use serde::de::DeserializeOwned;
use serde_json::{Map, Number, Value};

use crate::error::ApiError;

pub fn to_json(value: Bson) -> Value {
    match value {
        Bson::Null | Bson::Undefined => Value::Null,
        Bson::Boolean(b) => Value::Bool(b),
        Bson::Int32(n) => Value::from(n),
        Bson::Int64(n) => Value::from(n),
        Bson::Double(n) => Number::from_f64(n).map(Value::Number).unwrap_or(Value::Null),
        Bson::String(s) => Value::String(s),
        Bson::ObjectId(id) => Value::String(id.to_hex()),
        Bson::DateTime(dt) => match dt.try_to_rfc3339_string() {
            Ok(s) => Value::String(s),
            Err(_) => Value::from(dt.timestamp_millis()),
        },
        Bson::Array(items) => Value::Array(items.into_iter().map(to_json).collect()),
        Bson::Document(doc) => doc_json(doc),
        other => Value::String(other.to_string()),
    }
}

pub fn doc_json(doc: Document) -> Value {
    Value::Object(doc.into_iter().map(|(k, v)| (k, to_json(v))).collect::<Map<_, _>>())
}

pub fn docs_json(docs: Vec<Document>) -> Value {
    Value::Array(docs.into_iter().map(doc_json).collect())
}

pub fn from_json(value: Value) -> Bson {
    match value {
        Value::Null => Bson::Null,
        Value::Bool(b) => Bson::Boolean(b),
        Value::Number(n) => match n.as_i64() {
            Some(i) => match i32::try_from(i) {
                Ok(small) => Bson::Int32(small),
                Err(_) => Bson::Int64(i),
            },
            None => Bson::Double(n.as_f64().unwrap_or(f64::NAN)),
        },
        Value::String(s) => Bson::String(s),
        Value::Array(items) => Bson::Array(items.into_iter().map(from_json).collect()),
        Value::Object(map) => Bson::Document(map.into_iter().map(|(k, v)| (k, from_json(v))).collect()),
    }
}

/// A request body that must be a JSON object.
pub fn body_document(value: Value) -> Result<Document, ApiError> {
    match from_json(value) {
        Bson::Document(doc) => Ok(doc),
        _ => Err(ApiError::bad_request("request body must be a JSON object")),
    }
}

/// `Json<T>` whose rejections become 400 responses in the usual error shape.
pub struct JsonBody<T>(pub T);

impl<S, T> FromRequest<S> for JsonBody<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|e| ApiError::bad_request(e.body_text()))?;
        Ok(JsonBody(value))
    }
}

/// Path id. A malformed id cannot name an existing document, so it is
/// reported as not found.
pub fn path_id(raw: &str, entity: &str) -> Result<ObjectId, ApiError> {
    ObjectId::parse_str(raw.trim()).map_err(|_| ApiError::not_found(entity))
}

/// Id supplied in a request body.
pub fn body_id(raw: &str, name: &str) -> Result<ObjectId, ApiError> {
    ObjectId::parse_str(raw.trim()).map_err(|_| ApiError::bad_request(format!("Invalid {name}")))
}

/// `{ "message": msg, key: doc }`
pub fn message_with(msg: &str, key: &str, doc: Document) -> Json<Value> {
    let mut out = Map::new();
    out.insert("message".into(), Value::String(msg.into()));
    out.insert(key.into(), doc_json(doc));
    Json(Value::Object(out))
}

pub fn message(msg: &str) -> Json<Value> {
    Json(serde_json::json!({ "message": msg }))
}

/// `{ key: doc }`
pub fn wrapped(key: &str, doc: Document) -> Json<Value> {
    let mut out = Map::new();
    out.insert(key.into(), doc_json(doc));
    Json(Value::Object(out))
}
