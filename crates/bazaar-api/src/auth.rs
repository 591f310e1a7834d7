//! Caller identity.
//!
//! Token verification happens upstream; the gateway forwards the verified
//! user id and role as headers.

use axum::extract::FromRequestParts;
use bson::Document;
use bson::oid::ObjectId;
use http::request::Parts;

use crate::error::ApiError;

pub const USER_HEADER: &str = "x-user-id";
pub const ROLE_HEADER: &str = "x-user-role";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Admin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller {
    pub id: ObjectId,
    pub role: Role,
}

impl Caller {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn require_admin(&self) -> Result<(), ApiError> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(ApiError::forbidden("Admin access required"))
        }
    }

    /// Whether `doc[field]` names this caller.
    pub fn owns(&self, doc: &Document, field: &str) -> bool {
        doc.get(field).and_then(bazaar_engine::object_id) == Some(self.id)
    }

    /// Owner or admin, otherwise 403 with `msg`.
    pub fn ensure_owner(&self, doc: &Document, field: &str, msg: &str) -> Result<(), ApiError> {
        if self.owns(doc, field) || self.is_admin() {
            Ok(())
        } else {
            Err(ApiError::forbidden(msg))
        }
    }
}

impl<S: Send + Sync> FromRequestParts<S> for Caller {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let id = parts
            .headers
            .get(USER_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| ObjectId::parse_str(v.trim()).ok())
            .ok_or(ApiError::Unauthenticated)?;

        let role = match parts.headers.get(ROLE_HEADER).and_then(|v| v.to_str().ok()) {
            Some(r) if r.trim().eq_ignore_ascii_case("admin") => Role::Admin,
            _ => Role::User,
        };

        Ok(Caller { id, role })
    }
}
