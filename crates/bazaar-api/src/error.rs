use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use bazaar_engine::EngineError;
use bazaar_store::StoreError;
use tracing::error;

use crate::notify::NotifyError;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Notify(#[from] NotifyError),

    #[error("{0}")]
    BadRequest(String),

    #[error("authentication required")]
    Unauthenticated,

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn not_found(entity: &str) -> Self {
        ApiError::NotFound(format!("{entity} not found"))
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        ApiError::BadRequest(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        ApiError::Forbidden(msg.into())
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        ApiError::Engine(EngineError::Store(e))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ApiError::Unauthenticated => (StatusCode::UNAUTHORIZED, self.to_string()),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg.clone()),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            ApiError::Engine(e) => match e {
                EngineError::NotFound { .. } | EngineError::EmbeddedNotFound { .. } => {
                    (StatusCode::NOT_FOUND, e.to_string())
                }
                EngineError::IdImmutable { .. } => (StatusCode::BAD_REQUEST, e.to_string()),
                EngineError::Store(_) => {
                    error!(error = %e, "store failure");
                    (StatusCode::INTERNAL_SERVER_ERROR, "internal server error".into())
                }
            },
            ApiError::Notify(e) => match e {
                NotifyError::Invalid(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
                NotifyError::Delivery(_) => {
                    error!(error = %e, "push delivery failure");
                    (StatusCode::BAD_GATEWAY, e.to_string())
                }
                NotifyError::Store(_) => {
                    error!(error = %e, "store failure while recording notification");
                    (StatusCode::INTERNAL_SERVER_ERROR, "internal server error".into())
                }
            },
            ApiError::Internal(msg) => {
                error!(error = %msg, "internal failure");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal server error".into())
            }
        };

        let body = serde_json::json!({ "error": message });
        (status, Json(body)).into_response()
    }
}
