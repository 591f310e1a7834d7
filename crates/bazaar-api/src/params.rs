use axum::extract::{FromRequestParts, Query};
use bazaar_query::Params;
use http::request::Parts;

use crate::error::ApiError;

/// Query-string parameters with repeated keys preserved.
#[derive(Debug, Clone, Default)]
pub struct QueryParams(pub Params);

impl<S: Send + Sync> FromRequestParts<S> for QueryParams {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(pairs) = Query::<Vec<(String, String)>>::from_request_parts(parts, state)
            .await
            .map_err(|e| ApiError::bad_request(e.body_text()))?;
        Ok(QueryParams(Params::from_pairs(pairs)))
    }
}
