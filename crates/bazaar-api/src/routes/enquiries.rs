use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use bazaar_store::Collection;
use bson::{Bson, Document};
use serde_json::Value;
use tracing::info;

use crate::auth::Caller;
use crate::entities::ENQUIRIES;
use crate::error::ApiError;
use crate::input::{as_number, non_negative, optional_str, required_str};
use crate::state::{AppState, blocking};
use crate::wire::{self, JsonBody};

/// Everything a buyer may describe; other body fields are dropped.
const ACCEPTED: &[&str] = &[
    "category",
    "bhkCount",
    "areaSqFt",
    "budgetINR",
    "lookingFor",
    "timelineMonths",
    "pincode",
    "interested",
    "moreDetails",
    "scopes",
    "quantity",
    "doorsType",
    "materials",
    "planToBuyInMonths",
];

const COUNTS: &[&str] = &["bhkCount", "areaSqFt", "quantity"];
const RANGES: &[&str] = &["budgetINR", "timelineMonths", "planToBuyInMonths"];
const LISTS: &[&str] = &["scopes", "doorsType", "materials"];

/// `{ min?, max? }` with non-negative bounds and `min <= max`.
fn range(doc: &Document, field: &str) -> Result<(), ApiError> {
    let bounds = match doc.get(field) {
        None | Some(Bson::Null) => return Ok(()),
        Some(Bson::Document(bounds)) => bounds,
        Some(_) => {
            return Err(ApiError::bad_request(format!(
                "{field} must be an object with min and max"
            )));
        }
    };
    let bound = |name: &str| -> Result<Option<f64>, ApiError> {
        match bounds.get(name) {
            None | Some(Bson::Null) => Ok(None),
            Some(v) => match as_number(v) {
                Some(n) if n >= 0.0 => Ok(Some(n)),
                _ => Err(ApiError::bad_request(format!(
                    "{field}.{name} must be a non-negative number"
                ))),
            },
        }
    };
    if let (Some(min), Some(max)) = (bound("min")?, bound("max")?) {
        if min > max {
            return Err(ApiError::bad_request(format!(
                "{field}.min cannot exceed {field}.max"
            )));
        }
    }
    Ok(())
}

fn string_list(doc: &Document, field: &str) -> Result<(), ApiError> {
    match doc.get(field) {
        None | Some(Bson::Null) => Ok(()),
        Some(Bson::Array(items)) if items.iter().all(|i| matches!(i, Bson::String(_))) => Ok(()),
        Some(_) => Err(ApiError::bad_request(format!("{field} must be a list of strings"))),
    }
}

fn validate(enquiry: &Document) -> Result<(), ApiError> {
    required_str(enquiry, "category")?;
    required_str(enquiry, "pincode")?;
    optional_str(enquiry, "lookingFor")?;
    optional_str(enquiry, "moreDetails")?;
    for field in COUNTS {
        non_negative(enquiry, field)?;
    }
    for field in RANGES {
        range(enquiry, field)?;
    }
    for field in LISTS {
        string_list(enquiry, field)?;
    }
    match enquiry.get("interested") {
        None | Some(Bson::Null) | Some(Bson::Boolean(_)) => Ok(()),
        Some(_) => Err(ApiError::bad_request("interested must be true or false")),
    }
}

pub async fn create(
    State(state): State<AppState>,
    caller: Caller,
    JsonBody(body): JsonBody<Value>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    blocking(move || {
        let mut enquiry: Document = wire::body_document(body)?
            .into_iter()
            .filter(|(k, _)| ACCEPTED.contains(&k.as_str()))
            .collect();
        validate(&enquiry)?;
        if !matches!(enquiry.get("moreDetails"), Some(Bson::String(_))) {
            enquiry.insert("moreDetails", "");
        }
        enquiry.insert("createdBy", caller.id);

        let saved = state.collection(ENQUIRIES).insert(enquiry)?;
        info!(enquiry = ?saved.get("_id"), by = %caller.id, "enquiry created");
        Ok((
            StatusCode::CREATED,
            wire::message_with("Enquiry created successfully", "enquiry", saved),
        ))
    })
    .await
}

#[cfg(test)]
mod tests {
    use bson::doc;

    use super::*;

    #[test]
    fn ranges_need_ordered_non_negative_bounds() {
        assert!(range(&doc! { "budgetINR": { "min": 10, "max": 20 } }, "budgetINR").is_ok());
        assert!(range(&doc! { "budgetINR": { "max": 20 } }, "budgetINR").is_ok());
        assert!(range(&doc! {}, "budgetINR").is_ok());
        assert!(range(&doc! { "budgetINR": { "min": 30, "max": 20 } }, "budgetINR").is_err());
        assert!(range(&doc! { "budgetINR": { "min": -1 } }, "budgetINR").is_err());
        assert!(range(&doc! { "budgetINR": 5 }, "budgetINR").is_err());
    }

    #[test]
    fn lists_hold_strings_only() {
        assert!(string_list(&doc! { "scopes": ["tiling", "paint"] }, "scopes").is_ok());
        assert!(string_list(&doc! { "scopes": ["tiling", 2] }, "scopes").is_err());
        assert!(string_list(&doc! { "scopes": "tiling" }, "scopes").is_err());
    }
}
