//! Request body validation shared by the route handlers.

use bazaar_engine::object_id;
use bson::oid::ObjectId;
use bson::{Bson, Document};

use crate::error::ApiError;

/// Fields the service owns; stripped from create/update payloads.
pub const SERVER_MANAGED: &[&str] = &["_id", "createdAt", "updatedAt", "createdBy"];

/// A non-blank string at `field`.
pub fn required_str<'a>(doc: &'a Document, field: &str) -> Result<&'a str, ApiError> {
    match doc.get(field) {
        Some(Bson::String(s)) if !s.trim().is_empty() => Ok(s),
        _ => Err(ApiError::bad_request(format!("{field} is required"))),
    }
}

pub fn optional_str<'a>(doc: &'a Document, field: &str) -> Result<Option<&'a str>, ApiError> {
    match doc.get(field) {
        None | Some(Bson::Null) => Ok(None),
        Some(Bson::String(s)) => Ok(Some(s)),
        Some(_) => Err(ApiError::bad_request(format!("{field} must be a string"))),
    }
}

pub fn max_chars(value: &str, max: usize, label: &str) -> Result<(), ApiError> {
    if value.chars().count() > max {
        return Err(ApiError::bad_request(format!(
            "{label} cannot exceed {max} characters"
        )));
    }
    Ok(())
}

pub fn as_number(value: &Bson) -> Option<f64> {
    match value {
        Bson::Int32(n) => Some(f64::from(*n)),
        Bson::Int64(n) => Some(*n as f64),
        Bson::Double(n) if n.is_finite() => Some(*n),
        _ => None,
    }
}

/// A number ≥ 0 at `field`, if present.
pub fn non_negative(doc: &Document, field: &str) -> Result<(), ApiError> {
    match doc.get(field) {
        None | Some(Bson::Null) => Ok(()),
        Some(v) => match as_number(v) {
            Some(n) if n >= 0.0 => Ok(()),
            _ => Err(ApiError::bad_request(format!(
                "{field} must be a non-negative number"
            ))),
        },
    }
}

pub fn strip(doc: &mut Document, fields: &[&str]) {
    for f in fields {
        doc.remove(*f);
    }
}

/// Replace a hex-string reference with an ObjectId; a bad id is a 400.
pub fn reference(doc: &mut Document, field: &str) -> Result<Option<ObjectId>, ApiError> {
    let Some(value) = doc.get(field) else {
        return Ok(None);
    };
    if matches!(value, Bson::Null) {
        return Ok(None);
    }
    let id = object_id(value).ok_or_else(|| ApiError::bad_request(format!("Invalid {field} id")))?;
    doc.insert(field, id);
    Ok(Some(id))
}

/// `tags` given as `"a, b"` becomes `["a", "b"]`.
pub fn normalise_tags(doc: &mut Document) -> Result<(), ApiError> {
    let tags = match doc.get("tags") {
        None => return Ok(()),
        Some(Bson::String(s)) => s
            .split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(|t| Bson::String(t.into()))
            .collect(),
        Some(Bson::Array(items)) => {
            if items.iter().any(|t| !matches!(t, Bson::String(_))) {
                return Err(ApiError::bad_request("tags must be strings"));
            }
            items.clone()
        }
        Some(_) => return Err(ApiError::bad_request("tags must be a list of strings")),
    };
    doc.insert("tags", Bson::Array(tags));
    Ok(())
}

/// An optional `image` must be `{ url, altText? }` with a non-blank url.
pub fn image(doc: &Document, label: &str) -> Result<(), ApiError> {
    match doc.get("image") {
        None | Some(Bson::Null) => Ok(()),
        Some(Bson::Document(img)) => match img.get("url") {
            Some(Bson::String(url)) if !url.trim().is_empty() => Ok(()),
            _ => Err(ApiError::bad_request(format!("{label} image url is required"))),
        },
        Some(_) => Err(ApiError::bad_request(format!("{label} image must be an object"))),
    }
}

/// Sub-documents of `doc[field]`, which must be an array of objects if set.
pub fn children<'a>(doc: &'a Document, field: &str) -> Result<Vec<&'a Document>, ApiError> {
    match doc.get(field) {
        None | Some(Bson::Null) => Ok(Vec::new()),
        Some(Bson::Array(items)) => items
            .iter()
            .map(|item| {
                item.as_document()
                    .ok_or_else(|| ApiError::bad_request(format!("{field} must contain objects")))
            })
            .collect(),
        Some(_) => Err(ApiError::bad_request(format!("{field} must be an array"))),
    }
}
