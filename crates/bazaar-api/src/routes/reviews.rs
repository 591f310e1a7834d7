//! Reviews of products and projects. Like answers they nest: a reply points
//! at its parent review. Every write refreshes the reviewed item's
//! `averageRating` and `totalReviews`.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use bazaar_engine::{
    Projection, average, delete_tree, link, object_id, paginate, populate, require, unlink,
    with_parent,
};
use bazaar_query::{Clause, FilterSpec, PageSpec, Sort};
use bazaar_store::Collection;
use bson::oid::ObjectId;
use bson::{Bson, Document, doc};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::auth::Caller;
use crate::entities::{AUTHOR, PRODUCTS, PROJECTS, REVIEW_LISTING, REVIEWS, ReviewField, USERS};
use crate::error::ApiError;
use crate::input::max_chars;
use crate::params::QueryParams;
use crate::state::{AppState, blocking};
use crate::wire::{self, JsonBody};

const COMMENT_MAX: usize = 1000;

/// The collection behind an `onModel` value, and its name in errors.
fn reviewable(on_model: &str) -> Result<(&'static str, &'static str), ApiError> {
    match on_model {
        "Product" => Ok((PRODUCTS, "Product")),
        "ProProject" => Ok((PROJECTS, "Project")),
        _ => Err(ApiError::bad_request("Invalid model specified for review")),
    }
}

fn check_rating(rating: i32) -> Result<(), ApiError> {
    if !(1..=5).contains(&rating) {
        return Err(ApiError::bad_request("Rating must be between 1 and 5"));
    }
    Ok(())
}

/// Write the rating summary back onto the reviewed item.
fn refresh_rating(state: &AppState, review: &Document) -> Result<(), ApiError> {
    let Some(item) = review.get("reviewable").and_then(object_id) else {
        return Ok(());
    };
    let Some((collection, _)) = review
        .get_str("onModel")
        .ok()
        .and_then(|m| reviewable(m).ok())
    else {
        return Ok(());
    };

    let filter = FilterSpec::new().with(Clause::equals(ReviewField::Reviewable, item));
    let (mean, count) =
        average(state.collection(REVIEWS).as_ref(), &filter, ReviewField::Rating)?.unwrap_or((0.0, 0));
    let rounded = (mean * 10.0).round() / 10.0;
    state.collection(collection).update(
        &item,
        doc! { "averageRating": rounded, "totalReviews": count as i64 },
    )?;
    debug!(%item, rating = rounded, count, "rating summary refreshed");
    Ok(())
}

fn populate_replies(state: &AppState, docs: &mut [Document]) -> Result<(), ApiError> {
    let users = state.collection(USERS);
    populate(users.as_ref(), docs, "user", AUTHOR)?;
    populate(state.collection(REVIEWS).as_ref(), docs, "replies", Projection::All)?;
    populate(users.as_ref(), docs, "replies.user", AUTHOR)?;
    Ok(())
}

fn owned_review(state: &AppState, caller: &Caller, raw: &str) -> Result<(ObjectId, Document), ApiError> {
    let id = wire::path_id(raw, "Review")?;
    let review = require(state.collection(REVIEWS).as_ref(), &id, "Review")?;
    caller.ensure_owner(&review, "user", "Unauthorized to modify this review")?;
    Ok((id, review))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewReview {
    on_model: String,
    reviewable_id: String,
    #[serde(default)]
    rating: Option<i32>,
    #[serde(default)]
    comment: Option<String>,
    #[serde(default)]
    parent_id: Option<String>,
}

pub async fn create(
    State(state): State<AppState>,
    caller: Caller,
    JsonBody(body): JsonBody<NewReview>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    blocking(move || {
        let (collection, entity) = reviewable(&body.on_model)?;
        let item_id = wire::body_id(&body.reviewable_id, "reviewableId")?;
        require(state.collection(collection).as_ref(), &item_id, entity)?;
        if let Some(rating) = body.rating {
            check_rating(rating)?;
        }
        if let Some(comment) = &body.comment {
            max_chars(comment, COMMENT_MAX, "Comment")?;
        }

        let reviews = state.collection(REVIEWS);
        let parent_id = match body.parent_id.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => {
                let id = wire::body_id(raw, "parentId")?;
                let parent = require(reviews.as_ref(), &id, "Parent review")?;
                let same_item = parent.get("reviewable").and_then(object_id) == Some(item_id)
                    && parent.get_str("onModel").ok() == Some(body.on_model.as_str());
                if !same_item {
                    return Err(ApiError::bad_request(
                        "Parent review does not belong to the specified reviewable item",
                    ));
                }
                Some(id)
            }
        };

        let mut review = doc! {
            "reviewable": item_id,
            "onModel": body.on_model.as_str(),
            "user": caller.id,
            "parent": parent_id.map_or(Bson::Null, Bson::ObjectId),
            "replies": [],
            "createdBy": caller.id,
        };
        if let Some(rating) = body.rating {
            review.insert("rating", rating);
        }
        if let Some(comment) = body.comment {
            review.insert("comment", comment);
        }
        let saved = reviews.insert(review)?;

        if let Some(parent_id) = parent_id {
            let review_id = saved
                .get_object_id("_id")
                .map_err(|e| ApiError::Internal(format!("stored review has no id: {e}")))?;
            with_parent(reviews.as_ref(), &parent_id, "Parent review", |parent| {
                link(parent, "replies", review_id);
                Ok(())
            })?;
        }
        refresh_rating(&state, &saved)?;
        info!(review = ?saved.get("_id"), item = %item_id, "review created");
        Ok((
            StatusCode::CREATED,
            wire::message_with("Review created successfully", "review", saved),
        ))
    })
    .await
}

/// Top-level reviews of one item, with one level of replies.
pub async fn list_for_item(
    State(state): State<AppState>,
    Path((on_model, item_id)): Path<(String, String)>,
    QueryParams(params): QueryParams,
) -> Result<Json<Value>, ApiError> {
    blocking(move || {
        let (collection, entity) = reviewable(&on_model)?;
        let id = wire::path_id(&item_id, entity)?;
        let item = require(state.collection(collection).as_ref(), &id, entity)?;

        let filter = FilterSpec::new()
            .with(Clause::equals(ReviewField::Reviewable, id))
            .with(Clause::equals(ReviewField::Parent, Bson::Null));
        let mut page = paginate(
            state.collection(REVIEWS).as_ref(),
            &filter,
            &[Sort::newest_first()],
            PageSpec::from_params(&params),
        )?;
        populate_replies(&state, &mut page.items)?;

        let mut out = page.envelope(REVIEW_LISTING);
        out.insert("reviewableItem", item);
        Ok(Json(wire::doc_json(out)))
    })
    .await
}

pub async fn get(
    State(state): State<AppState>,
    Path(review_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    blocking(move || {
        let id = wire::path_id(&review_id, "Review")?;
        let review = require(state.collection(REVIEWS).as_ref(), &id, "Review")?;
        let mut docs = [review];
        populate_replies(&state, &mut docs)?;
        let [review] = docs;
        Ok(wire::wrapped("review", review))
    })
    .await
}

#[derive(Deserialize)]
pub struct ReviewPatch {
    rating: Option<i32>,
    comment: Option<String>,
}

pub async fn update(
    State(state): State<AppState>,
    caller: Caller,
    Path(review_id): Path<String>,
    JsonBody(body): JsonBody<ReviewPatch>,
) -> Result<Json<Value>, ApiError> {
    blocking(move || {
        let (id, review) = owned_review(&state, &caller, &review_id)?;
        if !caller.owns(&review, "user") {
            return Err(ApiError::forbidden("Unauthorized to update this review"));
        }

        let mut patch = Document::new();
        if let Some(rating) = body.rating {
            check_rating(rating)?;
            patch.insert("rating", rating);
        }
        if let Some(comment) = body.comment {
            max_chars(&comment, COMMENT_MAX, "Comment")?;
            patch.insert("comment", comment);
        }
        let saved = state
            .collection(REVIEWS)
            .update(&id, patch)?
            .ok_or_else(|| ApiError::not_found("Review"))?;
        refresh_rating(&state, &saved)?;
        Ok(wire::message_with("Review updated successfully", "review", saved))
    })
    .await
}

/// Removes the review and every reply below it.
pub async fn delete(
    State(state): State<AppState>,
    caller: Caller,
    Path(review_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    blocking(move || {
        let (id, review) = owned_review(&state, &caller, &review_id)?;
        let reviews = state.collection(REVIEWS);

        if let Some(parent_id) = review.get("parent").and_then(object_id) {
            if reviews.get(&parent_id)?.is_some() {
                with_parent(reviews.as_ref(), &parent_id, "Parent review", |parent| {
                    Ok(unlink(parent, "replies", &[id]))
                })?;
            }
        }
        let removed = delete_tree(reviews.as_ref(), id, ReviewField::Parent)?;
        refresh_rating(&state, &review)?;
        info!(review = %id, removed, "review tree deleted");
        Ok(wire::message("Review deleted successfully"))
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_known_models_are_reviewable() {
        assert_eq!(reviewable("Product").unwrap().0, PRODUCTS);
        assert_eq!(reviewable("ProProject").unwrap().0, PROJECTS);
        assert!(reviewable("Post").is_err());
    }

    #[test]
    fn ratings_are_one_to_five() {
        assert!(check_rating(0).is_err());
        assert!(check_rating(1).is_ok());
        assert!(check_rating(5).is_ok());
        assert!(check_rating(6).is_err());
    }
}
