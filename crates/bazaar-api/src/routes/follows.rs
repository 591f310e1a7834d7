//! Who follows whom. Each relationship is one edge document in `follows`;
//! the (follower, following) pair is unique.

use axum::Json;
use axum::extract::{Path, State};
use bazaar_engine::{Listing, paginate, populate, require};
use bazaar_query::{Clause, Field, FilterSpec, PageSpec, Params, Sort};
use bazaar_store::Collection;
use bson::oid::ObjectId;
use bson::{Bson, doc};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::info;

use crate::auth::Caller;
use crate::entities::{
    FOLLOWER_LISTING, FOLLOWING_LISTING, FOLLOWS, FollowField, PUBLIC_USER, USERS,
};
use crate::error::ApiError;
use crate::params::QueryParams;
use crate::state::{AppState, blocking};
use crate::wire::{self, JsonBody};

fn edge(follower: ObjectId, following: ObjectId) -> FilterSpec {
    FilterSpec::new()
        .with(Clause::equals(FollowField::Follower, follower))
        .with(Clause::equals(FollowField::Following, following))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Target {
    #[serde(default)]
    target_user_id: String,
}

/// Both ends must exist.
fn resolve(state: &AppState, caller: &Caller, raw: &str) -> Result<ObjectId, ApiError> {
    let target = wire::body_id(raw, "targetUserId")?;
    let users = state.collection(USERS);
    require(users.as_ref(), &target, "User")?;
    require(users.as_ref(), &caller.id, "User")?;
    Ok(target)
}

pub async fn follow(
    State(state): State<AppState>,
    caller: Caller,
    JsonBody(body): JsonBody<Target>,
) -> Result<Json<Value>, ApiError> {
    blocking(move || {
        let target = resolve(&state, &caller, &body.target_user_id)?;
        if target == caller.id {
            return Err(ApiError::bad_request("You cannot follow yourself"));
        }
        state
            .collection(FOLLOWS)
            .insert_unless(
                doc! { "follower": caller.id, "following": target },
                &edge(caller.id, target),
            )?
            .ok_or_else(|| ApiError::bad_request("Already following this user"))?;
        info!(follower = %caller.id, following = %target, "followed");
        Ok(wire::message("Successfully followed the user"))
    })
    .await
}

pub async fn unfollow(
    State(state): State<AppState>,
    caller: Caller,
    JsonBody(body): JsonBody<Target>,
) -> Result<Json<Value>, ApiError> {
    blocking(move || {
        let target = resolve(&state, &caller, &body.target_user_id)?;
        let removed = state
            .collection(FOLLOWS)
            .delete_where(&edge(caller.id, target))?;
        if removed == 0 {
            return Err(ApiError::bad_request("You are not following this user"));
        }
        info!(follower = %caller.id, following = %target, "unfollowed");
        Ok(wire::message("Successfully unfollowed the user"))
    })
    .await
}

/// Page through the caller's edges on `mine`, returning the user at `other`.
fn listing(
    state: &AppState,
    caller: &Caller,
    params: &Params,
    mine: FollowField,
    other: FollowField,
    keys: Listing,
) -> Result<Json<Value>, ApiError> {
    require(state.collection(USERS).as_ref(), &caller.id, "User")?;
    let filter = FilterSpec::new().with(Clause::equals(mine, caller.id));
    let mut page = paginate(
        state.collection(FOLLOWS).as_ref(),
        &filter,
        &[Sort::desc(FollowField::CreatedAt)],
        PageSpec::from_params(params),
    )?;
    populate(state.collection(USERS).as_ref(), &mut page.items, other.path(), PUBLIC_USER)?;

    // An edge whose user has since disappeared is listed as the edge itself.
    let page = page.map(|mut record| match record.remove(other.path()) {
        Some(Bson::Document(user)) => user,
        Some(value) => {
            record.insert(other.path(), value);
            record
        }
        None => record,
    });
    Ok(Json(wire::doc_json(page.envelope(keys))))
}

pub async fn followers(
    State(state): State<AppState>,
    caller: Caller,
    QueryParams(params): QueryParams,
) -> Result<Json<Value>, ApiError> {
    blocking(move || {
        listing(
            &state,
            &caller,
            &params,
            FollowField::Following,
            FollowField::Follower,
            FOLLOWER_LISTING,
        )
    })
    .await
}

pub async fn following(
    State(state): State<AppState>,
    caller: Caller,
    QueryParams(params): QueryParams,
) -> Result<Json<Value>, ApiError> {
    blocking(move || {
        listing(
            &state,
            &caller,
            &params,
            FollowField::Follower,
            FollowField::Following,
            FOLLOWING_LISTING,
        )
    })
    .await
}

pub async fn is_following(
    State(state): State<AppState>,
    caller: Caller,
    Path(target_user_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    blocking(move || {
        let target = wire::path_id(&target_user_id, "User")?;
        require(state.collection(USERS).as_ref(), &caller.id, "User")?;
        let follows = state.collection(FOLLOWS);
        let is_following = follows.count(&edge(caller.id, target))? > 0;
        let followers = follows
            .count(&FilterSpec::new().with(Clause::equals(FollowField::Following, target)))?;
        Ok(Json(json!({
            "isFollowing": is_following,
            "followersCount": followers,
        })))
    })
    .await
}
