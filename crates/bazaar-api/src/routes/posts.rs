use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use bazaar_engine::{paginate, populate};
use bazaar_query::{
    Clause, FilterSpec, PageSpec, Params, Sort, parse_fuzzy, parse_one_of, parse_range, parse_sort,
};
use bazaar_store::Collection;
use bson::Bson;
use serde_json::Value;
use tracing::info;

use crate::auth::Caller;
use crate::entities::{POST_LISTING, POSTS, PUBLIC_USER, PostField, USERS};
use crate::error::ApiError;
use crate::input::{SERVER_MANAGED, non_negative, normalise_tags, required_str, strip};
use crate::params::QueryParams;
use crate::state::{AppState, blocking};
use crate::wire::{self, JsonBody};

fn post_filter(params: &Params) -> FilterSpec {
    FilterSpec::new()
        .maybe(parse_one_of(params, "tags", PostField::Tags))
        .maybe(parse_one_of(params, "place", PostField::Place))
        .maybe(parse_one_of(params, "priceType", PostField::PriceType))
        .maybe(parse_range(params, "minAmount", "maxAmount", PostField::Amount))
        .maybe(parse_fuzzy(params, "q", &[PostField::Title, PostField::Captions]))
}

fn listing(state: &AppState, filter: FilterSpec, params: &Params) -> Result<Json<Value>, ApiError> {
    let sort = parse_sort(
        params,
        &[PostField::CreatedAt, PostField::Title, PostField::Amount],
        Sort::newest_first(),
    );
    let mut page = paginate(
        state.collection(POSTS).as_ref(),
        &filter,
        &[sort],
        PageSpec::from_params(params),
    )?;
    populate(state.collection(USERS).as_ref(), &mut page.items, "createdBy", PUBLIC_USER)?;
    Ok(Json(wire::doc_json(page.envelope(POST_LISTING))))
}

pub async fn create(
    State(state): State<AppState>,
    caller: Caller,
    JsonBody(body): JsonBody<Value>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    blocking(move || {
        let mut post = wire::body_document(body)?;
        strip(&mut post, SERVER_MANAGED);
        required_str(&post, "title")?;
        normalise_tags(&mut post)?;
        match post.get("priceDetails") {
            None | Some(Bson::Null) => {}
            Some(Bson::Document(price)) => non_negative(price, "amount")?,
            Some(_) => return Err(ApiError::bad_request("priceDetails must be an object")),
        }
        post.insert("createdBy", caller.id);

        let saved = state.collection(POSTS).insert(post)?;
        info!(post = ?saved.get("_id"), user = %caller.id, "post created");
        Ok((
            StatusCode::CREATED,
            wire::message_with("Post created successfully", "post", saved),
        ))
    })
    .await
}

pub async fn list(
    State(state): State<AppState>,
    QueryParams(params): QueryParams,
) -> Result<Json<Value>, ApiError> {
    blocking(move || listing(&state, post_filter(&params), &params)).await
}

pub async fn mine(
    State(state): State<AppState>,
    caller: Caller,
    QueryParams(params): QueryParams,
) -> Result<Json<Value>, ApiError> {
    blocking(move || {
        let filter = FilterSpec::new()
            .with(Clause::equals(PostField::CreatedBy, caller.id))
            .merge(post_filter(&params));
        listing(&state, filter, &params)
    })
    .await
}
