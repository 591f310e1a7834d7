use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use bazaar_engine::{paginate, populate};
use bazaar_query::{Clause, FilterSpec, PageSpec, Sort, parse_bool, parse_fuzzy, parse_sort};
use bazaar_store::Collection;
use bson::doc;
use serde_json::Value;
use tracing::info;

use crate::auth::Caller;
use crate::entities::{BRAND_LISTING, BRANDS, BrandField, PUBLIC_USER, USERS};
use crate::error::ApiError;
use crate::input::{SERVER_MANAGED, image, required_str, strip};
use crate::params::QueryParams;
use crate::state::{AppState, blocking};
use crate::wire::{self, JsonBody};

/// Any signed-in user may propose a brand; it stays unapproved until an
/// admin approves it.
pub async fn create(
    State(state): State<AppState>,
    caller: Caller,
    JsonBody(body): JsonBody<Value>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    blocking(move || {
        let brands = state.collection(BRANDS);
        let mut brand = wire::body_document(body)?;
        strip(&mut brand, SERVER_MANAGED);
        let name = required_str(&brand, "name")?.trim().to_string();
        image(&brand, "Brand")?;

        let taken = FilterSpec::new().with(Clause::equals(BrandField::Name, name.as_str()));
        brand.insert("name", name);
        brand.insert("adminApproved", false);
        brand.insert("createdBy", caller.id);
        let saved = brands
            .insert_unless(brand, &taken)?
            .ok_or_else(|| ApiError::bad_request("Brand already exists."))?;
        info!(brand = ?saved.get("_id"), user = %caller.id, "brand created");
        Ok((
            StatusCode::CREATED,
            wire::message_with("Brand created successfully", "brand", saved),
        ))
    })
    .await
}

pub async fn list(
    State(state): State<AppState>,
    QueryParams(params): QueryParams,
) -> Result<Json<Value>, ApiError> {
    blocking(move || {
        let filter = FilterSpec::new()
            .maybe(parse_fuzzy(&params, "q", &[BrandField::Name]))
            .maybe(parse_bool(&params, "approved", BrandField::Approved));
        let sort = parse_sort(
            &params,
            &[BrandField::Name, BrandField::CreatedAt],
            Sort::newest_first(),
        );
        let mut page = paginate(
            state.collection(BRANDS).as_ref(),
            &filter,
            &[sort],
            PageSpec::from_params(&params),
        )?;
        populate(
            state.collection(USERS).as_ref(),
            &mut page.items,
            "createdBy",
            PUBLIC_USER,
        )?;
        Ok(Json(wire::doc_json(page.envelope(BRAND_LISTING))))
    })
    .await
}

pub async fn approve(
    State(state): State<AppState>,
    caller: Caller,
    Path(brand_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    caller.require_admin()?;
    blocking(move || {
        let id = wire::path_id(&brand_id, "Brand")?;
        let brand = state
            .collection(BRANDS)
            .update(&id, doc! { "adminApproved": true })?
            .ok_or_else(|| ApiError::not_found("Brand"))?;
        info!(brand = %id, "brand approved");
        Ok(wire::message_with("Brand approved successfully", "brand", brand))
    })
    .await
}
