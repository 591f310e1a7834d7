//! Category trees: category → sub-categories → types → sub-types, each node
//! with an optional `image { url, altText }`. Everything below the category
//! is embedded in the category document and addressed by its own id.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use bazaar_engine::embedded::{self, assign_ids, merge};
use bazaar_engine::{paginate, paginate_in_memory, require, with_parent};
use bazaar_query::{FilterSpec, PageSpec, Sort, parse_fuzzy, parse_sort};
use bazaar_store::Collection;
use bson::{Bson, Document};
use serde_json::Value;
use tracing::info;

use crate::auth::Caller;
use crate::entities::{
    CATEGORIES, CATEGORY_LEVELS, CATEGORY_LISTING, CategoryField, SUB_CATEGORIES,
    SUB_CATEGORY_LISTING, TYPES,
};
use crate::error::ApiError;
use crate::input::{SERVER_MANAGED, children, image, required_str, strip};
use crate::params::QueryParams;
use crate::state::{AppState, blocking};
use crate::wire::{self, JsonBody};

/// Child array and label for each level below a category.
const TREE: &[(&str, &str)] = &[
    ("subCategories", "Subcategory"),
    ("types", "Type"),
    ("subTypes", "Subtype"),
];

fn validate_node(node: &Document, label: &str, below: &[(&str, &str)]) -> Result<(), ApiError> {
    required_str(node, "name")?;
    image(node, label)?;
    if let Some(((field, child_label), rest)) = below.split_first() {
        for child in children(node, field)? {
            validate_node(child, child_label, rest)?;
        }
    }
    Ok(())
}

/// Partial updates may rename or re-image a node but not replace its
/// children wholesale, except at the leaf level.
fn validate_patch(patch: &Document, label: &str, nested: Option<&str>) -> Result<(), ApiError> {
    if patch.contains_key("name") {
        required_str(patch, "name")?;
    }
    image(patch, label)?;
    if let Some(field) = nested {
        if patch.contains_key(field) {
            return Err(ApiError::bad_request(format!(
                "{field} cannot be replaced here; use the nested routes"
            )));
        }
    }
    Ok(())
}

fn node_body(body: Value) -> Result<Document, ApiError> {
    let mut node = wire::body_document(body)?;
    strip(&mut node, SERVER_MANAGED);
    Ok(node)
}

pub async fn create(
    State(state): State<AppState>,
    caller: Caller,
    JsonBody(body): JsonBody<Value>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    caller.require_admin()?;
    blocking(move || {
        let mut category = node_body(body)?;
        validate_node(&category, "Category", TREE)?;
        if !category.contains_key(SUB_CATEGORIES.field) {
            category.insert(SUB_CATEGORIES.field, Bson::Array(Vec::new()));
        }
        assign_ids(&mut category, CATEGORY_LEVELS);

        let saved = state.collection(CATEGORIES).insert(category)?;
        info!(category = ?saved.get("_id"), "category created");
        Ok((
            StatusCode::CREATED,
            wire::message_with("Category created successfully", "category", saved),
        ))
    })
    .await
}

pub async fn list(
    State(state): State<AppState>,
    QueryParams(params): QueryParams,
) -> Result<Json<Value>, ApiError> {
    blocking(move || {
        let filter = FilterSpec::new().maybe(parse_fuzzy(
            &params,
            "q",
            &[CategoryField::Name, CategoryField::Description],
        ));
        let sort = parse_sort(
            &params,
            &[CategoryField::Name, CategoryField::CreatedAt],
            Sort::newest_first(),
        );
        let page = paginate(
            state.collection(CATEGORIES).as_ref(),
            &filter,
            &[sort],
            PageSpec::from_params(&params),
        )?;
        Ok(Json(wire::doc_json(page.envelope(CATEGORY_LISTING))))
    })
    .await
}

pub async fn get(
    State(state): State<AppState>,
    Path(category_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    blocking(move || {
        let id = wire::path_id(&category_id, "Category")?;
        let category = require(state.collection(CATEGORIES).as_ref(), &id, "Category")?;
        Ok(Json(wire::doc_json(category)))
    })
    .await
}

pub async fn update(
    State(state): State<AppState>,
    caller: Caller,
    Path(category_id): Path<String>,
    JsonBody(body): JsonBody<Value>,
) -> Result<Json<Value>, ApiError> {
    caller.require_admin()?;
    blocking(move || {
        let id = wire::path_id(&category_id, "Category")?;
        let patch = node_body(body)?;
        validate_patch(&patch, "Category", Some(SUB_CATEGORIES.field))?;

        let categories = state.collection(CATEGORIES);
        let (_, saved) = with_parent(categories.as_ref(), &id, "Category", |category| {
            merge(category, patch);
            Ok(())
        })?;
        Ok(wire::message_with("Category updated successfully", "category", saved))
    })
    .await
}

pub async fn delete(
    State(state): State<AppState>,
    caller: Caller,
    Path(category_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    caller.require_admin()?;
    blocking(move || {
        let id = wire::path_id(&category_id, "Category")?;
        state
            .collection(CATEGORIES)
            .delete(&id)?
            .ok_or_else(|| ApiError::not_found("Category"))?;
        info!(category = %id, "category deleted");
        Ok(wire::message("Category deleted successfully"))
    })
    .await
}

// ── sub-categories ──────────────────────────────────────────────

pub async fn add_sub_category(
    State(state): State<AppState>,
    caller: Caller,
    Path(category_id): Path<String>,
    JsonBody(body): JsonBody<Value>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    caller.require_admin()?;
    blocking(move || {
        let id = wire::path_id(&category_id, "Category")?;
        let mut sub = node_body(body)?;
        validate_node(&sub, "Subcategory", &TREE[1..])?;
        assign_ids(&mut sub, CATEGORY_LEVELS);

        let categories = state.collection(CATEGORIES);
        let (added, _) = with_parent(categories.as_ref(), &id, "Category", |category| {
            let sub_id = embedded::push(category, SUB_CATEGORIES, sub);
            Ok(embedded::find(category, SUB_CATEGORIES, &sub_id)?.clone())
        })?;
        Ok((
            StatusCode::CREATED,
            wire::message_with("Subcategory added successfully", "subCategory", added),
        ))
    })
    .await
}

pub async fn list_sub_categories(
    State(state): State<AppState>,
    Path(category_id): Path<String>,
    QueryParams(params): QueryParams,
) -> Result<Json<Value>, ApiError> {
    blocking(move || {
        let id = wire::path_id(&category_id, "Category")?;
        let category = require(state.collection(CATEGORIES).as_ref(), &id, "Category")?;
        let subs: Vec<Document> = match category.get(SUB_CATEGORIES.field) {
            Some(Bson::Array(items)) => items
                .iter()
                .filter_map(|item| item.as_document().cloned())
                .collect(),
            _ => Vec::new(),
        };
        let page = paginate_in_memory(subs, PageSpec::from_params(&params));
        Ok(Json(wire::doc_json(page.envelope(SUB_CATEGORY_LISTING))))
    })
    .await
}

pub async fn update_sub_category(
    State(state): State<AppState>,
    caller: Caller,
    Path((category_id, sub_id)): Path<(String, String)>,
    JsonBody(body): JsonBody<Value>,
) -> Result<Json<Value>, ApiError> {
    caller.require_admin()?;
    blocking(move || {
        let id = wire::path_id(&category_id, "Category")?;
        let sub_id = wire::path_id(&sub_id, SUB_CATEGORIES.entity)?;
        let mut patch = wire::body_document(body)?;
        strip(&mut patch, &["createdAt", "updatedAt", "createdBy"]);
        validate_patch(&patch, "Subcategory", Some(TYPES.field))?;

        let categories = state.collection(CATEGORIES);
        let (updated, _) = with_parent(categories.as_ref(), &id, "Category", |category| {
            Ok(embedded::update(category, SUB_CATEGORIES, &sub_id, patch)?.clone())
        })?;
        Ok(wire::message_with(
            "Subcategory updated successfully",
            "subCategory",
            updated,
        ))
    })
    .await
}

pub async fn delete_sub_category(
    State(state): State<AppState>,
    caller: Caller,
    Path((category_id, sub_id)): Path<(String, String)>,
) -> Result<Json<Value>, ApiError> {
    caller.require_admin()?;
    blocking(move || {
        let id = wire::path_id(&category_id, "Category")?;
        let sub_id = wire::path_id(&sub_id, SUB_CATEGORIES.entity)?;
        let categories = state.collection(CATEGORIES);
        with_parent(categories.as_ref(), &id, "Category", |category| {
            embedded::remove(category, SUB_CATEGORIES, &sub_id)
        })?;
        Ok(wire::message("Subcategory deleted successfully"))
    })
    .await
}

// ── types ───────────────────────────────────────────────────────

pub async fn add_type(
    State(state): State<AppState>,
    caller: Caller,
    Path((category_id, sub_id)): Path<(String, String)>,
    JsonBody(body): JsonBody<Value>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    caller.require_admin()?;
    blocking(move || {
        let id = wire::path_id(&category_id, "Category")?;
        let sub_id = wire::path_id(&sub_id, SUB_CATEGORIES.entity)?;
        let mut node = node_body(body)?;
        validate_node(&node, "Type", &TREE[2..])?;
        assign_ids(&mut node, CATEGORY_LEVELS);

        let categories = state.collection(CATEGORIES);
        let (added, _) = with_parent(categories.as_ref(), &id, "Category", |category| {
            let sub = embedded::find_mut(category, SUB_CATEGORIES, &sub_id)?;
            let type_id = embedded::push(sub, TYPES, node);
            Ok(embedded::find(sub, TYPES, &type_id)?.clone())
        })?;
        Ok((
            StatusCode::CREATED,
            wire::message_with("Type added successfully", "type", added),
        ))
    })
    .await
}

pub async fn update_type(
    State(state): State<AppState>,
    caller: Caller,
    Path((category_id, sub_id, type_id)): Path<(String, String, String)>,
    JsonBody(body): JsonBody<Value>,
) -> Result<Json<Value>, ApiError> {
    caller.require_admin()?;
    blocking(move || {
        let id = wire::path_id(&category_id, "Category")?;
        let sub_id = wire::path_id(&sub_id, SUB_CATEGORIES.entity)?;
        let type_id = wire::path_id(&type_id, TYPES.entity)?;
        let mut patch = wire::body_document(body)?;
        strip(&mut patch, &["createdAt", "updatedAt", "createdBy"]);
        validate_patch(&patch, "Type", None)?;
        for sub_type in children(&patch, "subTypes")? {
            validate_node(sub_type, "Subtype", &[])?;
        }
        assign_ids(&mut patch, &["subTypes"]);

        let categories = state.collection(CATEGORIES);
        let (updated, _) = with_parent(categories.as_ref(), &id, "Category", |category| {
            let path = [(SUB_CATEGORIES, sub_id)];
            let sub = embedded::find_path_mut(category, &path)?;
            Ok(embedded::update(sub, TYPES, &type_id, patch)?.clone())
        })?;
        Ok(wire::message_with("Type updated successfully", "type", updated))
    })
    .await
}

pub async fn delete_type(
    State(state): State<AppState>,
    caller: Caller,
    Path((category_id, sub_id, type_id)): Path<(String, String, String)>,
) -> Result<Json<Value>, ApiError> {
    caller.require_admin()?;
    blocking(move || {
        let id = wire::path_id(&category_id, "Category")?;
        let sub_id = wire::path_id(&sub_id, SUB_CATEGORIES.entity)?;
        let type_id = wire::path_id(&type_id, TYPES.entity)?;
        let categories = state.collection(CATEGORIES);
        with_parent(categories.as_ref(), &id, "Category", |category| {
            let sub = embedded::find_mut(category, SUB_CATEGORIES, &sub_id)?;
            embedded::remove(sub, TYPES, &type_id)
        })?;
        Ok(wire::message("Type deleted successfully"))
    })
    .await
}
