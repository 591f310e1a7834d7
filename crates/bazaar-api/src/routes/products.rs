use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use bazaar_engine::{Facet, categorize, paginate, paginate_in_memory, populate, require};
use bazaar_query::{
    Clause, FilterSpec, PageSpec, Params, Query, Sort, parse_bool, parse_fuzzy, parse_one_of,
    parse_range, parse_sort,
};
use bazaar_store::{Collection, lookup};
use bson::oid::ObjectId;
use bson::{Bson, Document};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, info};

use crate::auth::Caller;
use crate::entities::{
    BRANDS, PRODUCT_LISTING, PRODUCTS, ProductField, PUBLIC_USER, REVIEWS, ReviewField, USERS,
};
use crate::error::ApiError;
use crate::input::{SERVER_MANAGED, non_negative, normalise_tags, reference, required_str, strip};
use crate::params::QueryParams;
use crate::state::{AppState, blocking};
use crate::wire::{self, JsonBody};

/// Fields a seller may not set directly; ratings come from reviews.
const DERIVED: &[&str] = &["averageRating", "totalReviews"];

const SEARCHABLE: &[ProductField] = &[
    ProductField::Name,
    ProductField::About,
    ProductField::Category,
    ProductField::SubCategory,
    ProductField::Type,
];

const SORTABLE: &[ProductField] = &[
    ProductField::CreatedAt,
    ProductField::Name,
    ProductField::Price,
    ProductField::Quantity,
    ProductField::AverageRating,
];

/// Every listing filter except `brandName`, which needs the populated brand.
fn product_filter(params: &Params) -> FilterSpec {
    FilterSpec::new()
        .maybe(parse_one_of(params, "sellerName", ProductField::SellerName))
        .maybe(parse_one_of(params, "sellerPhoneNumber", ProductField::SellerPhoneNumber))
        .maybe(parse_one_of(params, "category", ProductField::Category))
        .maybe(parse_one_of(params, "subCategory", ProductField::SubCategory))
        .maybe(parse_one_of(params, "type", ProductField::Type))
        .maybe(parse_one_of(params, "subType", ProductField::SubType))
        .maybe(parse_one_of(params, "brand", ProductField::Brand))
        .maybe(parse_one_of(params, "color", ProductField::Color))
        .maybe(parse_one_of(params, "material", ProductField::Material))
        .maybe(parse_one_of(params, "tags", ProductField::Tags))
        .maybe(parse_range(params, "minPrice", "maxPrice", ProductField::Price))
        .maybe(parse_range(params, "minQuantity", "maxQuantity", ProductField::Quantity))
        .maybe(parse_bool(params, "warranty", ProductField::Warranty))
        .maybe(parse_bool(params, "isoCertified", ProductField::IsoCertified))
        .maybe(parse_fuzzy(params, "q", SEARCHABLE))
}

fn brand_names(params: &Params) -> Vec<String> {
    params
        .get("brandName")
        .map(|v| {
            v.iter()
                .flat_map(|s| s.split(','))
                .map(|s| s.trim().to_lowercase())
                .filter(|s| !s.is_empty())
                .collect()
        })
        .unwrap_or_default()
}

fn populate_refs(state: &AppState, docs: &mut [Document]) -> Result<(), ApiError> {
    populate(state.collection(BRANDS).as_ref(), docs, "brand", Default::default())?;
    populate(state.collection(USERS).as_ref(), docs, "createdBy", PUBLIC_USER)?;
    Ok(())
}

/// Shared by the public and the seller's own listing.
fn listing(state: &AppState, filter: FilterSpec, params: &Params) -> Result<Json<Value>, ApiError> {
    let products = state.collection(PRODUCTS);
    let sort = parse_sort(params, SORTABLE, Sort::newest_first());
    let spec = PageSpec::from_params(params);
    let names = brand_names(params);

    let page = if names.is_empty() {
        let mut page = paginate(products.as_ref(), &filter, &[sort], spec)?;
        populate_refs(state, &mut page.items)?;
        page
    } else {
        // Brand names only exist on the referenced brand, so filter after populating.
        let mut all = products.find(&Query::new(filter).sort(sort))?;
        populate_refs(state, &mut all)?;
        all.retain(|doc| {
            lookup(doc, "brand.name").into_iter().any(|name| match name {
                Bson::String(n) => names.contains(&n.to_lowercase()),
                _ => false,
            })
        });
        debug!(matched = all.len(), "brandName post-filter");
        paginate_in_memory(all, spec)
    };
    Ok(Json(wire::doc_json(page.envelope(PRODUCT_LISTING))))
}

fn ensure_brand(state: &AppState, product: &mut Document) -> Result<(), ApiError> {
    if let Some(id) = reference(product, "brand")? {
        require(state.collection(BRANDS).as_ref(), &id, "Brand")?;
    }
    Ok(())
}

fn validate(state: &AppState, product: &mut Document) -> Result<(), ApiError> {
    strip(product, SERVER_MANAGED);
    strip(product, DERIVED);
    non_negative(product, "price")?;
    non_negative(product, "quantity")?;
    normalise_tags(product)?;
    ensure_brand(state, product)
}

fn owned_product(state: &AppState, caller: &Caller, raw: &str) -> Result<(ObjectId, Document), ApiError> {
    let id = wire::path_id(raw, "Product")?;
    let product = require(state.collection(PRODUCTS).as_ref(), &id, "Product")?;
    caller.ensure_owner(&product, "createdBy", "You can only modify your own products")?;
    Ok((id, product))
}

pub async fn create(
    State(state): State<AppState>,
    caller: Caller,
    JsonBody(body): JsonBody<Value>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    blocking(move || {
        let mut product = wire::body_document(body)?;
        validate(&state, &mut product)?;
        required_str(&product, "name")?;
        product.insert("createdBy", caller.id);
        product.insert("averageRating", 0.0);
        product.insert("totalReviews", 0);

        let saved = state.collection(PRODUCTS).insert(product)?;
        info!(product = ?saved.get("_id"), seller = %caller.id, "product created");
        Ok((
            StatusCode::CREATED,
            wire::message_with("Product created successfully", "product", saved),
        ))
    })
    .await
}

pub async fn list(
    State(state): State<AppState>,
    QueryParams(params): QueryParams,
) -> Result<Json<Value>, ApiError> {
    blocking(move || listing(&state, product_filter(&params), &params)).await
}

pub async fn mine(
    State(state): State<AppState>,
    caller: Caller,
    QueryParams(params): QueryParams,
) -> Result<Json<Value>, ApiError> {
    blocking(move || {
        let filter = FilterSpec::new()
            .with(Clause::equals(ProductField::CreatedBy, caller.id))
            .merge(product_filter(&params));
        listing(&state, filter, &params)
    })
    .await
}

/// Fuzzy search plus facet buckets carved out of the same page of results.
pub async fn search(
    State(state): State<AppState>,
    QueryParams(params): QueryParams,
) -> Result<Json<Value>, ApiError> {
    blocking(move || {
        let general_filter = FilterSpec::new().maybe(parse_fuzzy(&params, "q", SEARCHABLE));
        let sort = parse_sort(&params, SORTABLE, Sort::newest_first());
        let spec = PageSpec::from_params(&params);
        let mut page = paginate(state.collection(PRODUCTS).as_ref(), &general_filter, &[sort], spec)?;
        populate_refs(&state, &mut page.items)?;

        let facet = |clause: Option<Clause>| clause.map(|c| FilterSpec::new().with(c));
        let facets = vec![
            Facet::new(
                "brandMatches",
                facet(parse_one_of(&params, "brand", ProductField::Brand)),
            ),
            Facet::new(
                "priceRangeMatches",
                facet(parse_range(&params, "minPrice", "maxPrice", ProductField::Price)),
            ),
            Facet::new(
                "sellerNameMatches",
                facet(parse_one_of(&params, "sellerName", ProductField::SellerName)),
            ),
            Facet::new(
                "categoryMatches",
                facet(parse_one_of(&params, "category", ProductField::Category)),
            ),
        ];
        let mut out = categorize(page.items, facets).into_document();
        out.insert("currentPage", page.current_page as i64);
        out.insert("totalPages", page.total_pages as i64);
        out.insert("total", page.total as i64);
        if page.out_of_range {
            out.insert("pageOutOfRange", true);
        }
        Ok(Json(wire::doc_json(out)))
    })
    .await
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ByIds {
    #[serde(default)]
    product_ids: Vec<String>,
}

/// Products in the requested order; ids with no product are skipped.
pub async fn by_ids(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<ByIds>,
) -> Result<Json<Value>, ApiError> {
    blocking(move || {
        if body.product_ids.is_empty() {
            return Err(ApiError::bad_request(
                "Please provide a valid array of product IDs",
            ));
        }
        let ids = body
            .product_ids
            .iter()
            .map(|raw| wire::body_id(raw, "product id"))
            .collect::<Result<Vec<_>, _>>()?;

        let mut products = state.collection(PRODUCTS).get_many(&ids)?;
        if products.is_empty() {
            return Err(ApiError::NotFound(
                "No products found for the given IDs".into(),
            ));
        }
        populate_refs(&state, &mut products)?;
        debug!(requested = ids.len(), found = products.len(), "products by ids");
        Ok(Json(json!({ "products": wire::docs_json(products) })))
    })
    .await
}

pub async fn get(
    State(state): State<AppState>,
    Path(product_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    blocking(move || {
        let id = wire::path_id(&product_id, "Product")?;
        let product = require(state.collection(PRODUCTS).as_ref(), &id, "Product")?;
        let mut docs = [product];
        populate_refs(&state, &mut docs)?;
        let [product] = docs;
        Ok(Json(wire::doc_json(product)))
    })
    .await
}

pub async fn update(
    State(state): State<AppState>,
    caller: Caller,
    Path(product_id): Path<String>,
    JsonBody(body): JsonBody<Value>,
) -> Result<Json<Value>, ApiError> {
    blocking(move || {
        let (id, _) = owned_product(&state, &caller, &product_id)?;
        let mut patch = wire::body_document(body)?;
        validate(&state, &mut patch)?;
        if patch.contains_key("name") {
            required_str(&patch, "name")?;
        }

        let saved = state
            .collection(PRODUCTS)
            .update(&id, patch)?
            .ok_or_else(|| ApiError::not_found("Product"))?;
        Ok(wire::message_with("Product updated successfully", "product", saved))
    })
    .await
}

pub async fn delete(
    State(state): State<AppState>,
    caller: Caller,
    Path(product_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    blocking(move || {
        let (id, _) = owned_product(&state, &caller, &product_id)?;
        state.collection(PRODUCTS).delete(&id)?;
        let reviews = state
            .collection(REVIEWS)
            .delete_where(&FilterSpec::new().with(Clause::equals(ReviewField::Reviewable, id)))?;
        info!(product = %id, reviews, "product deleted");
        Ok(wire::message("Product deleted successfully"))
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_reads_every_supplied_parameter() {
        let params = Params::from_pairs([
            ("category", "Tiles,Paint"),
            ("minPrice", "100"),
            ("isoCertified", "true"),
            ("q", "tl"),
            ("color", ""),
        ]);
        let filter = product_filter(&params);
        assert_eq!(filter.len(), 4);
        assert!(filter.fields().contains(&"category"));
        assert!(filter.fields().contains(&"price"));
    }

    #[test]
    fn brand_names_are_case_folded() {
        let params = Params::from_pairs([("brandName", "Kajaria, SOMANY")]);
        assert_eq!(brand_names(&params), vec!["kajaria", "somany"]);
        assert!(brand_names(&Params::new()).is_empty());
    }
}
