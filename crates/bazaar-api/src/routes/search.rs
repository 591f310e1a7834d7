use axum::Json;
use axum::extract::State;
use bazaar_query::{
    Clause, Field, FilterSpec, Params, Query, Sort, substring_pattern,
};
use bazaar_store::Collection;
use bson::Document;
use regex::Regex;
use serde_json::{Value, json};
use tracing::debug;

use crate::entities::{
    BRANDS, BrandField, CATEGORIES, CategoryField, PRODUCTS, PROJECTS, ProductField, ProjectField,
};
use crate::error::ApiError;
use crate::params::QueryParams;
use crate::state::{AppState, blocking};
use crate::wire;

/// `letterSupport=yes` widens products and projects to their `about` text.
fn wide(params: &Params) -> bool {
    params
        .first("letterSupport")
        .is_some_and(|v| v.eq_ignore_ascii_case("yes"))
}

/// A term too large to compile matches nothing rather than everything.
fn matching<F: Field>(pattern: Option<&Result<Regex, regex::Error>>, fields: &[F]) -> FilterSpec {
    match pattern {
        Some(Ok(p)) => FilterSpec::new().with(Clause::fuzzy(fields, p)),
        Some(Err(_)) => FilterSpec::new().with(Clause::nothing()),
        None => FilterSpec::new(),
    }
}

fn run(state: &AppState, collection: &str, filter: FilterSpec) -> Result<Vec<Document>, ApiError> {
    Ok(state
        .collection(collection)
        .find(&Query::new(filter).sort(Sort::newest_first()))?)
}

/// Case-insensitive substring search across categories, brands, products and
/// projects. A blank `q` matches everything.
pub async fn search(
    State(state): State<AppState>,
    QueryParams(params): QueryParams,
) -> Result<Json<Value>, ApiError> {
    blocking(move || {
        let pattern = params.first("q").and_then(substring_pattern);
        let pattern = pattern.as_ref();
        let (product_fields, project_fields): (&[ProductField], &[ProjectField]) = if wide(&params) {
            (
                &[ProductField::Name, ProductField::About],
                &[ProjectField::ProjectType, ProjectField::About],
            )
        } else {
            (&[ProductField::Name], &[ProjectField::ProjectType])
        };

        let categories = run(&state, CATEGORIES, matching(pattern, &[CategoryField::Name]))?;
        let brands = run(&state, BRANDS, matching(pattern, &[BrandField::Name]))?;
        let products = run(&state, PRODUCTS, matching(pattern, product_fields))?;
        let projects = run(&state, PROJECTS, matching(pattern, project_fields))?;
        debug!(
            categories = categories.len(),
            brands = brands.len(),
            products = products.len(),
            projects = projects.len(),
            "search"
        );

        Ok(Json(json!({
            "success": true,
            "totalResults": {
                "categories": categories.len(),
                "brands": brands.len(),
                "products": products.len(),
                "projects": projects.len(),
            },
            "results": {
                "categories": wire::docs_json(categories),
                "brands": wire::docs_json(brands),
                "products": wire::docs_json(products),
                "projects": wire::docs_json(projects),
            },
        })))
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn letter_support_is_opt_in() {
        assert!(wide(&Params::from_pairs([("letterSupport", "yes")])));
        assert!(!wide(&Params::from_pairs([("letterSupport", "no")])));
        assert!(!wide(&Params::new()));
    }

    #[test]
    fn blank_query_matches_everything() {
        assert!(matching::<ProductField>(None, &[ProductField::Name]).is_empty());
    }
}
