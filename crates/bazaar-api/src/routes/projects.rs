use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use bazaar_engine::{paginate, populate, require};
use bazaar_query::{
    Clause, FilterSpec, PageSpec, Params, Sort, parse_bool, parse_fuzzy, parse_one_of, parse_range,
    parse_sort,
};
use bazaar_store::Collection;
use bson::Document;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::info;

use crate::auth::Caller;
use crate::entities::{PROJECT_LISTING, PROJECTS, ProjectField, PUBLIC_USER, REVIEWS, ReviewField, USERS};
use crate::error::ApiError;
use crate::input::{SERVER_MANAGED, non_negative, normalise_tags, required_str, strip};
use crate::params::QueryParams;
use crate::state::{AppState, blocking};
use crate::wire::{self, JsonBody};

const SORTABLE: &[ProjectField] = &[
    ProjectField::CreatedAt,
    ProjectField::Cost,
    ProjectField::Area,
    ProjectField::AverageRating,
];

fn project_filter(params: &Params) -> FilterSpec {
    FilterSpec::new()
        .maybe(parse_one_of(params, "sellerName", ProjectField::SellerName))
        .maybe(parse_one_of(params, "sellerPhoneNumber", ProjectField::SellerPhoneNumber))
        .maybe(parse_one_of(params, "projectType", ProjectField::ProjectType))
        .maybe(parse_one_of(params, "constructionType", ProjectField::ConstructionType))
        .maybe(parse_one_of(params, "houseType", ProjectField::HouseType))
        .maybe(parse_one_of(params, "style", ProjectField::Style))
        .maybe(parse_one_of(params, "layout", ProjectField::Layout))
        .maybe(parse_one_of(params, "place", ProjectField::Place))
        .maybe(parse_one_of(params, "tags", ProjectField::Tags))
        .maybe(parse_range(params, "minCost", "maxCost", ProjectField::Cost))
        .maybe(parse_range(params, "minArea", "maxArea", ProjectField::Area))
        .maybe(parse_bool(params, "boundaryWall", ProjectField::BoundaryWall))
        .maybe(parse_bool(params, "cornerProperty", ProjectField::CornerProperty))
        .maybe(parse_fuzzy(
            params,
            "q",
            &[ProjectField::Title, ProjectField::ProjectType, ProjectField::About],
        ))
}

fn listing(state: &AppState, filter: FilterSpec, params: &Params) -> Result<Json<Value>, ApiError> {
    let sort = parse_sort(params, SORTABLE, Sort::newest_first());
    let mut page = paginate(
        state.collection(PROJECTS).as_ref(),
        &filter,
        &[sort],
        PageSpec::from_params(params),
    )?;
    populate(state.collection(USERS).as_ref(), &mut page.items, "createdBy", PUBLIC_USER)?;
    Ok(Json(wire::doc_json(page.envelope(PROJECT_LISTING))))
}

pub async fn create(
    State(state): State<AppState>,
    caller: Caller,
    JsonBody(body): JsonBody<Value>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    blocking(move || {
        let mut project = wire::body_document(body)?;
        strip(&mut project, SERVER_MANAGED);
        strip(&mut project, &["averageRating", "totalReviews"]);
        required_str(&project, "projectType")?;
        for field in ["cost", "areaSquareFeet", "numberOfBathrooms", "floors", "numberOfParkings"] {
            non_negative(&project, field)?;
        }
        normalise_tags(&mut project)?;
        project.insert("createdBy", caller.id);
        project.insert("averageRating", 0.0);
        project.insert("totalReviews", 0);

        let saved = state.collection(PROJECTS).insert(project)?;
        info!(project = ?saved.get("_id"), seller = %caller.id, "project created");
        Ok((
            StatusCode::CREATED,
            wire::message_with("Project created successfully", "project", saved),
        ))
    })
    .await
}

pub async fn list(
    State(state): State<AppState>,
    QueryParams(params): QueryParams,
) -> Result<Json<Value>, ApiError> {
    blocking(move || listing(&state, project_filter(&params), &params)).await
}

pub async fn mine(
    State(state): State<AppState>,
    caller: Caller,
    QueryParams(params): QueryParams,
) -> Result<Json<Value>, ApiError> {
    blocking(move || {
        let filter = FilterSpec::new()
            .with(Clause::equals(ProjectField::CreatedBy, caller.id))
            .merge(project_filter(&params));
        listing(&state, filter, &params)
    })
    .await
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ByIds {
    #[serde(default)]
    project_ids: Vec<String>,
}

pub async fn by_ids(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<ByIds>,
) -> Result<Json<Value>, ApiError> {
    blocking(move || {
        if body.project_ids.is_empty() {
            return Err(ApiError::bad_request(
                "Please provide a valid array of project IDs",
            ));
        }
        let ids = body
            .project_ids
            .iter()
            .map(|raw| wire::body_id(raw, "project id"))
            .collect::<Result<Vec<_>, _>>()?;

        let mut projects = state.collection(PROJECTS).get_many(&ids)?;
        if projects.is_empty() {
            return Err(ApiError::NotFound(
                "No projects found for the given IDs".into(),
            ));
        }
        populate(state.collection(USERS).as_ref(), &mut projects, "createdBy", PUBLIC_USER)?;
        Ok(Json(json!({ "projects": wire::docs_json(projects) })))
    })
    .await
}

pub async fn get(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    blocking(move || {
        let id = wire::path_id(&project_id, "Project")?;
        let project: Document = require(state.collection(PROJECTS).as_ref(), &id, "Project")?;
        let mut docs = [project];
        populate(state.collection(USERS).as_ref(), &mut docs, "createdBy", PUBLIC_USER)?;
        let [project] = docs;
        Ok(Json(wire::doc_json(project)))
    })
    .await
}

pub async fn delete(
    State(state): State<AppState>,
    caller: Caller,
    Path(project_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    blocking(move || {
        let id = wire::path_id(&project_id, "Project")?;
        let projects = state.collection(PROJECTS);
        let project = require(projects.as_ref(), &id, "Project")?;
        caller.ensure_owner(&project, "createdBy", "You can only delete your own projects")?;
        projects.delete(&id)?;
        let reviews = state
            .collection(REVIEWS)
            .delete_where(&FilterSpec::new().with(Clause::equals(ReviewField::Reviewable, id)))?;
        info!(project = %id, reviews, "project deleted");
        Ok(wire::message("Project deleted successfully"))
    })
    .await
}
