//! The shared ingredient catalog.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    response::Response,
    Json,
};
use meal_builder_core::domain::Ingredient;
use meal_builder_core::validation::validate_ingredient_name;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{require_removed, MutationResponse, ProblemResponse};
use crate::error::ApiError;
use crate::web::state::AppState;

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct IngredientDto {
    pub id: i64,
    pub name: String,
}

impl From<Ingredient> for IngredientDto {
    fn from(i: Ingredient) -> Self {
        Self {
            id: i.id,
            name: i.name,
        }
    }
}

#[derive(Deserialize, ToSchema)]
pub struct IngredientRequest {
    pub name: String,
}

/// List every catalog ingredient, ordered by name.
#[utoipa::path(
    get,
    path = "/api/ingredients",
    responses((status = 200, body = [IngredientDto]), (status = 401, body = ProblemResponse))
)]
pub async fn list_ingredients(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<IngredientDto>>, ApiError> {
    let items = state.db.list_ingredients().await?;
    Ok(Json(items.into_iter().map(Into::into).collect()))
}

#[utoipa::path(
    get,
    path = "/api/ingredients/{id}",
    params(("id" = i64, Path, description = "Ingredient id")),
    responses((status = 200, body = IngredientDto), (status = 404, body = ProblemResponse))
)]
pub async fn get_ingredient(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<IngredientDto>, ApiError> {
    Ok(Json(state.db.get_ingredient(id).await?.into()))
}

#[utoipa::path(
    post,
    path = "/api/ingredients",
    request_body = IngredientRequest,
    responses((status = 201, body = MutationResponse), (status = 400, body = ProblemResponse))
)]
pub async fn create_ingredient(
    State(state): State<Arc<AppState>>,
    Json(body): Json<IngredientRequest>,
) -> Result<Response, ApiError> {
    let name = validate_ingredient_name(&body.name)?;
    let created = state.db.create_ingredient(&name).await?;
    Ok(MutationResponse::created(
        format!("/api/ingredients/{}", created.id),
        created.id,
    ))
}

#[utoipa::path(
    put,
    path = "/api/ingredients/{id}",
    params(("id" = i64, Path, description = "Ingredient id")),
    request_body = IngredientRequest,
    responses(
        (status = 200, body = MutationResponse),
        (status = 400, body = ProblemResponse),
        (status = 404, body = ProblemResponse)
    )
)]
pub async fn update_ingredient(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(body): Json<IngredientRequest>,
) -> Result<Json<MutationResponse>, ApiError> {
    let name = validate_ingredient_name(&body.name)?;
    state.db.update_ingredient(id, &name).await?;
    Ok(MutationResponse::done())
}

/// Removing an ingredient also drops it from every recipe.
#[utoipa::path(
    delete,
    path = "/api/ingredients/{id}",
    params(("id" = i64, Path, description = "Ingredient id")),
    responses((status = 200, body = MutationResponse), (status = 404, body = ProblemResponse))
)]
pub async fn delete_ingredient(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<MutationResponse>, ApiError> {
    let removed = state.db.delete_ingredient(id).await?;
    require_removed(removed, format!("Ingredient {id}"))
}
