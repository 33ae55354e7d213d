//! Meal plans owned by the caller, plus the weekly grid projection.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    response::Response,
    Extension, Json,
};
use meal_builder_core::domain::{DayOfWeek, MealPlan, MealType};
use meal_builder_core::grid::{GridCell, WeeklyGrid};
use meal_builder_core::planner;
use meal_builder_core::validation::validate_meal_plan_name;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{require_removed, MutationResponse, ProblemResponse};
use crate::error::ApiError;
use crate::web::state::{AppState, CurrentUser};

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MealPlanDto {
    pub id: i64,
    pub name: String,
}

impl From<MealPlan> for MealPlanDto {
    fn from(p: MealPlan) -> Self {
        Self {
            id: p.id,
            name: p.name,
        }
    }
}

#[derive(Deserialize, ToSchema)]
pub struct MealPlanRequest {
    pub name: String,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GridCellDto {
    #[schema(value_type = String, example = "monday")]
    pub day: DayOfWeek,
    #[schema(value_type = String, example = "breakfast")]
    pub meal_type: MealType,
    pub slot_id: Option<i64>,
    pub recipe_id: Option<i64>,
    pub recipe_title: Option<String>,
    pub notes: Option<String>,
    pub calories: Option<i32>,
}

impl From<GridCell> for GridCellDto {
    fn from(c: GridCell) -> Self {
        Self {
            day: c.day,
            meal_type: c.meal_type,
            slot_id: c.slot_id,
            recipe_id: c.recipe_id,
            recipe_title: c.recipe_title,
            notes: c.notes,
            calories: c.calories,
        }
    }
}

/// Every (day, meal type) cell of a plan, empty ones included.
#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GridDto {
    pub meal_plan_id: i64,
    pub name: String,
    pub cells: Vec<GridCellDto>,
}

impl From<WeeklyGrid> for GridDto {
    fn from(g: WeeklyGrid) -> Self {
        Self {
            meal_plan_id: g.meal_plan_id,
            name: g.name,
            cells: g.cells.into_iter().map(Into::into).collect(),
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/mealplans",
    responses((status = 200, body = [MealPlanDto]), (status = 401, body = ProblemResponse))
)]
pub async fn list_meal_plans(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
) -> Result<Json<Vec<MealPlanDto>>, ApiError> {
    let plans = state.db.list_meal_plans(user.user_id).await?;
    Ok(Json(plans.into_iter().map(Into::into).collect()))
}

#[utoipa::path(
    get,
    path = "/api/mealplans/{id}",
    params(("id" = i64, Path, description = "Meal plan id")),
    responses((status = 200, body = MealPlanDto), (status = 404, body = ProblemResponse))
)]
pub async fn get_meal_plan(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> Result<Json<MealPlanDto>, ApiError> {
    Ok(Json(state.db.get_meal_plan(user.user_id, id).await?.into()))
}

#[utoipa::path(
    post,
    path = "/api/mealplans",
    request_body = MealPlanRequest,
    responses((status = 201, body = MutationResponse), (status = 400, body = ProblemResponse))
)]
pub async fn create_meal_plan(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Json(body): Json<MealPlanRequest>,
) -> Result<Response, ApiError> {
    let name = validate_meal_plan_name(&body.name)?;
    let plan = state.db.create_meal_plan(user.user_id, &name).await?;
    Ok(MutationResponse::created(
        format!("/api/mealplans/{}", plan.id),
        plan.id,
    ))
}

#[utoipa::path(
    put,
    path = "/api/mealplans/{id}",
    params(("id" = i64, Path, description = "Meal plan id")),
    request_body = MealPlanRequest,
    responses(
        (status = 200, body = MutationResponse),
        (status = 400, body = ProblemResponse),
        (status = 404, body = ProblemResponse)
    )
)]
pub async fn update_meal_plan(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
    Json(body): Json<MealPlanRequest>,
) -> Result<Json<MutationResponse>, ApiError> {
    let name = validate_meal_plan_name(&body.name)?;
    state.db.update_meal_plan(user.user_id, id, &name).await?;
    Ok(MutationResponse::done())
}

#[utoipa::path(
    delete,
    path = "/api/mealplans/{id}",
    params(("id" = i64, Path, description = "Meal plan id")),
    responses((status = 200, body = MutationResponse), (status = 404, body = ProblemResponse))
)]
pub async fn delete_meal_plan(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> Result<Json<MutationResponse>, ApiError> {
    let removed = state.db.delete_meal_plan(user.user_id, id).await?;
    require_removed(removed, format!("Meal plan {id}"))
}

/// The full weekly grid in calendar order, Sunday first.
#[utoipa::path(
    get,
    path = "/api/mealplans/{id}/grid",
    params(("id" = i64, Path, description = "Meal plan id")),
    responses((status = 200, body = GridDto), (status = 404, body = ProblemResponse))
)]
pub async fn get_grid(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> Result<Json<GridDto>, ApiError> {
    let grid = planner::load_grid(
        state.db.as_ref(),
        user.user_id,
        id,
        DayOfWeek::Sunday,
    )
    .await?;
    Ok(Json(grid.into()))
}
