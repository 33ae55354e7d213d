//! Slot assignment inside a meal plan: list, upsert, notes, removal.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Extension, Json,
};
use meal_builder_core::domain::{DayOfWeek, MealType, PlannedMeal};
use meal_builder_core::planner::{self, SlotRequest};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{parse_field, reject, require_removed, MutationResponse, ProblemResponse};
use crate::error::ApiError;
use crate::web::state::{AppState, CurrentUser};

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SlotDto {
    pub slot_id: i64,
    pub meal_plan_id: i64,
    #[schema(value_type = String, example = "monday")]
    pub day: DayOfWeek,
    #[schema(value_type = String, example = "dinner")]
    pub meal_type: MealType,
    pub recipe_id: i64,
    pub recipe_title: String,
    pub notes: Option<String>,
}

impl From<PlannedMeal> for SlotDto {
    fn from(m: PlannedMeal) -> Self {
        Self {
            slot_id: m.slot.id,
            meal_plan_id: m.slot.meal_plan_id,
            day: m.slot.day,
            meal_type: m.slot.meal_type,
            recipe_id: m.slot.recipe_id,
            recipe_title: m.recipe_title,
            notes: m.slot.notes,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct SlotListResponse {
    pub id: i64,
    pub name: String,
    pub slots: Vec<SlotDto>,
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SlotUpsertRequest {
    pub recipe_id: i64,
    /// `sunday` .. `saturday`.
    pub day: String,
    /// `breakfast`, `lunch`, `dinner`, `snack` or `dessert`.
    pub meal_type: String,
    pub notes: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct SlotNotesRequest {
    pub notes: Option<String>,
}

/// The assigned slots of a plan, sorted by day then meal type.
#[utoipa::path(
    get,
    path = "/api/mealplans/{id}/slots",
    params(("id" = i64, Path, description = "Meal plan id")),
    responses((status = 200, body = SlotListResponse), (status = 404, body = ProblemResponse))
)]
pub async fn list_slots(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> Result<Json<SlotListResponse>, ApiError> {
    let (plan, meals) = planner::list_slots(state.db.as_ref(), user.user_id, id).await?;
    Ok(Json(SlotListResponse {
        id: plan.id,
        name: plan.name,
        slots: meals.into_iter().map(Into::into).collect(),
    }))
}

/// Puts a recipe into a (day, meal type) cell, replacing whatever was there.
/// The returned id is the same for every write to the same cell.
#[utoipa::path(
    put,
    path = "/api/mealplans/{id}/slots",
    params(("id" = i64, Path, description = "Meal plan id")),
    request_body = SlotUpsertRequest,
    responses(
        (status = 200, body = MutationResponse),
        (status = 400, body = ProblemResponse),
        (status = 404, body = ProblemResponse),
        (status = 409, body = ProblemResponse)
    )
)]
pub async fn upsert_slot(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
    Json(body): Json<SlotUpsertRequest>,
) -> Result<Json<MutationResponse>, ApiError> {
    let mut errors = Vec::new();
    let day = parse_field::<DayOfWeek>("day", &body.day, &mut errors);
    let meal_type = parse_field::<MealType>("meal_type", &body.meal_type, &mut errors);
    let (Some(day), Some(meal_type)) = (day, meal_type) else {
        return Err(reject(errors));
    };

    let request = SlotRequest {
        recipe_id: body.recipe_id,
        day,
        meal_type,
        notes: body.notes,
    };
    let slot_id = planner::upsert_slot(state.db.as_ref(), user.user_id, id, request).await?;
    Ok(MutationResponse::with_id(slot_id))
}

#[utoipa::path(
    patch,
    path = "/api/mealplans/{id}/slots/{slot_id}/notes",
    params(
        ("id" = i64, Path, description = "Meal plan id"),
        ("slot_id" = i64, Path, description = "Slot id")
    ),
    request_body = SlotNotesRequest,
    responses((status = 200, body = MutationResponse), (status = 404, body = ProblemResponse))
)]
pub async fn patch_slot_notes(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Path((id, slot_id)): Path<(i64, i64)>,
    Json(body): Json<SlotNotesRequest>,
) -> Result<Json<MutationResponse>, ApiError> {
    planner::patch_slot_notes(
        state.db.as_ref(),
        user.user_id,
        id,
        slot_id,
        body.notes.as_deref(),
    )
    .await?;
    Ok(MutationResponse::done())
}

#[utoipa::path(
    delete,
    path = "/api/mealplans/{id}/slots/{slot_id}",
    params(
        ("id" = i64, Path, description = "Meal plan id"),
        ("slot_id" = i64, Path, description = "Slot id")
    ),
    responses((status = 200, body = MutationResponse), (status = 404, body = ProblemResponse))
)]
pub async fn delete_slot(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Path((id, slot_id)): Path<(i64, i64)>,
) -> Result<Json<MutationResponse>, ApiError> {
    let removed = planner::remove_slot(state.db.as_ref(), user.user_id, id, slot_id).await?;
    require_removed(removed, format!("Slot {slot_id} in meal plan {id}"))
}
