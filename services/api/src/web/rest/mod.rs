//! services/api/src/web/rest/mod.rs
//!
//! The JSON API under `/api` and the master definition for the OpenAPI
//! specification.

pub mod ingredients;
pub mod meal_plans;
pub mod recipes;
pub mod slots;

use std::str::FromStr;
use std::sync::Arc;

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, patch, put},
    Json, Router,
};
use meal_builder_core::ports::{FieldError, PortError};
use serde::Serialize;
use utoipa::{OpenApi, ToSchema};

use crate::error::ApiError;
use crate::web::{auth, state::AppState};

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        auth::login_handler,
        auth::callback_handler,
        auth::logout_handler,
        ingredients::list_ingredients,
        ingredients::get_ingredient,
        ingredients::create_ingredient,
        ingredients::update_ingredient,
        ingredients::delete_ingredient,
        recipes::list_recipes,
        recipes::get_recipe,
        recipes::create_recipe,
        recipes::update_recipe,
        recipes::delete_recipe,
        recipes::list_recipe_ingredients,
        recipes::upsert_recipe_ingredient,
        recipes::delete_recipe_ingredient,
        meal_plans::list_meal_plans,
        meal_plans::get_meal_plan,
        meal_plans::create_meal_plan,
        meal_plans::update_meal_plan,
        meal_plans::delete_meal_plan,
        meal_plans::get_grid,
        slots::list_slots,
        slots::upsert_slot,
        slots::patch_slot_notes,
        slots::delete_slot,
    ),
    components(
        schemas(
            MutationResponse,
            ProblemResponse,
            ingredients::IngredientDto,
            ingredients::IngredientRequest,
            recipes::RecipeDto,
            recipes::RecipeRequest,
            recipes::RecipeIngredientDto,
            recipes::RecipeIngredientRequest,
            meal_plans::MealPlanDto,
            meal_plans::MealPlanRequest,
            meal_plans::GridDto,
            meal_plans::GridCellDto,
            slots::SlotListResponse,
            slots::SlotDto,
            slots::SlotUpsertRequest,
            slots::SlotNotesRequest,
        )
    ),
    tags(
        (name = "Meal Builder API", description = "Ingredients, recipes and weekly meal plans.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// Shared Response Payloads
//=========================================================================================

/// The body every mutation answers with.
#[derive(Serialize, ToSchema, Debug, PartialEq, Eq)]
pub struct MutationResponse {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
}

impl MutationResponse {
    pub fn done() -> Json<Self> {
        Json(Self { ok: true, id: None })
    }

    pub fn with_id(id: i64) -> Json<Self> {
        Json(Self { ok: true, id: Some(id) })
    }

    /// `201 Created` with a `Location` header pointing at the new resource.
    pub fn created(location: String, id: i64) -> Response {
        (
            StatusCode::CREATED,
            [(header::LOCATION, location)],
            Self::with_id(id),
        )
            .into_response()
    }
}

/// The problem document error responses carry. Only documented here; the
/// body is produced by `ApiError`.
#[derive(Serialize, ToSchema)]
pub struct ProblemResponse {
    pub title: String,
    pub status: u16,
    pub detail: Option<String>,
    #[schema(value_type = Option<Object>)]
    pub errors: Option<serde_json::Value>,
}

//=========================================================================================
// Request Helpers
//=========================================================================================

/// Parses an enum-valued request field, recording a field error on failure.
pub(crate) fn parse_field<T: FromStr>(
    field: &str,
    value: &str,
    errors: &mut Vec<FieldError>,
) -> Option<T> {
    match value.trim().parse() {
        Ok(v) => Some(v),
        Err(_) => {
            errors.push(FieldError::new(field, format!("'{value}' is not a valid value")));
            None
        }
    }
}

pub(crate) fn reject(errors: Vec<FieldError>) -> ApiError {
    ApiError::Port(PortError::Validation(errors))
}

/// Turns a removal that found nothing into a 404.
pub(crate) fn require_removed(removed: bool, what: String) -> Result<Json<MutationResponse>, ApiError> {
    if removed {
        Ok(MutationResponse::done())
    } else {
        Err(PortError::NotFound(format!("{what} not found")).into())
    }
}

//=========================================================================================
// Router
//=========================================================================================

/// The `/api` routes. Authentication is layered on by the caller.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/api/ingredients",
            get(ingredients::list_ingredients).post(ingredients::create_ingredient),
        )
        .route(
            "/api/ingredients/{id}",
            get(ingredients::get_ingredient)
                .put(ingredients::update_ingredient)
                .delete(ingredients::delete_ingredient),
        )
        .route(
            "/api/recipes",
            get(recipes::list_recipes).post(recipes::create_recipe),
        )
        .route(
            "/api/recipes/{id}",
            get(recipes::get_recipe)
                .put(recipes::update_recipe)
                .delete(recipes::delete_recipe),
        )
        .route(
            "/api/recipes/{id}/ingredients",
            get(recipes::list_recipe_ingredients),
        )
        .route(
            "/api/recipes/{id}/ingredients/{ingredient_id}",
            put(recipes::upsert_recipe_ingredient).delete(recipes::delete_recipe_ingredient),
        )
        .route(
            "/api/mealplans",
            get(meal_plans::list_meal_plans).post(meal_plans::create_meal_plan),
        )
        .route(
            "/api/mealplans/{id}",
            get(meal_plans::get_meal_plan)
                .put(meal_plans::update_meal_plan)
                .delete(meal_plans::delete_meal_plan),
        )
        .route("/api/mealplans/{id}/grid", get(meal_plans::get_grid))
        .route(
            "/api/mealplans/{id}/slots",
            get(slots::list_slots).put(slots::upsert_slot),
        )
        .route(
            "/api/mealplans/{id}/slots/{slot_id}/notes",
            patch(slots::patch_slot_notes),
        )
        .route(
            "/api/mealplans/{id}/slots/{slot_id}",
            axum::routing::delete(slots::delete_slot),
        )
}
