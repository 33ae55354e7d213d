//! Recipes owned by the caller, and their ingredient lists.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    response::Response,
    Extension, Json,
};
use meal_builder_core::domain::{MealCategory, Recipe, RecipeDraft, RecipeIngredientLine, Unit};
use meal_builder_core::planner;
use meal_builder_core::ports::PortError;
use meal_builder_core::validation::{validate_recipe, RecipeInput};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{parse_field, reject, require_removed, MutationResponse, ProblemResponse};
use crate::error::ApiError;
use crate::web::state::{AppState, CurrentUser};

//=========================================================================================
// Payloads
//=========================================================================================

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RecipeDto {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    #[schema(value_type = String, example = "breakfast")]
    pub category: MealCategory,
    pub calories: Option<i32>,
    pub image_url: Option<String>,
}

impl From<Recipe> for RecipeDto {
    fn from(r: Recipe) -> Self {
        Self {
            id: r.id,
            title: r.title,
            description: r.description,
            category: r.category,
            calories: r.calories,
            image_url: r.image_url,
        }
    }
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RecipeRequest {
    pub title: String,
    pub description: Option<String>,
    /// One of `breakfast`, `lunch`, `dinner`, `snack`, `dessert`.
    pub category: Option<String>,
    pub calories: Option<i32>,
    pub image_url: Option<String>,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RecipeIngredientDto {
    pub recipe_id: i64,
    pub ingredient_id: i64,
    pub ingredient_name: String,
    #[schema(value_type = String, example = "150.00")]
    pub quantity: Decimal,
    #[schema(value_type = String, example = "gram")]
    pub unit: Unit,
}

impl From<RecipeIngredientLine> for RecipeIngredientDto {
    fn from(l: RecipeIngredientLine) -> Self {
        Self {
            recipe_id: l.recipe_id,
            ingredient_id: l.ingredient_id,
            ingredient_name: l.ingredient_name,
            quantity: l.quantity,
            unit: l.unit,
        }
    }
}

#[derive(Deserialize, ToSchema)]
pub struct RecipeIngredientRequest {
    #[schema(value_type = String, example = "150")]
    pub quantity: Decimal,
    /// One of `gram`, `milliliter`, `piece`; defaults to `gram`.
    pub unit: Option<String>,
}

/// Validates a recipe body. Unknown categories are reported alongside the
/// other field errors.
pub(crate) fn recipe_draft(body: RecipeRequest) -> Result<RecipeDraft, ApiError> {
    let mut errors = Vec::new();
    let category = body
        .category
        .as_deref()
        .filter(|c| !c.trim().is_empty())
        .and_then(|c| parse_field::<MealCategory>("category", c, &mut errors));

    let input = RecipeInput {
        title: body.title,
        description: body.description,
        category,
        calories: body.calories,
        image_url: body.image_url,
    };
    match validate_recipe(input) {
        Ok(draft) if errors.is_empty() => Ok(draft),
        Ok(_) => Err(reject(errors)),
        Err(PortError::Validation(more)) => {
            let bad_category = !errors.is_empty();
            errors.extend(
                more.into_iter()
                    .filter(|e| !(bad_category && e.field == "category")),
            );
            Err(reject(errors))
        }
        Err(e) => Err(e.into()),
    }
}

//=========================================================================================
// Recipe Handlers
//=========================================================================================

#[utoipa::path(
    get,
    path = "/api/recipes",
    responses((status = 200, body = [RecipeDto]), (status = 401, body = ProblemResponse))
)]
pub async fn list_recipes(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
) -> Result<Json<Vec<RecipeDto>>, ApiError> {
    let recipes = state.db.list_recipes(user.user_id).await?;
    Ok(Json(recipes.into_iter().map(Into::into).collect()))
}

#[utoipa::path(
    get,
    path = "/api/recipes/{id}",
    params(("id" = i64, Path, description = "Recipe id")),
    responses((status = 200, body = RecipeDto), (status = 404, body = ProblemResponse))
)]
pub async fn get_recipe(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> Result<Json<RecipeDto>, ApiError> {
    Ok(Json(state.db.get_recipe(user.user_id, id).await?.into()))
}

#[utoipa::path(
    post,
    path = "/api/recipes",
    request_body = RecipeRequest,
    responses((status = 201, body = MutationResponse), (status = 400, body = ProblemResponse))
)]
pub async fn create_recipe(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Json(body): Json<RecipeRequest>,
) -> Result<Response, ApiError> {
    let draft = recipe_draft(body)?;
    let recipe = state.db.create_recipe(user.user_id, &draft).await?;
    Ok(MutationResponse::created(
        format!("/api/recipes/{}", recipe.id),
        recipe.id,
    ))
}

#[utoipa::path(
    put,
    path = "/api/recipes/{id}",
    params(("id" = i64, Path, description = "Recipe id")),
    request_body = RecipeRequest,
    responses(
        (status = 200, body = MutationResponse),
        (status = 400, body = ProblemResponse),
        (status = 404, body = ProblemResponse)
    )
)]
pub async fn update_recipe(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
    Json(body): Json<RecipeRequest>,
) -> Result<Json<MutationResponse>, ApiError> {
    let draft = recipe_draft(body)?;
    state.db.update_recipe(user.user_id, id, &draft).await?;
    Ok(MutationResponse::done())
}

/// Deleting a recipe also removes its ingredient links and every slot using it.
#[utoipa::path(
    delete,
    path = "/api/recipes/{id}",
    params(("id" = i64, Path, description = "Recipe id")),
    responses((status = 200, body = MutationResponse), (status = 404, body = ProblemResponse))
)]
pub async fn delete_recipe(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> Result<Json<MutationResponse>, ApiError> {
    let removed = state.db.delete_recipe(user.user_id, id).await?;
    require_removed(removed, format!("Recipe {id}"))
}

//=========================================================================================
// Recipe Ingredient Handlers
//=========================================================================================

#[utoipa::path(
    get,
    path = "/api/recipes/{id}/ingredients",
    params(("id" = i64, Path, description = "Recipe id")),
    responses((status = 200, body = [RecipeIngredientDto]), (status = 404, body = ProblemResponse))
)]
pub async fn list_recipe_ingredients(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<RecipeIngredientDto>>, ApiError> {
    let lines = planner::list_recipe_ingredients(state.db.as_ref(), user.user_id, id).await?;
    Ok(Json(lines.into_iter().map(Into::into).collect()))
}

/// Adds the ingredient to the recipe, or overwrites its quantity and unit.
#[utoipa::path(
    put,
    path = "/api/recipes/{id}/ingredients/{ingredient_id}",
    params(
        ("id" = i64, Path, description = "Recipe id"),
        ("ingredient_id" = i64, Path, description = "Ingredient id")
    ),
    request_body = RecipeIngredientRequest,
    responses(
        (status = 200, body = MutationResponse),
        (status = 400, body = ProblemResponse),
        (status = 404, body = ProblemResponse)
    )
)]
pub async fn upsert_recipe_ingredient(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Path((id, ingredient_id)): Path<(i64, i64)>,
    Json(body): Json<RecipeIngredientRequest>,
) -> Result<Json<MutationResponse>, ApiError> {
    let mut errors = Vec::new();
    let unit = match body.unit.as_deref().filter(|u| !u.trim().is_empty()) {
        Some(u) => parse_field::<Unit>("unit", u, &mut errors),
        None => Some(Unit::default()),
    };
    let Some(unit) = unit else {
        return Err(reject(errors));
    };

    planner::upsert_recipe_ingredient(
        state.db.as_ref(),
        user.user_id,
        id,
        ingredient_id,
        body.quantity,
        unit,
    )
    .await?;
    Ok(MutationResponse::done())
}

#[utoipa::path(
    delete,
    path = "/api/recipes/{id}/ingredients/{ingredient_id}",
    params(
        ("id" = i64, Path, description = "Recipe id"),
        ("ingredient_id" = i64, Path, description = "Ingredient id")
    ),
    responses((status = 200, body = MutationResponse), (status = 404, body = ProblemResponse))
)]
pub async fn delete_recipe_ingredient(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Path((id, ingredient_id)): Path<(i64, i64)>,
) -> Result<Json<MutationResponse>, ApiError> {
    let removed =
        planner::remove_recipe_ingredient(state.db.as_ref(), user.user_id, id, ingredient_id)
            .await?;
    require_removed(
        removed,
        format!("Ingredient {ingredient_id} of recipe {id}"),
    )
}
