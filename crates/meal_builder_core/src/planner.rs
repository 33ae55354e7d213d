//! Ownership-checked workflows over the `DatabaseService` port.
//!
//! Every operation takes the caller's user id explicitly. Resources owned by
//! another user are reported exactly like missing ones (`NotFound`).
//! Removals return whether a row was deleted and leave it to the caller to
//! decide what absence means.

use rust_decimal::Decimal;

use crate::domain::{
    DayOfWeek, MealPlan, MealType, PlannedMeal, RecipeIngredient, RecipeIngredientLine,
    SlotAssignment, Unit,
};
use crate::grid::WeeklyGrid;
use crate::ports::{DatabaseService, PortError, PortResult};
use crate::validation::{normalize_notes, validate_quantity};

/// A request to put a recipe into a (day, meal type) cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotRequest {
    pub recipe_id: i64,
    pub day: DayOfWeek,
    pub meal_type: MealType,
    pub notes: Option<String>,
}

/// Assigns a recipe to a cell of an owned plan, replacing whatever was there.
/// Returns the slot id, which is stable across overwrites.
pub async fn upsert_slot(
    db: &dyn DatabaseService,
    user_id: i64,
    meal_plan_id: i64,
    request: SlotRequest,
) -> PortResult<i64> {
    db.get_meal_plan(user_id, meal_plan_id).await?;
    db.get_recipe(user_id, request.recipe_id).await?;

    let assignment = SlotAssignment {
        meal_plan_id,
        recipe_id: request.recipe_id,
        day: request.day,
        meal_type: request.meal_type,
        notes: normalize_notes(request.notes.as_deref()),
    };
    db.upsert_slot(&assignment).await
}

pub async fn patch_slot_notes(
    db: &dyn DatabaseService,
    user_id: i64,
    meal_plan_id: i64,
    slot_id: i64,
    notes: Option<&str>,
) -> PortResult<()> {
    let notes = normalize_notes(notes);
    let updated = db
        .update_slot_notes(user_id, meal_plan_id, slot_id, notes.as_deref())
        .await?;
    if updated {
        Ok(())
    } else {
        Err(slot_not_found(meal_plan_id, slot_id))
    }
}

/// Returns `false` when the slot did not exist (or the plan is not owned).
pub async fn remove_slot(
    db: &dyn DatabaseService,
    user_id: i64,
    meal_plan_id: i64,
    slot_id: i64,
) -> PortResult<bool> {
    db.delete_slot(user_id, meal_plan_id, slot_id).await
}

/// The filled slots of an owned plan, sorted by day then meal type.
pub async fn list_slots(
    db: &dyn DatabaseService,
    user_id: i64,
    meal_plan_id: i64,
) -> PortResult<(MealPlan, Vec<PlannedMeal>)> {
    let plan = db.get_meal_plan(user_id, meal_plan_id).await?;
    let mut meals = db.list_planned_meals(meal_plan_id).await?;
    meals.sort_by_key(|m| (m.slot.day, m.slot.meal_type));
    Ok((plan, meals))
}

pub async fn load_grid(
    db: &dyn DatabaseService,
    user_id: i64,
    meal_plan_id: i64,
    week_start: DayOfWeek,
) -> PortResult<WeeklyGrid> {
    let plan = db.get_meal_plan(user_id, meal_plan_id).await?;
    let meals = db.list_planned_meals(meal_plan_id).await?;
    Ok(WeeklyGrid::project(&plan, &meals, week_start))
}

/// Grid lookup by plan id alone, for callers without a user identity.
pub async fn load_public_grid(
    db: &dyn DatabaseService,
    meal_plan_id: i64,
    week_start: DayOfWeek,
) -> PortResult<Option<WeeklyGrid>> {
    let Some(plan) = db.find_meal_plan(meal_plan_id).await? else {
        return Ok(None);
    };
    let meals = db.list_planned_meals(meal_plan_id).await?;
    Ok(Some(WeeklyGrid::project(&plan, &meals, week_start)))
}

pub async fn list_recipe_ingredients(
    db: &dyn DatabaseService,
    user_id: i64,
    recipe_id: i64,
) -> PortResult<Vec<RecipeIngredientLine>> {
    db.get_recipe(user_id, recipe_id).await?;
    db.list_recipe_ingredients(recipe_id).await
}

/// Links an ingredient to an owned recipe, or overwrites quantity and unit
/// of the existing link.
pub async fn upsert_recipe_ingredient(
    db: &dyn DatabaseService,
    user_id: i64,
    recipe_id: i64,
    ingredient_id: i64,
    quantity: Decimal,
    unit: Unit,
) -> PortResult<()> {
    let quantity = validate_quantity(quantity)?;
    db.get_recipe(user_id, recipe_id).await?;
    db.get_ingredient(ingredient_id).await?;

    let link = RecipeIngredient {
        recipe_id,
        ingredient_id,
        quantity,
        unit,
    };
    db.upsert_recipe_ingredient(&link).await
}

/// Fails with `NotFound` when the recipe is not owned; returns `false` when
/// the link did not exist.
pub async fn remove_recipe_ingredient(
    db: &dyn DatabaseService,
    user_id: i64,
    recipe_id: i64,
    ingredient_id: i64,
) -> PortResult<bool> {
    db.get_recipe(user_id, recipe_id).await?;
    db.delete_recipe_ingredient(recipe_id, ingredient_id).await
}

fn slot_not_found(meal_plan_id: i64, slot_id: i64) -> PortError {
    PortError::NotFound(format!("Slot {slot_id} not found in meal plan {meal_plan_id}"))
}
