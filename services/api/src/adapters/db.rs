//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the `DatabaseService` port from the `core` crate. It handles all interactions
//! with the PostgreSQL database using `sqlx`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use meal_builder_core::domain::{
    ExternalIdentity, Ingredient, MealPlan, PlannedMeal, Recipe, RecipeDraft, RecipeIngredient,
    RecipeIngredientLine, Slot, SlotAssignment, User,
};
use meal_builder_core::ports::{DatabaseService, PortError, PortResult};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool};
use std::str::FromStr;
use tracing::warn;

const UNIQUE_VIOLATION: &str = "23505";
const FOREIGN_KEY_VIOLATION: &str = "23503";

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `DatabaseService` port.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::Error> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

//=========================================================================================
// Error Mapping
//=========================================================================================

fn unexpected(e: sqlx::Error) -> PortError {
    PortError::Unexpected(e.to_string())
}

/// Maps constraint violations raised by writes; everything else is unexpected.
fn write_error(e: sqlx::Error, what: &str) -> PortError {
    let code = e
        .as_database_error()
        .and_then(|d| d.code())
        .map(|c| c.into_owned());
    match code.as_deref() {
        Some(UNIQUE_VIOLATION) => {
            warn!("Unique violation while writing {}: {}", what, e);
            PortError::Conflict(format!("{what} was modified concurrently"))
        }
        Some(FOREIGN_KEY_VIOLATION) => {
            PortError::NotFound(format!("{what} references a missing row"))
        }
        _ => unexpected(e),
    }
}

fn parse<T>(value: &str) -> PortResult<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value
        .parse()
        .map_err(|e: T::Err| PortError::Unexpected(format!("corrupt stored value: {e}")))
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct UserRecord {
    id: i64,
    provider: String,
    provider_user_id: String,
    email: String,
    name: Option<String>,
}
impl UserRecord {
    fn to_domain(self) -> User {
        User {
            id: self.id,
            provider: self.provider,
            provider_user_id: self.provider_user_id,
            email: self.email,
            name: self.name,
        }
    }
}

#[derive(FromRow)]
struct IngredientRecord {
    id: i64,
    name: String,
}
impl IngredientRecord {
    fn to_domain(self) -> Ingredient {
        Ingredient {
            id: self.id,
            name: self.name,
        }
    }
}

#[derive(FromRow)]
struct RecipeRecord {
    id: i64,
    owner_id: i64,
    title: String,
    description: Option<String>,
    category: String,
    calories: Option<i32>,
    image_url: Option<String>,
}
impl RecipeRecord {
    fn to_domain(self) -> PortResult<Recipe> {
        Ok(Recipe {
            id: self.id,
            owner_id: self.owner_id,
            title: self.title,
            description: self.description,
            category: parse(&self.category)?,
            calories: self.calories,
            image_url: self.image_url,
        })
    }
}

#[derive(FromRow)]
struct RecipeIngredientRecord {
    recipe_id: i64,
    ingredient_id: i64,
    ingredient_name: String,
    quantity: Decimal,
    unit: String,
}
impl RecipeIngredientRecord {
    fn to_domain(self) -> PortResult<RecipeIngredientLine> {
        Ok(RecipeIngredientLine {
            recipe_id: self.recipe_id,
            ingredient_id: self.ingredient_id,
            ingredient_name: self.ingredient_name,
            quantity: self.quantity,
            unit: parse(&self.unit)?,
        })
    }
}

#[derive(FromRow)]
struct MealPlanRecord {
    id: i64,
    owner_id: i64,
    name: String,
}
impl MealPlanRecord {
    fn to_domain(self) -> MealPlan {
        MealPlan {
            id: self.id,
            owner_id: self.owner_id,
            name: self.name,
        }
    }
}

#[derive(FromRow)]
struct PlannedMealRecord {
    id: i64,
    meal_plan_id: i64,
    recipe_id: i64,
    day: String,
    meal_type: String,
    notes: Option<String>,
    recipe_title: String,
    calories: Option<i32>,
}
impl PlannedMealRecord {
    fn to_domain(self) -> PortResult<PlannedMeal> {
        Ok(PlannedMeal {
            slot: Slot {
                id: self.id,
                meal_plan_id: self.meal_plan_id,
                recipe_id: self.recipe_id,
                day: parse(&self.day)?,
                meal_type: parse(&self.meal_type)?,
                notes: self.notes,
            },
            recipe_title: self.recipe_title,
            calories: self.calories,
        })
    }
}

const RECIPE_COLUMNS: &str = "id, owner_id, title, description, category, calories, image_url";

//=========================================================================================
// `DatabaseService` Trait Implementation
//=========================================================================================

#[async_trait]
impl DatabaseService for DbAdapter {
    async fn get_or_create_user(&self, identity: &ExternalIdentity) -> PortResult<User> {
        let record = sqlx::query_as::<_, UserRecord>(
            "INSERT INTO users (provider, provider_user_id, email, name) \
             VALUES ($1, $2, $3, $4) \
             ON CONFLICT (provider, provider_user_id) \
             DO UPDATE SET email = EXCLUDED.email, name = EXCLUDED.name \
             RETURNING id, provider, provider_user_id, email, name",
        )
        .bind(&identity.provider)
        .bind(&identity.subject)
        .bind(&identity.email)
        .bind(&identity.name)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(record.to_domain())
    }

    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: i64,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()> {
        sqlx::query("INSERT INTO auth_sessions (id, user_id, expires_at) VALUES ($1, $2, $3)")
            .bind(session_id)
            .bind(user_id)
            .bind(expires_at)
            .execute(&self.pool)
            .await
            .map_err(|e| write_error(e, "auth session"))?;
        Ok(())
    }

    async fn validate_auth_session(&self, session_id: &str) -> PortResult<i64> {
        let row: Option<(i64,)> = sqlx::query_as(
            "SELECT user_id FROM auth_sessions WHERE id = $1 AND expires_at > now()",
        )
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?;
        row.map(|(user_id,)| user_id).ok_or(PortError::Unauthorized)
    }

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()> {
        sqlx::query("DELETE FROM auth_sessions WHERE id = $1")
            .bind(session_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    async fn list_ingredients(&self) -> PortResult<Vec<Ingredient>> {
        let records = sqlx::query_as::<_, IngredientRecord>(
            "SELECT id, name FROM ingredients ORDER BY name, id",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn get_ingredient(&self, id: i64) -> PortResult<Ingredient> {
        let record = sqlx::query_as::<_, IngredientRecord>(
            "SELECT id, name FROM ingredients WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?
        .ok_or_else(|| PortError::NotFound(format!("Ingredient {} not found", id)))?;
        Ok(record.to_domain())
    }

    async fn create_ingredient(&self, name: &str) -> PortResult<Ingredient> {
        let record = sqlx::query_as::<_, IngredientRecord>(
            "INSERT INTO ingredients (name) VALUES ($1) RETURNING id, name",
        )
        .bind(name)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| write_error(e, "ingredient"))?;
        Ok(record.to_domain())
    }

    async fn update_ingredient(&self, id: i64, name: &str) -> PortResult<()> {
        let result = sqlx::query("UPDATE ingredients SET name = $1 WHERE id = $2")
            .bind(name)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| write_error(e, "ingredient"))?;
        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!("Ingredient {} not found", id)));
        }
        Ok(())
    }

    async fn delete_ingredient(&self, id: i64) -> PortResult<bool> {
        let result = sqlx::query("DELETE FROM ingredients WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_recipes(&self, owner: i64) -> PortResult<Vec<Recipe>> {
        let records = sqlx::query_as::<_, RecipeRecord>(&format!(
            "SELECT {RECIPE_COLUMNS} FROM recipes WHERE owner_id = $1 ORDER BY title, id"
        ))
        .bind(owner)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        records.into_iter().map(|r| r.to_domain()).collect()
    }

    async fn get_recipe(&self, owner: i64, id: i64) -> PortResult<Recipe> {
        sqlx::query_as::<_, RecipeRecord>(&format!(
            "SELECT {RECIPE_COLUMNS} FROM recipes WHERE id = $1 AND owner_id = $2"
        ))
        .bind(id)
        .bind(owner)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?
        .ok_or_else(|| PortError::NotFound(format!("Recipe {} not found", id)))?
        .to_domain()
    }

    async fn create_recipe(&self, owner: i64, draft: &RecipeDraft) -> PortResult<Recipe> {
        sqlx::query_as::<_, RecipeRecord>(&format!(
            "INSERT INTO recipes (owner_id, title, description, category, calories, image_url) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING {RECIPE_COLUMNS}"
        ))
        .bind(owner)
        .bind(&draft.title)
        .bind(&draft.description)
        .bind(draft.category.as_str())
        .bind(draft.calories)
        .bind(&draft.image_url)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| write_error(e, "recipe"))?
        .to_domain()
    }

    async fn update_recipe(&self, owner: i64, id: i64, draft: &RecipeDraft) -> PortResult<()> {
        let result = sqlx::query(
            "UPDATE recipes \
             SET title = $1, description = $2, category = $3, calories = $4, image_url = $5 \
             WHERE id = $6 AND owner_id = $7",
        )
        .bind(&draft.title)
        .bind(&draft.description)
        .bind(draft.category.as_str())
        .bind(draft.calories)
        .bind(&draft.image_url)
        .bind(id)
        .bind(owner)
        .execute(&self.pool)
        .await
        .map_err(|e| write_error(e, "recipe"))?;
        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!("Recipe {} not found", id)));
        }
        Ok(())
    }

    async fn delete_recipe(&self, owner: i64, id: i64) -> PortResult<bool> {
        // Links and slots go with it through ON DELETE CASCADE.
        let result = sqlx::query("DELETE FROM recipes WHERE id = $1 AND owner_id = $2")
            .bind(id)
            .bind(owner)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(result.rows_affected() > 0)
    }

    async fn count_recipe_usages(&self, recipe_id: i64) -> PortResult<i64> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM meal_plan_slots WHERE recipe_id = $1")
                .bind(recipe_id)
                .fetch_one(&self.pool)
                .await
                .map_err(unexpected)?;
        Ok(count)
    }

    async fn list_recipe_ingredients(
        &self,
        recipe_id: i64,
    ) -> PortResult<Vec<RecipeIngredientLine>> {
        let records = sqlx::query_as::<_, RecipeIngredientRecord>(
            "SELECT ri.recipe_id, ri.ingredient_id, i.name AS ingredient_name, ri.quantity, ri.unit \
             FROM recipe_ingredients ri \
             JOIN ingredients i ON i.id = ri.ingredient_id \
             WHERE ri.recipe_id = $1 \
             ORDER BY i.name, i.id",
        )
        .bind(recipe_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        records.into_iter().map(|r| r.to_domain()).collect()
    }

    async fn upsert_recipe_ingredient(&self, link: &RecipeIngredient) -> PortResult<()> {
        sqlx::query(
            "INSERT INTO recipe_ingredients (recipe_id, ingredient_id, quantity, unit) \
             VALUES ($1, $2, $3, $4) \
             ON CONFLICT (recipe_id, ingredient_id) \
             DO UPDATE SET quantity = EXCLUDED.quantity, unit = EXCLUDED.unit",
        )
        .bind(link.recipe_id)
        .bind(link.ingredient_id)
        .bind(link.quantity)
        .bind(link.unit.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| write_error(e, "recipe ingredient"))?;
        Ok(())
    }

    async fn delete_recipe_ingredient(
        &self,
        recipe_id: i64,
        ingredient_id: i64,
    ) -> PortResult<bool> {
        let result = sqlx::query(
            "DELETE FROM recipe_ingredients WHERE recipe_id = $1 AND ingredient_id = $2",
        )
        .bind(recipe_id)
        .bind(ingredient_id)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_meal_plans(&self, owner: i64) -> PortResult<Vec<MealPlan>> {
        let records = sqlx::query_as::<_, MealPlanRecord>(
            "SELECT id, owner_id, name FROM meal_plans WHERE owner_id = $1 ORDER BY id",
        )
        .bind(owner)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn get_meal_plan(&self, owner: i64, id: i64) -> PortResult<MealPlan> {
        let record = sqlx::query_as::<_, MealPlanRecord>(
            "SELECT id, owner_id, name FROM meal_plans WHERE id = $1 AND owner_id = $2",
        )
        .bind(id)
        .bind(owner)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?
        .ok_or_else(|| PortError::NotFound(format!("Meal plan {} not found", id)))?;
        Ok(record.to_domain())
    }

    async fn find_meal_plan(&self, id: i64) -> PortResult<Option<MealPlan>> {
        let record = sqlx::query_as::<_, MealPlanRecord>(
            "SELECT id, owner_id, name FROM meal_plans WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(record.map(|r| r.to_domain()))
    }

    async fn create_meal_plan(&self, owner: i64, name: &str) -> PortResult<MealPlan> {
        let record = sqlx::query_as::<_, MealPlanRecord>(
            "INSERT INTO meal_plans (owner_id, name) VALUES ($1, $2) RETURNING id, owner_id, name",
        )
        .bind(owner)
        .bind(name)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| write_error(e, "meal plan"))?;
        Ok(record.to_domain())
    }

    async fn update_meal_plan(&self, owner: i64, id: i64, name: &str) -> PortResult<()> {
        let result = sqlx::query("UPDATE meal_plans SET name = $1 WHERE id = $2 AND owner_id = $3")
            .bind(name)
            .bind(id)
            .bind(owner)
            .execute(&self.pool)
            .await
            .map_err(|e| write_error(e, "meal plan"))?;
        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!("Meal plan {} not found", id)));
        }
        Ok(())
    }

    async fn delete_meal_plan(&self, owner: i64, id: i64) -> PortResult<bool> {
        let result = sqlx::query("DELETE FROM meal_plans WHERE id = $1 AND owner_id = $2")
            .bind(id)
            .bind(owner)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_planned_meals(&self, meal_plan_id: i64) -> PortResult<Vec<PlannedMeal>> {
        let records = sqlx::query_as::<_, PlannedMealRecord>(
            "SELECT s.id, s.meal_plan_id, s.recipe_id, s.day, s.meal_type, s.notes, \
                    r.title AS recipe_title, r.calories \
             FROM meal_plan_slots s \
             JOIN recipes r ON r.id = s.recipe_id \
             WHERE s.meal_plan_id = $1 \
             ORDER BY s.id",
        )
        .bind(meal_plan_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        records.into_iter().map(|r| r.to_domain()).collect()
    }

    async fn upsert_slot(&self, assignment: &SlotAssignment) -> PortResult<i64> {
        let mut tx = self.pool.begin().await.map_err(unexpected)?;

        let existing: Option<(i64,)> = sqlx::query_as(
            "SELECT id FROM meal_plan_slots \
             WHERE meal_plan_id = $1 AND day = $2 AND meal_type = $3 \
             FOR UPDATE",
        )
        .bind(assignment.meal_plan_id)
        .bind(assignment.day.as_str())
        .bind(assignment.meal_type.as_str())
        .fetch_optional(&mut *tx)
        .await
        .map_err(unexpected)?;

        let slot_id = match existing {
            Some((id,)) => {
                sqlx::query("UPDATE meal_plan_slots SET recipe_id = $1, notes = $2 WHERE id = $3")
                    .bind(assignment.recipe_id)
                    .bind(&assignment.notes)
                    .bind(id)
                    .execute(&mut *tx)
                    .await
                    .map_err(|e| write_error(e, "meal plan slot"))?;
                id
            }
            None => {
                // Two writers can both miss the row above; the cell constraint
                // lets only one insert through and the other gets a Conflict.
                let (id,): (i64,) = sqlx::query_as(
                    "INSERT INTO meal_plan_slots (meal_plan_id, recipe_id, day, meal_type, notes) \
                     VALUES ($1, $2, $3, $4, $5) \
                     RETURNING id",
                )
                .bind(assignment.meal_plan_id)
                .bind(assignment.recipe_id)
                .bind(assignment.day.as_str())
                .bind(assignment.meal_type.as_str())
                .bind(&assignment.notes)
                .fetch_one(&mut *tx)
                .await
                .map_err(|e| write_error(e, "meal plan slot"))?;
                id
            }
        };

        tx.commit().await.map_err(|e| write_error(e, "meal plan slot"))?;
        Ok(slot_id)
    }

    async fn update_slot_notes(
        &self,
        owner: i64,
        meal_plan_id: i64,
        slot_id: i64,
        notes: Option<&str>,
    ) -> PortResult<bool> {
        let result = sqlx::query(
            "UPDATE meal_plan_slots s SET notes = $1 \
             FROM meal_plans p \
             WHERE s.id = $2 AND s.meal_plan_id = $3 \
               AND p.id = s.meal_plan_id AND p.owner_id = $4",
        )
        .bind(notes)
        .bind(slot_id)
        .bind(meal_plan_id)
        .bind(owner)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_slot(&self, owner: i64, meal_plan_id: i64, slot_id: i64) -> PortResult<bool> {
        let result = sqlx::query(
            "DELETE FROM meal_plan_slots s \
             USING meal_plans p \
             WHERE s.id = $1 AND s.meal_plan_id = $2 \
               AND p.id = s.meal_plan_id AND p.owner_id = $3",
        )
        .bind(slot_id)
        .bind(meal_plan_id)
        .bind(owner)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(result.rows_affected() > 0)
    }
}
