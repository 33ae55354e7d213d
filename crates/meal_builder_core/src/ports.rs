//! crates/meal_builder_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of specific external implementations like databases or APIs.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::{
    ExternalIdentity, Ingredient, IncomingMessage, MealPlan, PlannedMeal, Recipe, RecipeDraft,
    RecipeIngredient, RecipeIngredientLine, SlotAssignment, User,
};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A single rejected input field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, network).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    /// The entity is absent, or it belongs to another user.
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Validation failed for {} field(s)", .0.len())]
    Validation(Vec<FieldError>),
    #[error("Unauthorized")]
    Unauthorized,
    /// A uniqueness constraint rejected a concurrent write.
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

/// Persistence for every entity. Methods taking an `owner` only see rows that
/// belong to that user; rows owned by someone else are reported as `NotFound`.
#[async_trait]
pub trait DatabaseService: Send + Sync {
    // --- Users and Auth Sessions ---
    /// Resolves an external identity to a user, creating the user on first login.
    async fn get_or_create_user(&self, identity: &ExternalIdentity) -> PortResult<User>;

    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: i64,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()>;

    /// Returns the user id for a live session, `Unauthorized` when absent or expired.
    async fn validate_auth_session(&self, session_id: &str) -> PortResult<i64>;

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()>;

    // --- Ingredients (shared catalog) ---
    async fn list_ingredients(&self) -> PortResult<Vec<Ingredient>>;

    async fn get_ingredient(&self, id: i64) -> PortResult<Ingredient>;

    async fn create_ingredient(&self, name: &str) -> PortResult<Ingredient>;

    async fn update_ingredient(&self, id: i64, name: &str) -> PortResult<()>;

    /// Returns `false` when there was nothing to delete.
    async fn delete_ingredient(&self, id: i64) -> PortResult<bool>;

    // --- Recipes ---
    async fn list_recipes(&self, owner: i64) -> PortResult<Vec<Recipe>>;

    async fn get_recipe(&self, owner: i64, id: i64) -> PortResult<Recipe>;

    async fn create_recipe(&self, owner: i64, draft: &RecipeDraft) -> PortResult<Recipe>;

    async fn update_recipe(&self, owner: i64, id: i64, draft: &RecipeDraft) -> PortResult<()>;

    async fn delete_recipe(&self, owner: i64, id: i64) -> PortResult<bool>;

    /// Number of meal plan slots that reference the recipe.
    async fn count_recipe_usages(&self, recipe_id: i64) -> PortResult<i64>;

    // --- Recipe Ingredients ---
    /// Lines ordered by ingredient name.
    async fn list_recipe_ingredients(&self, recipe_id: i64)
        -> PortResult<Vec<RecipeIngredientLine>>;

    async fn upsert_recipe_ingredient(&self, link: &RecipeIngredient) -> PortResult<()>;

    async fn delete_recipe_ingredient(&self, recipe_id: i64, ingredient_id: i64)
        -> PortResult<bool>;

    // --- Meal Plans ---
    async fn list_meal_plans(&self, owner: i64) -> PortResult<Vec<MealPlan>>;

    async fn get_meal_plan(&self, owner: i64, id: i64) -> PortResult<MealPlan>;

    /// Unscoped lookup, used where no user identity exists (the chat bot).
    async fn find_meal_plan(&self, id: i64) -> PortResult<Option<MealPlan>>;

    async fn create_meal_plan(&self, owner: i64, name: &str) -> PortResult<MealPlan>;

    async fn update_meal_plan(&self, owner: i64, id: i64, name: &str) -> PortResult<()>;

    async fn delete_meal_plan(&self, owner: i64, id: i64) -> PortResult<bool>;

    // --- Slots ---
    /// All filled slots of a plan, joined with their recipes.
    async fn list_planned_meals(&self, meal_plan_id: i64) -> PortResult<Vec<PlannedMeal>>;

    /// Creates or overwrites the slot at (plan, day, meal type) and returns its id.
    /// A unique violation from a concurrent writer is reported as `Conflict`.
    async fn upsert_slot(&self, assignment: &SlotAssignment) -> PortResult<i64>;

    /// Returns `false` when no slot with that id exists in an owned plan.
    async fn update_slot_notes(
        &self,
        owner: i64,
        meal_plan_id: i64,
        slot_id: i64,
        notes: Option<&str>,
    ) -> PortResult<bool>;

    async fn delete_slot(&self, owner: i64, meal_plan_id: i64, slot_id: i64) -> PortResult<bool>;
}

#[async_trait]
pub trait ImageStorageService: Send + Sync {
    /// Uploads an image and returns the public URL it is served from.
    async fn upload(
        &self,
        file_name: &str,
        content_type: Option<&str>,
        data: Vec<u8>,
    ) -> PortResult<String>;
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// The provider page the browser is sent to, carrying the anti-forgery `state`.
    fn authorize_url(&self, state: &str) -> String;

    /// Exchanges an authorization code for the user's identity.
    async fn exchange_code(&self, code: &str) -> PortResult<ExternalIdentity>;
}

#[async_trait]
pub trait ChatBotService: Send + Sync {
    /// Long-polls for messages with an update id of at least `offset`.
    async fn poll_messages(&self, offset: i64, timeout_secs: u64)
        -> PortResult<Vec<IncomingMessage>>;

    async fn send_message(&self, chat_id: i64, text: &str, markdown: bool) -> PortResult<()>;
}
