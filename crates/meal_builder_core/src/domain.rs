//! crates/meal_builder_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any database or transport format.

use chrono::{DateTime, Utc};
use derive_more::Display;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum::{EnumIter, EnumString, IntoStaticStr, VariantArray};

//=========================================================================================
// Enumerations
//=========================================================================================

// The stored and wire form is the snake_case name (`IntoStaticStr`, parsed
// back case-insensitively by `EnumString`); `Display` is the label shown to
// people.

/// A calendar day. Declaration order is the calendar order, Sunday first.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
    Display, EnumIter, EnumString, IntoStaticStr, VariantArray,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum DayOfWeek {
    Sunday,
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
}

impl DayOfWeek {
    /// Every day, in calendar order.
    pub const ALL: &'static [Self] = <Self as VariantArray>::VARIANTS;

    pub fn as_str(self) -> &'static str {
        self.into()
    }

    /// The seven days in calendar order, rotated so that `start` comes first.
    pub fn week_starting(start: DayOfWeek) -> [DayOfWeek; 7] {
        let offset = start as usize;
        std::array::from_fn(|i| Self::ALL[(offset + i) % 7])
    }
}

/// The meal a slot is planned for.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
    Display, EnumIter, EnumString, IntoStaticStr, VariantArray,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum MealType {
    Breakfast,
    Lunch,
    Dinner,
    Snack,
    Dessert,
}

impl MealType {
    pub const ALL: &'static [Self] = <Self as VariantArray>::VARIANTS;

    pub fn as_str(self) -> &'static str {
        self.into()
    }
}

/// The category a recipe is filed under.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize,
    Display, EnumIter, EnumString, IntoStaticStr, VariantArray,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum MealCategory {
    Breakfast,
    Lunch,
    Dinner,
    Snack,
    Dessert,
}

impl MealCategory {
    pub const ALL: &'static [Self] = <Self as VariantArray>::VARIANTS;

    pub fn as_str(self) -> &'static str {
        self.into()
    }
}

/// Unit of measure for an ingredient quantity.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize,
    Display, EnumIter, EnumString, IntoStaticStr, VariantArray,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum Unit {
    #[default]
    #[display("g")]
    Gram,
    #[display("ml")]
    Milliliter,
    #[display("pcs")]
    Piece,
}

impl Unit {
    pub const ALL: &'static [Self] = <Self as VariantArray>::VARIANTS;

    pub fn as_str(self) -> &'static str {
        self.into()
    }
}

//=========================================================================================
// Users and Authentication
//=========================================================================================

/// An application user, anchored to an external identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: i64,
    pub provider: String,
    pub provider_user_id: String,
    pub email: String,
    pub name: Option<String>,
}

/// The identity asserted by the external provider after a successful login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalIdentity {
    pub provider: String,
    pub subject: String,
    pub email: String,
    pub name: Option<String>,
}

// Represents a browser login session (auth cookie)
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub id: String,
    pub user_id: i64,
    pub expires_at: DateTime<Utc>,
}

//=========================================================================================
// Catalog
//=========================================================================================

/// A shared catalog ingredient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Ingredient {
    pub id: i64,
    pub name: String,
}

/// A recipe owned by exactly one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Recipe {
    pub id: i64,
    pub owner_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub category: MealCategory,
    pub calories: Option<i32>,
    pub image_url: Option<String>,
}

/// The writable fields of a recipe, already validated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecipeDraft {
    pub title: String,
    pub description: Option<String>,
    pub category: MealCategory,
    pub calories: Option<i32>,
    pub image_url: Option<String>,
}

/// The link between a recipe and an ingredient, keyed by both ids.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecipeIngredient {
    pub recipe_id: i64,
    pub ingredient_id: i64,
    pub quantity: Decimal,
    pub unit: Unit,
}

/// A recipe ingredient joined with the ingredient's name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecipeIngredientLine {
    pub recipe_id: i64,
    pub ingredient_id: i64,
    pub ingredient_name: String,
    pub quantity: Decimal,
    pub unit: Unit,
}

//=========================================================================================
// Meal Plans
//=========================================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MealPlan {
    pub id: i64,
    pub owner_id: i64,
    pub name: String,
}

/// A filled (day, meal type) cell of a meal plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Slot {
    pub id: i64,
    pub meal_plan_id: i64,
    pub recipe_id: i64,
    pub day: DayOfWeek,
    pub meal_type: MealType,
    pub notes: Option<String>,
}

/// A slot joined with the recipe it points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedMeal {
    pub slot: Slot,
    pub recipe_title: String,
    pub calories: Option<i32>,
}

/// Input to a slot write. Notes are expected to be normalized already.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotAssignment {
    pub meal_plan_id: i64,
    pub recipe_id: i64,
    pub day: DayOfWeek,
    pub meal_type: MealType,
    pub notes: Option<String>,
}

//=========================================================================================
// Chat
//=========================================================================================

/// A text message received by the chat bot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncomingMessage {
    pub update_id: i64,
    pub chat_id: i64,
    pub text: Option<String>,
}
