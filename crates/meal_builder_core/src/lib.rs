pub mod chat;
pub mod domain;
pub mod grid;
pub mod planner;
pub mod ports;
pub mod validation;

pub use domain::{
    AuthSession, DayOfWeek, ExternalIdentity, Ingredient, IncomingMessage, MealCategory, MealPlan,
    MealType, PlannedMeal, Recipe, RecipeDraft, RecipeIngredient, RecipeIngredientLine, Slot,
    SlotAssignment, Unit, User,
};
pub use grid::{GridCell, WeeklyGrid};
pub use ports::{
    ChatBotService, DatabaseService, FieldError, IdentityProvider, ImageStorageService, PortError,
    PortResult,
};
