//! An in-memory `DatabaseService` with the same ownership, cascade and
//! uniqueness behavior as the PostgreSQL adapter.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use meal_builder_core::domain::{
    ExternalIdentity, Ingredient, MealPlan, PlannedMeal, Recipe, RecipeDraft, RecipeIngredient,
    RecipeIngredientLine, Slot, SlotAssignment, User,
};
use meal_builder_core::ports::{DatabaseService, PortError, PortResult};

#[derive(Default)]
struct State {
    next_id: i64,
    users: Vec<User>,
    sessions: BTreeMap<String, (i64, DateTime<Utc>)>,
    ingredients: Vec<Ingredient>,
    recipes: Vec<Recipe>,
    links: Vec<RecipeIngredient>,
    plans: Vec<MealPlan>,
    slots: Vec<Slot>,
    conflict_next_slot_write: bool,
}

impl State {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn owned_plan(&self, owner: i64, id: i64) -> Option<&MealPlan> {
        self.plans.iter().find(|p| p.id == id && p.owner_id == owner)
    }
}

#[derive(Default)]
pub struct InMemoryDb {
    state: Mutex<State>,
}

impl InMemoryDb {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Makes the next `upsert_slot` fail the way a lost concurrent insert does.
    pub fn fail_next_slot_write_with_conflict(&self) {
        self.state().conflict_next_slot_write = true;
    }

    /// Every stored slot, for assertions on the uniqueness invariant.
    pub fn slots(&self) -> Vec<Slot> {
        self.state().slots.clone()
    }

    pub fn recipe_links(&self) -> Vec<RecipeIngredient> {
        self.state().links.clone()
    }

    /// Creates a user and a live session for it; returns `(user_id, session_id)`.
    pub fn seed_user_with_session(&self, subject: &str) -> (i64, String) {
        let mut state = self.state();
        let id = state.next_id();
        state.users.push(User {
            id,
            provider: "google".into(),
            provider_user_id: subject.into(),
            email: format!("{subject}@example.com"),
            name: None,
        });
        let session_id = format!("session-{subject}");
        state
            .sessions
            .insert(session_id.clone(), (id, Utc::now() + chrono::Duration::days(1)));
        (id, session_id)
    }
}

#[async_trait]
impl DatabaseService for InMemoryDb {
    async fn get_or_create_user(&self, identity: &ExternalIdentity) -> PortResult<User> {
        let mut state = self.state();
        if let Some(user) = state.users.iter_mut().find(|u| {
            u.provider == identity.provider && u.provider_user_id == identity.subject
        }) {
            user.email = identity.email.clone();
            user.name = identity.name.clone();
            return Ok(user.clone());
        }
        let id = state.next_id();
        let user = User {
            id,
            provider: identity.provider.clone(),
            provider_user_id: identity.subject.clone(),
            email: identity.email.clone(),
            name: identity.name.clone(),
        };
        state.users.push(user.clone());
        Ok(user)
    }

    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: i64,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()> {
        self.state()
            .sessions
            .insert(session_id.to_owned(), (user_id, expires_at));
        Ok(())
    }

    async fn validate_auth_session(&self, session_id: &str) -> PortResult<i64> {
        match self.state().sessions.get(session_id) {
            Some((user_id, expires_at)) if *expires_at > Utc::now() => Ok(*user_id),
            _ => Err(PortError::Unauthorized),
        }
    }

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()> {
        self.state().sessions.remove(session_id);
        Ok(())
    }

    async fn list_ingredients(&self) -> PortResult<Vec<Ingredient>> {
        let mut items = self.state().ingredients.clone();
        items.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(items)
    }

    async fn get_ingredient(&self, id: i64) -> PortResult<Ingredient> {
        self.state()
            .ingredients
            .iter()
            .find(|i| i.id == id)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("Ingredient {id} not found")))
    }

    async fn create_ingredient(&self, name: &str) -> PortResult<Ingredient> {
        let mut state = self.state();
        let ingredient = Ingredient {
            id: state.next_id(),
            name: name.to_owned(),
        };
        state.ingredients.push(ingredient.clone());
        Ok(ingredient)
    }

    async fn update_ingredient(&self, id: i64, name: &str) -> PortResult<()> {
        let mut state = self.state();
        let ingredient = state
            .ingredients
            .iter_mut()
            .find(|i| i.id == id)
            .ok_or_else(|| PortError::NotFound(format!("Ingredient {id} not found")))?;
        ingredient.name = name.to_owned();
        Ok(())
    }

    async fn delete_ingredient(&self, id: i64) -> PortResult<bool> {
        let mut state = self.state();
        let before = state.ingredients.len();
        state.ingredients.retain(|i| i.id != id);
        state.links.retain(|l| l.ingredient_id != id);
        Ok(state.ingredients.len() != before)
    }

    async fn list_recipes(&self, owner: i64) -> PortResult<Vec<Recipe>> {
        Ok(self
            .state()
            .recipes
            .iter()
            .filter(|r| r.owner_id == owner)
            .cloned()
            .collect())
    }

    async fn get_recipe(&self, owner: i64, id: i64) -> PortResult<Recipe> {
        self.state()
            .recipes
            .iter()
            .find(|r| r.id == id && r.owner_id == owner)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("Recipe {id} not found")))
    }

    async fn create_recipe(&self, owner: i64, draft: &RecipeDraft) -> PortResult<Recipe> {
        let mut state = self.state();
        let recipe = Recipe {
            id: state.next_id(),
            owner_id: owner,
            title: draft.title.clone(),
            description: draft.description.clone(),
            category: draft.category,
            calories: draft.calories,
            image_url: draft.image_url.clone(),
        };
        state.recipes.push(recipe.clone());
        Ok(recipe)
    }

    async fn update_recipe(&self, owner: i64, id: i64, draft: &RecipeDraft) -> PortResult<()> {
        let mut state = self.state();
        let recipe = state
            .recipes
            .iter_mut()
            .find(|r| r.id == id && r.owner_id == owner)
            .ok_or_else(|| PortError::NotFound(format!("Recipe {id} not found")))?;
        recipe.title = draft.title.clone();
        recipe.description = draft.description.clone();
        recipe.category = draft.category;
        recipe.calories = draft.calories;
        recipe.image_url = draft.image_url.clone();
        Ok(())
    }

    async fn delete_recipe(&self, owner: i64, id: i64) -> PortResult<bool> {
        let mut state = self.state();
        let before = state.recipes.len();
        state.recipes.retain(|r| !(r.id == id && r.owner_id == owner));
        let removed = state.recipes.len() != before;
        if removed {
            state.links.retain(|l| l.recipe_id != id);
            state.slots.retain(|s| s.recipe_id != id);
        }
        Ok(removed)
    }

    async fn count_recipe_usages(&self, recipe_id: i64) -> PortResult<i64> {
        let count = self
            .state()
            .slots
            .iter()
            .filter(|s| s.recipe_id == recipe_id)
            .count();
        Ok(count as i64)
    }

    async fn list_recipe_ingredients(
        &self,
        recipe_id: i64,
    ) -> PortResult<Vec<RecipeIngredientLine>> {
        let state = self.state();
        let mut lines: Vec<_> = state
            .links
            .iter()
            .filter(|l| l.recipe_id == recipe_id)
            .filter_map(|l| {
                let ingredient = state.ingredients.iter().find(|i| i.id == l.ingredient_id)?;
                Some(RecipeIngredientLine {
                    recipe_id: l.recipe_id,
                    ingredient_id: l.ingredient_id,
                    ingredient_name: ingredient.name.clone(),
                    quantity: l.quantity,
                    unit: l.unit,
                })
            })
            .collect();
        lines.sort_by(|a, b| a.ingredient_name.cmp(&b.ingredient_name));
        Ok(lines)
    }

    async fn upsert_recipe_ingredient(&self, link: &RecipeIngredient) -> PortResult<()> {
        let mut state = self.state();
        match state
            .links
            .iter_mut()
            .find(|l| l.recipe_id == link.recipe_id && l.ingredient_id == link.ingredient_id)
        {
            Some(existing) => {
                existing.quantity = link.quantity;
                existing.unit = link.unit;
            }
            None => state.links.push(link.clone()),
        }
        Ok(())
    }

    async fn delete_recipe_ingredient(
        &self,
        recipe_id: i64,
        ingredient_id: i64,
    ) -> PortResult<bool> {
        let mut state = self.state();
        let before = state.links.len();
        state
            .links
            .retain(|l| !(l.recipe_id == recipe_id && l.ingredient_id == ingredient_id));
        Ok(state.links.len() != before)
    }

    async fn list_meal_plans(&self, owner: i64) -> PortResult<Vec<MealPlan>> {
        Ok(self
            .state()
            .plans
            .iter()
            .filter(|p| p.owner_id == owner)
            .cloned()
            .collect())
    }

    async fn get_meal_plan(&self, owner: i64, id: i64) -> PortResult<MealPlan> {
        self.state()
            .owned_plan(owner, id)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("Meal plan {id} not found")))
    }

    async fn find_meal_plan(&self, id: i64) -> PortResult<Option<MealPlan>> {
        Ok(self.state().plans.iter().find(|p| p.id == id).cloned())
    }

    async fn create_meal_plan(&self, owner: i64, name: &str) -> PortResult<MealPlan> {
        let mut state = self.state();
        let plan = MealPlan {
            id: state.next_id(),
            owner_id: owner,
            name: name.to_owned(),
        };
        state.plans.push(plan.clone());
        Ok(plan)
    }

    async fn update_meal_plan(&self, owner: i64, id: i64, name: &str) -> PortResult<()> {
        let mut state = self.state();
        let plan = state
            .plans
            .iter_mut()
            .find(|p| p.id == id && p.owner_id == owner)
            .ok_or_else(|| PortError::NotFound(format!("Meal plan {id} not found")))?;
        plan.name = name.to_owned();
        Ok(())
    }

    async fn delete_meal_plan(&self, owner: i64, id: i64) -> PortResult<bool> {
        let mut state = self.state();
        let before = state.plans.len();
        state.plans.retain(|p| !(p.id == id && p.owner_id == owner));
        let removed = state.plans.len() != before;
        if removed {
            state.slots.retain(|s| s.meal_plan_id != id);
        }
        Ok(removed)
    }

    async fn list_planned_meals(&self, meal_plan_id: i64) -> PortResult<Vec<PlannedMeal>> {
        let state = self.state();
        Ok(state
            .slots
            .iter()
            .filter(|s| s.meal_plan_id == meal_plan_id)
            .filter_map(|s| {
                let recipe = state.recipes.iter().find(|r| r.id == s.recipe_id)?;
                Some(PlannedMeal {
                    slot: s.clone(),
                    recipe_title: recipe.title.clone(),
                    calories: recipe.calories,
                })
            })
            .collect())
    }

    async fn upsert_slot(&self, assignment: &SlotAssignment) -> PortResult<i64> {
        let mut state = self.state();
        if std::mem::take(&mut state.conflict_next_slot_write) {
            return Err(PortError::Conflict(format!(
                "Slot {} {} of meal plan {} was written concurrently",
                assignment.day, assignment.meal_type, assignment.meal_plan_id
            )));
        }
        if let Some(slot) = state.slots.iter_mut().find(|s| {
            s.meal_plan_id == assignment.meal_plan_id
                && s.day == assignment.day
                && s.meal_type == assignment.meal_type
        }) {
            slot.recipe_id = assignment.recipe_id;
            slot.notes = assignment.notes.clone();
            return Ok(slot.id);
        }
        let id = state.next_id();
        state.slots.push(Slot {
            id,
            meal_plan_id: assignment.meal_plan_id,
            recipe_id: assignment.recipe_id,
            day: assignment.day,
            meal_type: assignment.meal_type,
            notes: assignment.notes.clone(),
        });
        Ok(id)
    }

    async fn update_slot_notes(
        &self,
        owner: i64,
        meal_plan_id: i64,
        slot_id: i64,
        notes: Option<&str>,
    ) -> PortResult<bool> {
        let mut state = self.state();
        if state.owned_plan(owner, meal_plan_id).is_none() {
            return Ok(false);
        }
        match state
            .slots
            .iter_mut()
            .find(|s| s.id == slot_id && s.meal_plan_id == meal_plan_id)
        {
            Some(slot) => {
                slot.notes = notes.map(str::to_owned);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_slot(&self, owner: i64, meal_plan_id: i64, slot_id: i64) -> PortResult<bool> {
        let mut state = self.state();
        if state.owned_plan(owner, meal_plan_id).is_none() {
            return Ok(false);
        }
        let before = state.slots.len();
        state
            .slots
            .retain(|s| !(s.id == slot_id && s.meal_plan_id == meal_plan_id));
        Ok(state.slots.len() != before)
    }
}
