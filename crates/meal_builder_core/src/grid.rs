//! The weekly grid: every (day, meal type) combination of a meal plan,
//! with empty cells materialized so views never have to look for gaps.

use serde::Serialize;

use crate::domain::{DayOfWeek, MealPlan, MealType, PlannedMeal};

/// One cell of the grid. All slot fields are `None` for an empty cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GridCell {
    pub day: DayOfWeek,
    pub meal_type: MealType,
    pub slot_id: Option<i64>,
    pub recipe_id: Option<i64>,
    pub recipe_title: Option<String>,
    pub notes: Option<String>,
    pub calories: Option<i32>,
}

impl GridCell {
    fn empty(day: DayOfWeek, meal_type: MealType) -> Self {
        Self {
            day,
            meal_type,
            slot_id: None,
            recipe_id: None,
            recipe_title: None,
            notes: None,
            calories: None,
        }
    }

    pub fn is_filled(&self) -> bool {
        self.slot_id.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WeeklyGrid {
    pub meal_plan_id: i64,
    pub name: String,
    /// Day-major: `days.len() * MealType::ALL.len()` cells.
    pub cells: Vec<GridCell>,
}

impl WeeklyGrid {
    /// Builds the full grid, days starting at `week_start`, meal types in
    /// declaration order. Meals for other plans are ignored.
    pub fn project(plan: &MealPlan, meals: &[PlannedMeal], week_start: DayOfWeek) -> Self {
        let days = DayOfWeek::week_starting(week_start);
        let mut cells = Vec::with_capacity(days.len() * MealType::ALL.len());

        for day in days {
            for &meal_type in MealType::ALL {
                let existing = meals.iter().find(|m| {
                    m.slot.meal_plan_id == plan.id
                        && m.slot.day == day
                        && m.slot.meal_type == meal_type
                });

                let cell = match existing {
                    Some(meal) => GridCell {
                        day,
                        meal_type,
                        slot_id: Some(meal.slot.id),
                        recipe_id: Some(meal.slot.recipe_id),
                        recipe_title: Some(meal.recipe_title.clone()),
                        notes: meal.slot.notes.clone(),
                        calories: meal.calories,
                    },
                    None => GridCell::empty(day, meal_type),
                };
                cells.push(cell);
            }
        }

        Self {
            meal_plan_id: plan.id,
            name: plan.name.clone(),
            cells,
        }
    }

    /// The cells grouped per day, in grid order.
    pub fn rows(&self) -> impl Iterator<Item = (DayOfWeek, &[GridCell])> {
        self.cells
            .chunks(MealType::ALL.len())
            .filter_map(|row| row.first().map(|c| (c.day, row)))
    }

    pub fn cell(&self, day: DayOfWeek, meal_type: MealType) -> Option<&GridCell> {
        self.cells
            .iter()
            .find(|c| c.day == day && c.meal_type == meal_type)
    }

    pub fn filled_count(&self) -> usize {
        self.cells.iter().filter(|c| c.is_filled()).count()
    }

    /// Sum of the calories of the recipes planned on `day`.
    pub fn day_calories(&self, day: DayOfWeek) -> i64 {
        self.cells
            .iter()
            .filter(|c| c.day == day)
            .filter_map(|c| c.calories)
            .map(i64::from)
            .sum()
    }
}
