//! Input rules shared by the JSON API and the HTML forms.
//!
//! Every validator collects all field errors before failing, so a form can show
//! them together.

use rust_decimal::{Decimal, RoundingStrategy};

use crate::domain::{MealCategory, RecipeDraft};
use crate::ports::{FieldError, PortError, PortResult};

pub const NAME_MAX_CHARS: usize = 120;
pub const DESCRIPTION_MAX_CHARS: usize = 2000;
pub const NOTES_MAX_CHARS: usize = 300;
pub const CALORIES_MAX: i32 = 100_000;
pub const QUANTITY_MAX: Decimal = Decimal::from_parts(100_000, 0, 0, false, 0);
pub const DEFAULT_MEAL_PLAN_NAME: &str = "My meal plan for this week";

/// Unvalidated recipe fields as they arrive from a request.
#[derive(Debug, Clone, Default)]
pub struct RecipeInput {
    pub title: String,
    pub description: Option<String>,
    pub category: Option<MealCategory>,
    pub calories: Option<i32>,
    pub image_url: Option<String>,
}

/// Normalizes slot notes: blank becomes absent, long notes are cut to 300 characters.
pub fn normalize_notes(notes: Option<&str>) -> Option<String> {
    let notes = notes?;
    if notes.trim().is_empty() {
        return None;
    }
    Some(notes.chars().take(NOTES_MAX_CHARS).collect())
}

pub fn validate_ingredient_name(name: &str) -> PortResult<String> {
    let mut errors = Vec::new();
    let name = required_text("name", name, NAME_MAX_CHARS, &mut errors);
    finish(errors).map(|()| name)
}

pub fn validate_meal_plan_name(name: &str) -> PortResult<String> {
    let mut errors = Vec::new();
    let name = required_text("name", name, NAME_MAX_CHARS, &mut errors);
    finish(errors).map(|()| name)
}

pub fn validate_recipe(input: RecipeInput) -> PortResult<RecipeDraft> {
    let mut errors = Vec::new();

    let title = required_text("title", &input.title, NAME_MAX_CHARS, &mut errors);

    let description = blank_to_none(input.description);
    if let Some(d) = &description {
        if d.chars().count() > DESCRIPTION_MAX_CHARS {
            errors.push(FieldError::new(
                "description",
                format!("must be at most {DESCRIPTION_MAX_CHARS} characters"),
            ));
        }
    }

    if input.category.is_none() {
        errors.push(FieldError::new("category", "is required"));
    }

    if let Some(c) = input.calories {
        if !(0..=CALORIES_MAX).contains(&c) {
            errors.push(FieldError::new(
                "calories",
                format!("must be between 0 and {CALORIES_MAX}"),
            ));
        }
    }

    let image_url = blank_to_none(input.image_url).map(|u| u.trim().to_owned());
    if let Some(u) = &image_url {
        if !is_absolute_http_url(u) {
            errors.push(FieldError::new("image_url", "must be an absolute http(s) URL"));
        }
    }

    finish(errors)?;
    let category = input
        .category
        .ok_or_else(|| PortError::Validation(vec![FieldError::new("category", "is required")]))?;
    Ok(RecipeDraft {
        title,
        description,
        category,
        calories: input.calories,
        image_url,
    })
}

/// Checks the range and rounds to the two decimal places the store keeps.
pub fn validate_quantity(quantity: Decimal) -> PortResult<Decimal> {
    if quantity < Decimal::ZERO || quantity > QUANTITY_MAX {
        return Err(PortError::Validation(vec![FieldError::new(
            "quantity",
            format!("must be between 0 and {QUANTITY_MAX}"),
        )]));
    }
    Ok(quantity.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero))
}

fn required_text(field: &str, value: &str, max: usize, errors: &mut Vec<FieldError>) -> String {
    let value = value.trim();
    if value.is_empty() {
        errors.push(FieldError::new(field, "is required"));
    } else if value.chars().count() > max {
        errors.push(FieldError::new(
            field,
            format!("must be at most {max} characters"),
        ));
    }
    value.to_owned()
}

fn blank_to_none(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn is_absolute_http_url(url: &str) -> bool {
    let rest = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"));
    match rest {
        Some(rest) => {
            let host = rest.split(['/', '?', '#']).next().unwrap_or_default();
            !host.is_empty() && !url.chars().any(char::is_whitespace)
        }
        None => false,
    }
}

fn finish(errors: Vec<FieldError>) -> PortResult<()> {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(PortError::Validation(errors))
    }
}
