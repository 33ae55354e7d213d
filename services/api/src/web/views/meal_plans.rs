//! Meal plan pages: list, create/edit/delete, and the weekly grid with slot
//! assignment, notes and removal.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    Extension, Form,
};
use meal_builder_core::domain::{DayOfWeek, MealType};
use meal_builder_core::grid::GridCell;
use meal_builder_core::planner::{self, SlotRequest};
use meal_builder_core::ports::{FieldError, PortError};
use meal_builder_core::validation::{validate_meal_plan_name, DEFAULT_MEAL_PLAN_NAME, NOTES_MAX_CHARS};
use serde::Deserialize;
use tracing::{info, warn};

use super::{error_summary, escape_html, ok_page, options, page, parse_optional, PageResult};
use crate::web::state::{AppState, CurrentUser};

//=========================================================================================
// Form Models
//=========================================================================================

#[derive(Debug, Deserialize)]
pub struct MealPlanForm {
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct AssignSlotForm {
    #[serde(default)]
    pub day: String,
    #[serde(default)]
    pub meal_type: String,
    #[serde(default)]
    pub recipe_id: String,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct NotesForm {
    pub notes: Option<String>,
}

//=========================================================================================
// Rendering
//=========================================================================================

fn render_name_form(
    status: StatusCode,
    heading: &str,
    action: &str,
    name: &str,
    errors: &[FieldError],
) -> Response {
    let body = format!(
        "<h1>{heading}</h1>{errors}\
<form method=\"post\" action=\"{action}\">\
<p><label>Name <input name=\"name\" maxlength=\"120\" value=\"{name}\"></label></p>\
<p><button type=\"submit\">Save</button> <a href=\"/mealplans\">Cancel</a></p>\
</form>",
        heading = escape_html(heading),
        errors = error_summary(errors),
        action = escape_html(action),
        name = escape_html(name),
    );
    page(status, heading, &body)
}

fn render_cell(meal_plan_id: i64, cell: &GridCell) -> String {
    let label = cell.meal_type;
    let (Some(slot_id), Some(recipe_id), Some(title)) =
        (cell.slot_id, cell.recipe_id, cell.recipe_title.as_deref())
    else {
        return format!("<tr><td>{label}</td><td colspan=\"3\"><em>empty</em></td></tr>");
    };
    let calories = cell.calories.map(|c| format!("{c} kcal")).unwrap_or_default();
    format!(
        "<tr><td>{label}</td>\
<td><a href=\"/recipes/{recipe_id}/landing\">{title}</a> {calories}</td>\
<td><form method=\"post\" action=\"/mealplans/{meal_plan_id}/slots/{slot_id}/notes\">\
<input name=\"notes\" maxlength=\"{max}\" value=\"{notes}\"> <button type=\"submit\">Save notes</button></form></td>\
<td><form method=\"post\" action=\"/mealplans/{meal_plan_id}/slots/{slot_id}/remove\">\
<button type=\"submit\">Remove</button></form></td></tr>",
        title = escape_html(title),
        max = NOTES_MAX_CHARS,
        notes = escape_html(cell.notes.as_deref().unwrap_or_default()),
    )
}

/// The plan's weekly grid plus the assignment form. Answers 404 when the plan
/// is not the caller's.
async fn render_details(
    state: &AppState,
    user: CurrentUser,
    meal_plan_id: i64,
    form: Option<&AssignSlotForm>,
    errors: &[FieldError],
    status: StatusCode,
) -> PageResult {
    let grid = planner::load_grid(
        state.db.as_ref(),
        user.user_id,
        meal_plan_id,
        DayOfWeek::Sunday,
    )
    .await?;
    let recipes = state.db.list_recipes(user.user_id).await?;

    let mut days = String::new();
    for (day, row) in grid.rows() {
        let cells: String = row.iter().map(|c| render_cell(grid.meal_plan_id, c)).collect();
        days.push_str(&format!(
            "<h3>{day} <small>({} kcal)</small></h3><table>{cells}</table>",
            grid.day_calories(day)
        ));
    }

    let day_options = options(
        DayOfWeek::ALL
            .iter()
            .map(|d| (d.as_str().to_string(), d.to_string())),
        form.map(|f| f.day.as_str()),
    );
    let meal_type_options = options(
        MealType::ALL
            .iter()
            .map(|m| (m.as_str().to_string(), m.to_string())),
        form.map(|f| f.meal_type.as_str()),
    );
    let recipe_options = options(
        recipes.iter().map(|r| (r.id.to_string(), r.title.as_str())),
        form.map(|f| f.recipe_id.as_str()),
    );
    let notes = form.and_then(|f| f.notes.as_deref()).unwrap_or_default();

    let body = format!(
        "<h1>{name}</h1>\
<p>{filled} of {total} slots planned. \
<a href=\"/mealplans/{id}/edit\">Rename</a> | <a href=\"/mealplans/{id}/delete\">Delete</a> | \
<a href=\"/mealplans\">Back to list</a></p>\
{days}\
<h2>Assign a recipe</h2>{errors}\
<form method=\"post\" action=\"/mealplans/{id}/slots\">\
<p><label>Day <select name=\"day\">{day_options}</select></label> \
<label>Meal <select name=\"meal_type\">{meal_type_options}</select></label></p>\
<p><label>Recipe <select name=\"recipe_id\"><option value=\"\">Choose...</option>{recipe_options}</select></label></p>\
<p><label>Notes <input name=\"notes\" maxlength=\"{max}\" value=\"{notes}\"></label></p>\
<p><button type=\"submit\">Assign</button></p>\
</form>",
        name = escape_html(&grid.name),
        filled = grid.filled_count(),
        total = grid.cells.len(),
        id = grid.meal_plan_id,
        errors = error_summary(errors),
        max = NOTES_MAX_CHARS,
        notes = escape_html(notes),
    );
    Ok(page(status, &grid.name, &body))
}

//=========================================================================================
// Plan Handlers
//=========================================================================================

pub async fn index(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
) -> PageResult {
    let plans = state.db.list_meal_plans(user.user_id).await?;
    let rows: String = if plans.is_empty() {
        "<li>No meal plans yet.</li>".to_string()
    } else {
        plans
            .iter()
            .map(|p| {
                format!(
                    "<li><a href=\"/mealplans/{id}\">{name}</a> \
(<a href=\"/mealplans/{id}/edit\">Edit</a> | <a href=\"/mealplans/{id}/delete\">Delete</a>)</li>",
                    id = p.id,
                    name = escape_html(&p.name),
                )
            })
            .collect()
    };
    let body = format!(
        "<h1>Meal plans</h1><p><a href=\"/mealplans/new\">Create new</a></p><ul>{rows}</ul>"
    );
    ok_page("Meal plans", &body)
}

pub async fn new_form() -> Response {
    render_name_form(
        StatusCode::OK,
        "New meal plan",
        "/mealplans",
        DEFAULT_MEAL_PLAN_NAME,
        &[],
    )
}

pub async fn create(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Form(form): Form<MealPlanForm>,
) -> PageResult {
    let name = match validate_meal_plan_name(&form.name) {
        Ok(name) => name,
        Err(PortError::Validation(errors)) => {
            return Ok(render_name_form(
                StatusCode::BAD_REQUEST,
                "New meal plan",
                "/mealplans",
                &form.name,
                &errors,
            ))
        }
        Err(e) => return Err(e.into()),
    };
    let plan = state.db.create_meal_plan(user.user_id, &name).await?;
    info!("User {} created meal plan {}", user.user_id, plan.id);
    Ok(Redirect::to("/mealplans").into_response())
}

pub async fn details(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> PageResult {
    render_details(&state, user, id, None, &[], StatusCode::OK).await
}

pub async fn edit_form(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> PageResult {
    let plan = state.db.get_meal_plan(user.user_id, id).await?;
    Ok(render_name_form(
        StatusCode::OK,
        "Rename meal plan",
        &format!("/mealplans/{id}/edit"),
        &plan.name,
        &[],
    ))
}

pub async fn update(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
    Form(form): Form<MealPlanForm>,
) -> PageResult {
    state.db.get_meal_plan(user.user_id, id).await?;
    let name = match validate_meal_plan_name(&form.name) {
        Ok(name) => name,
        Err(PortError::Validation(errors)) => {
            return Ok(render_name_form(
                StatusCode::BAD_REQUEST,
                "Rename meal plan",
                &format!("/mealplans/{id}/edit"),
                &form.name,
                &errors,
            ))
        }
        Err(e) => return Err(e.into()),
    };
    state.db.update_meal_plan(user.user_id, id, &name).await?;
    Ok(Redirect::to("/mealplans").into_response())
}

pub async fn delete_confirm(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> PageResult {
    let plan = state.db.get_meal_plan(user.user_id, id).await?;
    let body = format!(
        "<h1>Delete meal plan</h1>\
<p>Are you sure you want to delete <strong>{name}</strong> and all of its slots?</p>\
<form method=\"post\" action=\"/mealplans/{id}/delete\">\
<button type=\"submit\">Delete</button> <a href=\"/mealplans\">Cancel</a></form>",
        name = escape_html(&plan.name),
    );
    ok_page("Delete meal plan", &body)
}

pub async fn delete(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> PageResult {
    if state.db.delete_meal_plan(user.user_id, id).await? {
        info!("User {} deleted meal plan {}", user.user_id, id);
    }
    Ok(Redirect::to("/mealplans").into_response())
}

//=========================================================================================
// Slot Handlers
//=========================================================================================

pub async fn assign_slot(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
    Form(form): Form<AssignSlotForm>,
) -> PageResult {
    let mut errors = Vec::new();
    let day = form.day.trim().parse::<DayOfWeek>().ok();
    if day.is_none() {
        errors.push(FieldError::new("day", "is required"));
    }
    let meal_type = form.meal_type.trim().parse::<MealType>().ok();
    if meal_type.is_none() {
        errors.push(FieldError::new("meal_type", "is required"));
    }
    let recipe_id = parse_optional::<i64>("recipe_id", &form.recipe_id, &mut errors);
    if recipe_id.is_none() && !errors.iter().any(|e| e.field == "recipe_id") {
        errors.push(FieldError::new("recipe_id", "is required"));
    }

    let (Some(day), Some(meal_type), Some(recipe_id)) = (day, meal_type, recipe_id) else {
        return render_details(&state, user, id, Some(&form), &errors, StatusCode::BAD_REQUEST)
            .await;
    };

    let request = SlotRequest {
        recipe_id,
        day,
        meal_type,
        notes: form.notes.clone(),
    };
    match planner::upsert_slot(state.db.as_ref(), user.user_id, id, request).await {
        Ok(_) => Ok(Redirect::to(&format!("/mealplans/{id}")).into_response()),
        Err(PortError::NotFound(_)) => {
            let errors = [FieldError::new("", "Meal plan or recipe not found.")];
            render_details(&state, user, id, Some(&form), &errors, StatusCode::BAD_REQUEST).await
        }
        Err(PortError::Conflict(detail)) => {
            warn!("Slot assignment conflict on plan {}: {}", id, detail);
            let errors = [FieldError::new(
                "",
                "This slot was changed at the same time. Please try again.",
            )];
            render_details(&state, user, id, Some(&form), &errors, StatusCode::CONFLICT).await
        }
        Err(e) => Err(e.into()),
    }
}

pub async fn update_notes(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Path((id, slot_id)): Path<(i64, i64)>,
    Form(form): Form<NotesForm>,
) -> PageResult {
    let result = planner::patch_slot_notes(
        state.db.as_ref(),
        user.user_id,
        id,
        slot_id,
        form.notes.as_deref(),
    )
    .await;
    match result {
        Ok(()) => Ok(Redirect::to(&format!("/mealplans/{id}")).into_response()),
        Err(PortError::NotFound(_)) => {
            let errors = [FieldError::new("", "Slot not found.")];
            render_details(&state, user, id, None, &errors, StatusCode::BAD_REQUEST).await
        }
        Err(e) => Err(e.into()),
    }
}

/// Removing a slot that is already empty still lands on the plan.
pub async fn remove_slot(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Path((id, slot_id)): Path<(i64, i64)>,
) -> PageResult {
    planner::remove_slot(state.db.as_ref(), user.user_id, id, slot_id).await?;
    Ok(Redirect::to(&format!("/mealplans/{id}")).into_response())
}
