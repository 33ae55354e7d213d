//! Recipe pages: list, details, landing card, create/edit with image upload,
//! delete confirmation and ingredient management.

use std::sync::Arc;

use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    Extension, Form,
};
use bytes::Bytes;
use meal_builder_core::domain::{MealCategory, Recipe, RecipeDraft, Unit};
use meal_builder_core::planner;
use meal_builder_core::ports::{FieldError, PortError};
use meal_builder_core::validation::{validate_recipe, RecipeInput};
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::info;

use super::{
    collect_validation, error_summary, escape_html, ok_page, options, page, parse_optional,
    PageError, PageResult,
};
use crate::error::ApiError;
use crate::web::state::{AppState, CurrentUser};

//=========================================================================================
// Form Models
//=========================================================================================

/// Raw recipe form values, kept as typed so a failed submit can be redisplayed.
#[derive(Debug, Default)]
struct RecipeForm {
    title: String,
    description: String,
    category: String,
    calories: String,
    image_url: String,
}

impl RecipeForm {
    fn from_recipe(recipe: &Recipe) -> Self {
        Self {
            title: recipe.title.clone(),
            description: recipe.description.clone().unwrap_or_default(),
            category: recipe.category.as_str().to_string(),
            calories: recipe.calories.map(|c| c.to_string()).unwrap_or_default(),
            image_url: recipe.image_url.clone().unwrap_or_default(),
        }
    }
}

struct ImageUpload {
    file_name: String,
    content_type: Option<String>,
    data: Bytes,
}

#[derive(Debug, Deserialize)]
pub struct IngredientLineForm {
    pub ingredient_id: String,
    pub quantity: String,
    #[serde(default)]
    pub unit: String,
}

fn unreadable(e: impl std::fmt::Display) -> PageError {
    ApiError::BadRequest(format!("Failed to read form data: {e}")).into()
}

async fn read_recipe_form(
    mut multipart: Multipart,
) -> Result<(RecipeForm, Option<ImageUpload>), PageError> {
    let mut form = RecipeForm::default();
    let mut image = None;

    while let Some(field) = multipart.next_field().await.map_err(unreadable)? {
        let name = field.name().unwrap_or_default().to_string();
        if name == "image_file" {
            let file_name = field.file_name().unwrap_or("image").to_string();
            let content_type = field.content_type().map(str::to_string);
            let data = field.bytes().await.map_err(unreadable)?;
            // Browsers send an empty part when no file was picked.
            if !data.is_empty() {
                image = Some(ImageUpload {
                    file_name,
                    content_type,
                    data,
                });
            }
            continue;
        }

        let value = field.text().await.map_err(unreadable)?;
        match name.as_str() {
            "title" => form.title = value,
            "description" => form.description = value,
            "category" => form.category = value,
            "calories" => form.calories = value,
            "image_url" => form.image_url = value,
            _ => {}
        }
    }
    Ok((form, image))
}

/// Validates the form and, when that passes, uploads the image. Returns the
/// field errors instead of a draft when the form has to be shown again.
async fn prepare_draft(
    state: &AppState,
    form: &RecipeForm,
    image: Option<ImageUpload>,
) -> Result<Result<RecipeDraft, Vec<FieldError>>, PageError> {
    let mut errors = Vec::new();
    let category = match form.category.trim() {
        "" => None,
        c => match c.parse::<MealCategory>() {
            Ok(c) => Some(c),
            Err(_) => {
                errors.push(FieldError::new("category", "is not a valid category"));
                None
            }
        },
    };
    let calories = parse_optional::<i32>("calories", &form.calories, &mut errors);

    let input = RecipeInput {
        title: form.title.clone(),
        description: Some(form.description.clone()),
        category,
        calories,
        image_url: Some(form.image_url.clone()),
    };
    let draft = collect_validation(validate_recipe(input), &mut errors)?;
    if image.is_some() && state.image_storage.is_none() {
        errors.push(FieldError::new("image_file", "image uploads are not configured"));
    }

    let mut draft = match draft {
        Some(d) if errors.is_empty() => d,
        _ => {
            // An unparsable category is already reported; drop the "is required" echo.
            if category.is_none() && !form.category.trim().is_empty() {
                errors.retain(|e| !(e.field == "category" && e.message == "is required"));
            }
            return Ok(Err(errors));
        }
    };

    if let (Some(image), Some(storage)) = (image, state.image_storage.as_ref()) {
        let url = storage
            .upload(&image.file_name, image.content_type.as_deref(), image.data.to_vec())
            .await?;
        draft.image_url = Some(url);
    }
    Ok(Ok(draft))
}

//=========================================================================================
// Rendering
//=========================================================================================

fn render_form(
    status: StatusCode,
    heading: &str,
    action: &str,
    form: &RecipeForm,
    errors: &[FieldError],
) -> Response {
    let categories = options(
        MealCategory::ALL
            .iter()
            .map(|c| (c.as_str().to_string(), c.to_string())),
        Some(form.category.as_str()),
    );
    let body = format!(
        "<h1>{heading}</h1>{errors}\
<form method=\"post\" action=\"{action}\" enctype=\"multipart/form-data\">\
<p><label>Title <input name=\"title\" maxlength=\"120\" value=\"{title}\"></label></p>\
<p><label>Description <textarea name=\"description\" maxlength=\"2000\">{description}</textarea></label></p>\
<p><label>Category <select name=\"category\"><option value=\"\">Choose...</option>{categories}</select></label></p>\
<p><label>Calories <input name=\"calories\" type=\"number\" min=\"0\" max=\"100000\" value=\"{calories}\"></label></p>\
<p><label>Image URL <input name=\"image_url\" value=\"{image_url}\"></label></p>\
<p><label>Or upload an image <input name=\"image_file\" type=\"file\" accept=\"image/*\"></label></p>\
<p><button type=\"submit\">Save</button> <a href=\"/recipes\">Cancel</a></p>\
</form>",
        heading = escape_html(heading),
        errors = error_summary(errors),
        action = escape_html(action),
        title = escape_html(&form.title),
        description = escape_html(&form.description),
        calories = escape_html(&form.calories),
        image_url = escape_html(&form.image_url),
    );
    page(status, heading, &body)
}

fn recipe_summary(recipe: &Recipe) -> String {
    let description = recipe
        .description
        .as_deref()
        .map(|d| format!("<p>{}</p>", escape_html(d)))
        .unwrap_or_default();
    let calories = recipe
        .calories
        .map(|c| format!("{c} kcal"))
        .unwrap_or_else(|| "-".to_string());
    let image = recipe
        .image_url
        .as_deref()
        .map(|u| format!("<p><img src=\"{}\" alt=\"\" width=\"320\"></p>", escape_html(u)))
        .unwrap_or_default();
    format!(
        "<h1>{title}</h1>{image}{description}\
<dl><dt>Category</dt><dd>{category}</dd><dt>Calories</dt><dd>{calories}</dd></dl>",
        title = escape_html(&recipe.title),
        category = recipe.category,
    )
}

async fn render_ingredients_page(
    state: &AppState,
    user: CurrentUser,
    recipe_id: i64,
    form: Option<&IngredientLineForm>,
    errors: &[FieldError],
) -> PageResult {
    let recipe = state.db.get_recipe(user.user_id, recipe_id).await?;
    let lines = planner::list_recipe_ingredients(state.db.as_ref(), user.user_id, recipe_id).await?;
    let catalog = state.db.list_ingredients().await?;

    let rows: String = if lines.is_empty() {
        "<tr><td colspan=\"3\">No ingredients yet.</td></tr>".to_string()
    } else {
        lines
            .iter()
            .map(|l| {
                format!(
                    "<tr><td>{name}</td><td>{quantity} {unit}</td><td>\
<form method=\"post\" action=\"/recipes/{recipe}/ingredients/{ingredient}/remove\">\
<button type=\"submit\">Remove</button></form></td></tr>",
                    name = escape_html(&l.ingredient_name),
                    quantity = l.quantity,
                    unit = l.unit,
                    recipe = recipe.id,
                    ingredient = l.ingredient_id,
                )
            })
            .collect()
    };

    let ingredient_options = options(
        catalog.iter().map(|i| (i.id.to_string(), i.name.as_str())),
        form.map(|f| f.ingredient_id.as_str()),
    );
    let unit_options = options(
        Unit::ALL.iter().map(|u| (u.as_str().to_string(), u.to_string())),
        Some(form.map(|f| f.unit.as_str()).unwrap_or(Unit::default().as_str())),
    );
    let quantity = form.map(|f| f.quantity.as_str()).unwrap_or_default();

    let body = format!(
        "<h1>Ingredients of {title}</h1>{errors}\
<table><tr><th>Ingredient</th><th>Amount</th><th></th></tr>{rows}</table>\
<h2>Add or update</h2>\
<form method=\"post\" action=\"/recipes/{id}/ingredients\">\
<p><label>Ingredient <select name=\"ingredient_id\">{ingredient_options}</select></label></p>\
<p><label>Quantity <input name=\"quantity\" type=\"number\" step=\"0.01\" min=\"0\" max=\"100000\" value=\"{quantity}\"></label></p>\
<p><label>Unit <select name=\"unit\">{unit_options}</select></label></p>\
<p><button type=\"submit\">Save</button></p>\
</form>\
<p><a href=\"/recipes/{id}/landing\">Back to recipe</a></p>",
        title = escape_html(&recipe.title),
        errors = error_summary(errors),
        id = recipe.id,
        quantity = escape_html(quantity),
    );
    let status = if errors.is_empty() {
        StatusCode::OK
    } else {
        StatusCode::BAD_REQUEST
    };
    Ok(page(status, "Recipe ingredients", &body))
}

//=========================================================================================
// Handlers
//=========================================================================================

pub async fn index(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
) -> PageResult {
    let recipes = state.db.list_recipes(user.user_id).await?;
    let rows: String = if recipes.is_empty() {
        "<tr><td colspan=\"4\">No recipes yet.</td></tr>".to_string()
    } else {
        recipes
            .iter()
            .map(|r| {
                format!(
                    "<tr><td><a href=\"/recipes/{id}/landing\">{title}</a></td><td>{category}</td><td>{calories}</td>\
<td><a href=\"/recipes/{id}\">Details</a> | <a href=\"/recipes/{id}/edit\">Edit</a> | \
<a href=\"/recipes/{id}/ingredients\">Ingredients</a> | <a href=\"/recipes/{id}/delete\">Delete</a></td></tr>",
                    id = r.id,
                    title = escape_html(&r.title),
                    category = r.category,
                    calories = r.calories.map(|c| c.to_string()).unwrap_or_default(),
                )
            })
            .collect()
    };
    let body = format!(
        "<h1>Recipes</h1><p><a href=\"/recipes/new\">Create new</a></p>\
<table><tr><th>Title</th><th>Category</th><th>Calories</th><th></th></tr>{rows}</table>"
    );
    ok_page("Recipes", &body)
}

pub async fn new_form() -> Response {
    render_form(
        StatusCode::OK,
        "New recipe",
        "/recipes",
        &RecipeForm::default(),
        &[],
    )
}

pub async fn create(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    multipart: Multipart,
) -> PageResult {
    let (form, image) = read_recipe_form(multipart).await?;
    let draft = match prepare_draft(&state, &form, image).await? {
        Ok(draft) => draft,
        Err(errors) => {
            return Ok(render_form(
                StatusCode::BAD_REQUEST,
                "New recipe",
                "/recipes",
                &form,
                &errors,
            ))
        }
    };
    let recipe = state.db.create_recipe(user.user_id, &draft).await?;
    info!("User {} created recipe {}", user.user_id, recipe.id);
    Ok(Redirect::to("/recipes").into_response())
}

pub async fn details(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> PageResult {
    let recipe = state.db.get_recipe(user.user_id, id).await?;
    let body = format!(
        "{summary}<p><a href=\"/recipes/{id}/edit\">Edit</a> | <a href=\"/recipes\">Back to list</a></p>",
        summary = recipe_summary(&recipe),
    );
    ok_page(&recipe.title, &body)
}

/// The recipe card: details, ingredient list and how often the recipe is planned.
pub async fn landing(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> PageResult {
    let recipe = state.db.get_recipe(user.user_id, id).await?;
    let lines = planner::list_recipe_ingredients(state.db.as_ref(), user.user_id, id).await?;
    let usages = state.db.count_recipe_usages(id).await?;

    let ingredients: String = if lines.is_empty() {
        "<li>No ingredients listed.</li>".to_string()
    } else {
        lines
            .iter()
            .map(|l| {
                format!(
                    "<li>{} - {} {}</li>",
                    escape_html(&l.ingredient_name),
                    l.quantity,
                    l.unit
                )
            })
            .collect()
    };
    let slots = if usages == 1 { "slot" } else { "slots" };
    let body = format!(
        "{summary}<h2>Ingredients</h2><ul>{ingredients}</ul>\
<p>Used in {usages} meal plan {slots}.</p>\
<p><a href=\"/recipes/{id}/ingredients\">Manage ingredients</a> | <a href=\"/recipes\">Back to list</a></p>",
        summary = recipe_summary(&recipe),
    );
    ok_page(&recipe.title, &body)
}

pub async fn edit_form(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> PageResult {
    let recipe = state.db.get_recipe(user.user_id, id).await?;
    Ok(render_form(
        StatusCode::OK,
        "Edit recipe",
        &format!("/recipes/{id}/edit"),
        &RecipeForm::from_recipe(&recipe),
        &[],
    ))
}

pub async fn update(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
    multipart: Multipart,
) -> PageResult {
    state.db.get_recipe(user.user_id, id).await?;
    let (form, image) = read_recipe_form(multipart).await?;
    let draft = match prepare_draft(&state, &form, image).await? {
        Ok(draft) => draft,
        Err(errors) => {
            return Ok(render_form(
                StatusCode::BAD_REQUEST,
                "Edit recipe",
                &format!("/recipes/{id}/edit"),
                &form,
                &errors,
            ))
        }
    };
    state.db.update_recipe(user.user_id, id, &draft).await?;
    Ok(Redirect::to("/recipes").into_response())
}

pub async fn delete_confirm(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> PageResult {
    let recipe = state.db.get_recipe(user.user_id, id).await?;
    let usages = state.db.count_recipe_usages(id).await?;
    let body = format!(
        "<h1>Delete recipe</h1>\
<p>Are you sure you want to delete <strong>{title}</strong>? \
It will also be removed from {usages} meal plan slot(s).</p>\
<form method=\"post\" action=\"/recipes/{id}/delete\">\
<button type=\"submit\">Delete</button> <a href=\"/recipes\">Cancel</a></form>",
        title = escape_html(&recipe.title),
    );
    ok_page("Delete recipe", &body)
}

/// Deleting a recipe that is already gone still lands on the list.
pub async fn delete(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> PageResult {
    if state.db.delete_recipe(user.user_id, id).await? {
        info!("User {} deleted recipe {}", user.user_id, id);
    }
    Ok(Redirect::to("/recipes").into_response())
}

pub async fn ingredients(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> PageResult {
    render_ingredients_page(&state, user, id, None, &[]).await
}

pub async fn add_ingredient(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
    Form(form): Form<IngredientLineForm>,
) -> PageResult {
    let mut errors = Vec::new();
    let ingredient_id = parse_optional::<i64>("ingredient_id", &form.ingredient_id, &mut errors);
    if ingredient_id.is_none() && errors.is_empty() {
        errors.push(FieldError::new("ingredient_id", "is required"));
    }
    let quantity = parse_optional::<Decimal>("quantity", &form.quantity, &mut errors);
    if quantity.is_none() && !errors.iter().any(|e| e.field == "quantity") {
        errors.push(FieldError::new("quantity", "is required"));
    }
    let unit = match form.unit.trim() {
        "" => Some(Unit::default()),
        u => u.parse::<Unit>().ok().or_else(|| {
            errors.push(FieldError::new("unit", "is not a valid unit"));
            None
        }),
    };

    let (Some(ingredient_id), Some(quantity), Some(unit)) = (ingredient_id, quantity, unit) else {
        return render_ingredients_page(&state, user, id, Some(&form), &errors).await;
    };

    let result = planner::upsert_recipe_ingredient(
        state.db.as_ref(),
        user.user_id,
        id,
        ingredient_id,
        quantity,
        unit,
    )
    .await;
    match result {
        Ok(()) => Ok(Redirect::to(&format!("/recipes/{id}/ingredients")).into_response()),
        Err(PortError::Validation(more)) => {
            render_ingredients_page(&state, user, id, Some(&form), &more).await
        }
        Err(PortError::NotFound(_)) => {
            // Re-rendering answers 404 on its own when the recipe is the missing part.
            let errors = [FieldError::new("", "Recipe or ingredient not found.")];
            render_ingredients_page(&state, user, id, Some(&form), &errors).await
        }
        Err(e) => Err(e.into()),
    }
}

/// Removing an ingredient that is not on the recipe is a no-op.
pub async fn remove_ingredient(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Path((id, ingredient_id)): Path<(i64, i64)>,
) -> PageResult {
    planner::remove_recipe_ingredient(state.db.as_ref(), user.user_id, id, ingredient_id).await?;
    Ok(Redirect::to(&format!("/recipes/{id}/ingredients")).into_response())
}
