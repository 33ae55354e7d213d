//! The public landing page.

use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{Html, IntoResponse, Response},
};

use super::{escape_html, page, PageError};
use crate::web::middleware::authenticate;
use crate::web::state::AppState;

pub async fn home(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Response, PageError> {
    let Some(user) = authenticate(&state, &headers).await? else {
        let html = "<!DOCTYPE html>\
<html><head><meta charset=\"utf-8\"><title>MealBuilder</title></head><body>\
<h1>MealBuilder</h1>\
<p>Plan your week: collect recipes, put them into breakfast, lunch and dinner slots, \
and get the plan in your chat.</p>\
<p><a href=\"/auth/login?returnUrl=/mealplans\">Sign in with Google</a></p>\
</body></html>";
        return Ok(Html(html).into_response());
    };

    let plans = state.db.list_meal_plans(user.user_id).await?;
    let recipes = state.db.list_recipes(user.user_id).await?;
    let latest = plans
        .last()
        .map(|p| {
            format!(
                "<p>Latest plan: <a href=\"/mealplans/{}\">{}</a></p>",
                p.id,
                escape_html(&p.name)
            )
        })
        .unwrap_or_default();

    let body = format!(
        "<h1>MealBuilder</h1>\
<p>You have <a href=\"/recipes\">{} recipes</a> and <a href=\"/mealplans\">{} meal plans</a>.</p>\
{latest}\
<p><a href=\"/recipes/new\">New recipe</a> | <a href=\"/mealplans/new\">New meal plan</a></p>",
        recipes.len(),
        plans.len(),
    );
    Ok(page(StatusCode::OK, "Home", &body))
}
