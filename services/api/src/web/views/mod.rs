//! services/api/src/web/views/mod.rs
//!
//! Server-rendered HTML pages. Forms post back and redirect on success;
//! validation failures re-render the form with a 400.

pub mod home;
pub mod meal_plans;
pub mod recipes;

use std::sync::Arc;

use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Router,
};
use meal_builder_core::ports::{FieldError, PortError};
use tracing::error;

use crate::error::{errors_by_field, ApiError};
use crate::web::state::AppState;

//=========================================================================================
// Page Errors
//=========================================================================================

/// An error rendered as an HTML page instead of a problem document.
#[derive(Debug)]
pub struct PageError(pub ApiError);

impl From<PortError> for PageError {
    fn from(e: PortError) -> Self {
        Self(ApiError::Port(e))
    }
}

impl From<ApiError> for PageError {
    fn from(e: ApiError) -> Self {
        Self(e)
    }
}

impl IntoResponse for PageError {
    fn into_response(self) -> Response {
        let status = self.0.status();
        let (title, message) = match status {
            StatusCode::NOT_FOUND => ("Not found", "The page you asked for does not exist."),
            StatusCode::BAD_REQUEST => ("Bad request", "The submitted form could not be read."),
            StatusCode::CONFLICT => (
                "Conflict",
                "Someone else changed this at the same time. Please try again.",
            ),
            StatusCode::UNAUTHORIZED => ("Not signed in", "Please sign in again."),
            _ => {
                error!("Page request failed: {:?}", self.0);
                ("Error", "Something went wrong while processing your request.")
            }
        };
        let body = format!("<h1>{title}</h1><p>{message}</p><p><a href=\"/\">Back home</a></p>");
        page(status, title, &body)
    }
}

pub type PageResult = Result<Response, PageError>;

//=========================================================================================
// Rendering Helpers
//=========================================================================================

/// Escapes text for use in element content and quoted attribute values.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Wraps `body` in the site layout.
pub fn page(status: StatusCode, title: &str, body: &str) -> Response {
    let html = format!(
        "<!DOCTYPE html>\
<html><head><meta charset=\"utf-8\"><title>{title} - MealBuilder</title></head><body>\
<nav><a href=\"/\">Home</a> | <a href=\"/recipes\">Recipes</a> | <a href=\"/mealplans\">Meal plans</a> | \
<form method=\"post\" action=\"/auth/logout\" style=\"display:inline\"><button type=\"submit\">Log out</button></form></nav>\
<main>{body}</main>\
</body></html>",
        title = escape_html(title),
    );
    (status, Html(html)).into_response()
}

pub fn ok_page(title: &str, body: &str) -> PageResult {
    Ok(page(StatusCode::OK, title, body))
}

/// Field errors as a list, grouped by field.
pub fn error_summary(errors: &[FieldError]) -> String {
    if errors.is_empty() {
        return String::new();
    }
    let items: String = errors_by_field(errors)
        .into_iter()
        .flat_map(|(field, messages)| {
            messages.into_iter().map(move |m| {
                if field.is_empty() {
                    format!("<li>{}</li>", escape_html(m))
                } else {
                    format!("<li>{}: {}</li>", escape_html(field), escape_html(m))
                }
            })
        })
        .collect();
    format!("<ul class=\"errors\">{items}</ul>")
}

/// `<option>` elements, marking `selected` as chosen.
pub fn options<I, L>(items: I, selected: Option<&str>) -> String
where
    I: IntoIterator<Item = (String, L)>,
    L: AsRef<str>,
{
    items
        .into_iter()
        .map(|(value, label)| {
            let chosen = if selected == Some(value.as_str()) { " selected" } else { "" };
            format!(
                "<option value=\"{}\"{chosen}>{}</option>",
                escape_html(&value),
                escape_html(label.as_ref())
            )
        })
        .collect()
}

/// Parses an optional numeric form field; blank means absent.
pub(crate) fn parse_optional<T: std::str::FromStr>(
    field: &str,
    value: &str,
    errors: &mut Vec<FieldError>,
) -> Option<T> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    match value.parse() {
        Ok(v) => Some(v),
        Err(_) => {
            errors.push(FieldError::new(field, "must be a number"));
            None
        }
    }
}

/// Re-throws validation failures as field errors; everything else propagates.
pub(crate) fn collect_validation<T>(
    result: Result<T, PortError>,
    errors: &mut Vec<FieldError>,
) -> Result<Option<T>, PageError> {
    match result {
        Ok(v) => Ok(Some(v)),
        Err(PortError::Validation(more)) => {
            errors.extend(more);
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}

//=========================================================================================
// Router
//=========================================================================================

/// The pages that need a signed-in user. Login is layered on by the caller.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/recipes", get(recipes::index).post(recipes::create))
        .route("/recipes/new", get(recipes::new_form))
        .route("/recipes/{id}", get(recipes::details))
        .route("/recipes/{id}/landing", get(recipes::landing))
        .route("/recipes/{id}/edit", get(recipes::edit_form).post(recipes::update))
        .route("/recipes/{id}/delete", get(recipes::delete_confirm).post(recipes::delete))
        .route(
            "/recipes/{id}/ingredients",
            get(recipes::ingredients).post(recipes::add_ingredient),
        )
        .route(
            "/recipes/{id}/ingredients/{ingredient_id}/remove",
            post(recipes::remove_ingredient),
        )
        .route("/mealplans", get(meal_plans::index).post(meal_plans::create))
        .route("/mealplans/new", get(meal_plans::new_form))
        .route("/mealplans/{id}", get(meal_plans::details))
        .route(
            "/mealplans/{id}/edit",
            get(meal_plans::edit_form).post(meal_plans::update),
        )
        .route(
            "/mealplans/{id}/delete",
            get(meal_plans::delete_confirm).post(meal_plans::delete),
        )
        .route("/mealplans/{id}/slots", post(meal_plans::assign_slot))
        .route(
            "/mealplans/{id}/slots/{slot_id}/notes",
            post(meal_plans::update_notes),
        )
        .route(
            "/mealplans/{id}/slots/{slot_id}/remove",
            post(meal_plans::remove_slot),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_html_neutralizes_markup() {
        assert_eq!(
            escape_html(r#"<b>"Tom" & 'Jerry'</b>"#),
            "&lt;b&gt;&quot;Tom&quot; &amp; &#39;Jerry&#39;&lt;/b&gt;"
        );
    }

    #[test]
    fn options_mark_the_selected_value() {
        let html = options(
            vec![("1".to_string(), "Soup"), ("2".to_string(), "Pie")],
            Some("2"),
        );
        assert_eq!(
            html,
            "<option value=\"1\">Soup</option><option value=\"2\" selected>Pie</option>"
        );
    }

    #[test]
    fn blank_numeric_fields_are_absent_and_garbage_is_reported() {
        let mut errors = Vec::new();
        assert_eq!(parse_optional::<i32>("calories", "  ", &mut errors), None);
        assert!(errors.is_empty());
        assert_eq!(parse_optional::<i32>("calories", "12a", &mut errors), None);
        assert_eq!(errors.len(), 1);
        assert_eq!(parse_optional::<i32>("calories", " 250 ", &mut errors), Some(250));
    }
}
