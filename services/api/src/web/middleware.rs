//! services/api/src/web/middleware.rs
//!
//! Authentication middleware for protecting routes.

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use meal_builder_core::ports::PortError;
use reqwest::Url;
use std::sync::Arc;
use tracing::{debug, error};

use crate::error::ApiError;
use crate::web::state::{AppState, CurrentUser};

pub const SESSION_COOKIE: &str = "session";

/// Reads a cookie value from the request headers.
pub fn cookie<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .find_map(|c| {
            let (key, value) = c.trim().split_once('=')?;
            (key == name).then_some(value)
        })
}

/// Resolves the session cookie to a user, `None` when absent or expired.
pub(crate) async fn authenticate(state: &AppState, headers: &HeaderMap) -> Result<Option<CurrentUser>, ApiError> {
    let Some(session_id) = cookie(headers, SESSION_COOKIE).filter(|s| !s.is_empty()) else {
        return Ok(None);
    };
    match state.db.validate_auth_session(session_id).await {
        Ok(user_id) => Ok(Some(CurrentUser { user_id })),
        Err(PortError::Unauthorized) => {
            debug!("Rejected stale auth session");
            Ok(None)
        }
        Err(e) => {
            error!("Failed to validate auth session: {:?}", e);
            Err(e.into())
        }
    }
}

/// Middleware for the JSON API: a valid session cookie is required, otherwise
/// the request is answered with a 401 problem body.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Response {
    match authenticate(&state, req.headers()).await {
        Ok(Some(user)) => {
            req.extensions_mut().insert(user);
            next.run(req).await
        }
        Ok(None) => ApiError::Port(PortError::Unauthorized).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Middleware for the HTML pages: anonymous visitors are sent to the login
/// flow and come back to the page they asked for.
pub async fn require_login(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Response {
    match authenticate(&state, req.headers()).await {
        Ok(Some(user)) => {
            req.extensions_mut().insert(user);
            next.run(req).await
        }
        Ok(None) => {
            let return_url = req
                .uri()
                .path_and_query()
                .map(|p| p.as_str())
                .unwrap_or("/");
            Redirect::to(&login_target(return_url)).into_response()
        }
        Err(e) => e.into_response(),
    }
}

/// The login path with `return_url` form-encoded into its query.
fn login_target(return_url: &str) -> String {
    match Url::parse_with_params("http://localhost/auth/login", [("returnUrl", return_url)]) {
        Ok(url) => format!("{}?{}", url.path(), url.query().unwrap_or_default()),
        Err(e) => {
            error!("Failed to build login redirect: {}", e);
            "/auth/login".to_string()
        }
    }
}
