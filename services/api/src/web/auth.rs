//! services/api/src/web/auth.rs
//!
//! Authentication endpoints: the external login redirect, its callback, and logout.

use axum::{
    extract::{Query, State},
    http::{header, HeaderMap},
    response::{AppendHeaders, IntoResponse, Redirect},
};
use chrono::{Duration, Utc};
use meal_builder_core::ports::PortError;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, warn};
use utoipa::IntoParams;
use uuid::Uuid;

use crate::error::ApiError;
use crate::web::middleware::{cookie, SESSION_COOKIE};
use crate::web::state::AppState;

const STATE_COOKIE: &str = "oauth_state";
const RETURN_COOKIE: &str = "oauth_return";
const LOGIN_FLOW_MAX_AGE: i64 = 10 * 60;
const SESSION_DAYS: i64 = 30;

//=========================================================================================
// Request Types
//=========================================================================================

#[derive(Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct LoginQuery {
    /// Local path to come back to after login.
    pub return_url: Option<String>,
}

#[derive(Deserialize, IntoParams)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

//=========================================================================================
// Cookie Helpers
//=========================================================================================

fn set_cookie(name: &str, value: &str, max_age: i64, secure: bool) -> String {
    let mut cookie = format!("{name}={value}; HttpOnly; SameSite=Lax; Path=/; Max-Age={max_age}");
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

fn clear_cookie(name: &str, secure: bool) -> String {
    set_cookie(name, "", 0, secure)
}

/// Only same-site absolute paths are allowed as redirect targets.
pub fn is_local_path(path: &str) -> bool {
    path.starts_with('/') && !path.starts_with("//") && !path.starts_with("/\\")
}

/// Bytes a cookie value may hold without quoting.
fn is_cookie_safe(value: &str) -> bool {
    value
        .bytes()
        .all(|b| matches!(b, 0x21 | 0x23..=0x2B | 0x2D..=0x3A | 0x3C..=0x5B | 0x5D..=0x7E))
}

/// Where to send the user after login. Anything that is not a local path
/// storable in the return cookie as-is falls back to the home page.
fn return_target(candidate: Option<&str>) -> String {
    candidate
        .filter(|u| is_local_path(u) && is_cookie_safe(u))
        .unwrap_or("/")
        .to_string()
}

//=========================================================================================
// Handlers
//=========================================================================================

/// GET /auth/login - Start the external login flow
#[utoipa::path(
    get,
    path = "/auth/login",
    params(LoginQuery),
    responses(
        (status = 303, description = "Redirect to the identity provider")
    )
)]
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<LoginQuery>,
) -> impl IntoResponse {
    let secure = state.config.cookie_secure;
    let flow_state = Uuid::new_v4().to_string();
    let return_url = return_target(query.return_url.as_deref());

    let cookies = AppendHeaders([
        (
            header::SET_COOKIE,
            set_cookie(STATE_COOKIE, &flow_state, LOGIN_FLOW_MAX_AGE, secure),
        ),
        (
            header::SET_COOKIE,
            set_cookie(
                RETURN_COOKIE,
                &return_url,
                LOGIN_FLOW_MAX_AGE,
                secure,
            ),
        ),
    ]);
    (cookies, Redirect::to(&state.identity.authorize_url(&flow_state)))
}

/// GET /auth/callback - Finish the external login flow
#[utoipa::path(
    get,
    path = "/auth/callback",
    params(CallbackQuery),
    responses(
        (status = 303, description = "Logged in; redirect to the stored return path"),
        (status = 401, description = "State mismatch or rejected code")
    )
)]
pub async fn callback_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<CallbackQuery>,
) -> Result<impl IntoResponse, ApiError> {
    if let Some(error) = &query.error {
        warn!("Identity provider returned an error: {}", error);
        return Err(PortError::Unauthorized.into());
    }

    let expected = cookie(&headers, STATE_COOKIE).filter(|s| !s.is_empty());
    let (Some(expected), Some(received), Some(code)) = (expected, query.state.as_deref(), query.code.as_deref()) else {
        return Err(PortError::Unauthorized.into());
    };
    if expected != received {
        warn!("OAuth state mismatch on callback");
        return Err(PortError::Unauthorized.into());
    }

    // 1. Resolve the external identity to a local user
    let identity = state.identity.exchange_code(code).await?;
    let user = state.db.get_or_create_user(&identity).await?;

    // 2. Create the auth session
    let auth_session_id = Uuid::new_v4().to_string();
    let expires_at = Utc::now() + Duration::days(SESSION_DAYS);
    state
        .db
        .create_auth_session(&auth_session_id, user.id, expires_at)
        .await?;
    info!("User {} logged in", user.id);

    // 3. Set the session cookie and go back where the user came from
    let return_url = return_target(cookie(&headers, RETURN_COOKIE));
    let secure = state.config.cookie_secure;
    let cookies = AppendHeaders([
        (
            header::SET_COOKIE,
            set_cookie(
                SESSION_COOKIE,
                &auth_session_id,
                Duration::days(SESSION_DAYS).num_seconds(),
                secure,
            ),
        ),
        (header::SET_COOKIE, clear_cookie(STATE_COOKIE, secure)),
        (header::SET_COOKIE, clear_cookie(RETURN_COOKIE, secure)),
    ]);
    Ok((cookies, Redirect::to(&return_url)))
}

/// POST /auth/logout - Logout and invalidate session
#[utoipa::path(
    post,
    path = "/auth/logout",
    responses(
        (status = 303, description = "Logged out; redirect home")
    )
)]
pub async fn logout_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    if let Some(auth_session_id) = cookie(&headers, SESSION_COOKIE).filter(|s| !s.is_empty()) {
        state.db.delete_auth_session(auth_session_id).await?;
    }
    let cleared = clear_cookie(SESSION_COOKIE, state.config.cookie_secure);
    Ok(([(header::SET_COOKIE, cleared)], Redirect::to("/")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_local_paths_are_redirect_targets() {
        assert!(is_local_path("/recipes/3"));
        assert!(!is_local_path("https://evil.example"));
        assert!(!is_local_path("//evil.example"));
        assert!(!is_local_path("/\\evil.example"));
        assert!(!is_local_path(""));
    }

    #[test]
    fn return_target_keeps_cookie_safe_local_paths() {
        let original = "/mealplans/3?tab=grid&x=1";
        assert_eq!(return_target(Some(original)), original);
        assert_eq!(return_target(Some("/recipes;Domain=evil.example")), "/");
        assert_eq!(return_target(Some("/my recipes")), "/");
        assert_eq!(return_target(Some("/a,b")), "/");
        assert_eq!(return_target(Some("//evil.example")), "/");
        assert_eq!(return_target(None), "/");
    }

    #[test]
    fn secure_flag_follows_configuration() {
        assert!(set_cookie("session", "x", 10, true).ends_with("; Secure"));
        assert!(!set_cookie("session", "x", 10, false).contains("Secure"));
        assert!(clear_cookie("session", false).contains("Max-Age=0"));
    }
}
