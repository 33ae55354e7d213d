pub mod auth;
pub mod middleware;
pub mod rest;
pub mod state;
pub mod views;

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    http::{
        header::{ACCEPT, CONTENT_TYPE},
        HeaderValue, Method,
    },
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::warn;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub use middleware::{require_auth, require_login};
use rest::ApiDoc;
use state::AppState;

/// Largest accepted request body; recipe images are the big ones.
pub const BODY_LIMIT_BYTES: usize = 10 * 1024 * 1024;

/// Assembles the whole application: public auth routes, the JSON API behind
/// `require_auth`, the HTML pages behind `require_login`, and Swagger UI.
pub fn build_router(state: Arc<AppState>) -> Router {
    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/", get(views::home::home))
        .route("/auth/login", get(auth::login_handler))
        .route("/auth/callback", get(auth::callback_handler))
        .route("/auth/logout", post(auth::logout_handler));

    let api_routes = rest::routes().layer(axum_middleware::from_fn_with_state(
        state.clone(),
        require_auth,
    ));

    let page_routes = views::routes().layer(axum_middleware::from_fn_with_state(
        state.clone(),
        require_login,
    ));

    let mut app = Router::new()
        .merge(public_routes)
        .merge(api_routes)
        .merge(page_routes)
        .layer(DefaultBodyLimit::max(BODY_LIMIT_BYTES));

    if let Some(cors) = cors_layer(state.config.cors_origin.as_deref()) {
        app = app.layer(cors);
    }

    app.layer(TraceLayer::new_for_http())
        .with_state(state)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}

fn cors_layer(origin: Option<&str>) -> Option<CorsLayer> {
    let origin = origin?;
    let origin = match origin.parse::<HeaderValue>() {
        Ok(value) => value,
        Err(e) => {
            warn!("Ignoring unusable CORS origin {:?}: {}", origin, e);
            return None;
        }
    };
    Some(
        CorsLayer::new()
            .allow_origin(origin)
            .allow_credentials(true)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::PATCH,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([CONTENT_TYPE, ACCEPT]),
    )
}
