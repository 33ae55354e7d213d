//! services/api/src/web/state.rs
//!
//! Defines the application's shared state and the per-request identity.

use crate::config::Config;
use meal_builder_core::ports::{DatabaseService, IdentityProvider, ImageStorageService};
use std::sync::Arc;

//=========================================================================================
// AppState (Shared Across All Requests)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<dyn DatabaseService>,
    pub config: Arc<Config>,
    pub identity: Arc<dyn IdentityProvider>,
    /// Absent when no image storage is configured; uploads are then rejected.
    pub image_storage: Option<Arc<dyn ImageStorageService>>,
}

//=========================================================================================
// CurrentUser (Inserted by the Auth Middleware)
//=========================================================================================

/// The authenticated caller, placed into request extensions by the middleware.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurrentUser {
    pub user_id: i64,
}
