//! services/api/src/error.rs
//!
//! Defines the primary error type for the entire API service and how it is
//! turned into an HTTP problem response.

use std::collections::BTreeMap;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use meal_builder_core::ports::{FieldError, PortError};
use serde_json::json;
use tracing::error;

use crate::config::ConfigError;

/// The primary error type for the `api` service.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Represents an error that occurred during configuration loading.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Represents an error that propagated up from one of the core service ports.
    #[error("Service Port Error: {0}")]
    Port(#[from] PortError),

    /// Represents an error from the underlying database library.
    #[error("Database Error: {0}")]
    Database(#[from] sqlx::Error),

    /// Represents a standard Input/Output error (e.g., binding to a network socket).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A request body or form that could not be read at all.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// A catch-all for any other unexpected errors.
    #[error("An unexpected internal error occurred: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Port(PortError::NotFound(_)) => StatusCode::NOT_FOUND,
            ApiError::Port(PortError::Validation(_)) | ApiError::BadRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::Port(PortError::Unauthorized) => StatusCode::UNAUTHORIZED,
            ApiError::Port(PortError::Conflict(_)) => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Groups field errors by field name, the shape validation problems use.
pub fn errors_by_field(errors: &[FieldError]) -> BTreeMap<&str, Vec<&str>> {
    let mut grouped: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for e in errors {
        grouped
            .entry(e.field.as_str())
            .or_default()
            .push(e.message.as_str());
    }
    grouped
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            ApiError::Port(PortError::Validation(errors)) => json!({
                "title": "One or more validation errors occurred.",
                "status": status.as_u16(),
                "errors": errors_by_field(errors),
            }),
            ApiError::Port(PortError::NotFound(detail)) => json!({
                "title": "Not Found",
                "status": status.as_u16(),
                "detail": detail,
            }),
            ApiError::Port(PortError::Conflict(detail)) => json!({
                "title": "Conflict",
                "status": status.as_u16(),
                "detail": detail,
            }),
            ApiError::Port(PortError::Unauthorized) => json!({
                "title": "Unauthorized",
                "status": status.as_u16(),
            }),
            ApiError::BadRequest(detail) => json!({
                "title": "Bad Request",
                "status": status.as_u16(),
                "detail": detail,
            }),
            other => {
                error!("Request failed: {:?}", other);
                json!({
                    "title": "An unexpected error occurred.",
                    "status": status.as_u16(),
                })
            }
        };
        (status, Json(body)).into_response()
    }
}
