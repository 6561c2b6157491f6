//! services/api/src/error.rs
//!
//! Defines the primary error type for the entire API service.
//!
//! Every request-level failure is answered with an empty JSON object and a
//! 400 or 404 status.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use tracing::{debug, error};
use travels_core::{PortError, ValidationError};

use crate::adapters::loader::LoadError;
use crate::config::ConfigError;
use crate::web::protocol::EmptyResponse;

/// The primary error type for the `api` service.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Represents an error that occurred during configuration loading.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Represents a failure of the initial bulk load.
    #[error("Data load error: {0}")]
    Load(#[from] LoadError),

    /// Represents an error that propagated up from the store port.
    #[error("Service Port Error: {0}")]
    Port(#[from] PortError),

    /// A request body or partial update broke an entity constraint.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// A request body that is not the expected JSON shape.
    #[error("Malformed JSON body: {0}")]
    Json(#[from] serde_json::Error),

    /// A malformed path or query-string parameter.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Unknown route or entity id.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Represents a standard Input/Output error (e.g., binding to a network socket).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) | ApiError::Port(PortError::NotFound(_)) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_)
            | ApiError::Json(_)
            | ApiError::Validation(_)
            | ApiError::Port(PortError::AlreadyExists(_))
            | ApiError::Port(PortError::Invalid(_)) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("Request failed: {}", self);
        } else {
            debug!("Request rejected with {}: {}", status, self);
        }
        (status, Json(EmptyResponse {})).into_response()
    }
}
