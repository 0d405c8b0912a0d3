//! Error handling for the API server

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use reportdesk::{ReportdeskError, ValidationIssue};
use reportdesk_registry::RegistryError;
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Result type for API operations
pub type Result<T> = std::result::Result<T, ApiError>;

/// API error types
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Missing or invalid identity: {0}")]
    Unauthorized(String),

    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ApiError {
    pub fn bad_request(msg: &str) -> Self {
        Self::BadRequest(msg.to_string())
    }

    /// Status code and public message for this error
    fn status_and_message(&self) -> (StatusCode, String) {
        match self {
            ApiError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, self.to_string()),
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            ApiError::Registry(e) => match e {
                RegistryError::TemplateNotFound(_) | RegistryError::VersionNotFound { .. } => {
                    (StatusCode::NOT_FOUND, e.to_string())
                }
                RegistryError::AccessDenied(_) => (StatusCode::FORBIDDEN, "Access denied".to_string()),
                RegistryError::Conflict { .. } => (StatusCode::CONFLICT, e.to_string()),
                RegistryError::Validation(_) => {
                    (StatusCode::UNPROCESSABLE_ENTITY, "Validation failed".to_string())
                }
                RegistryError::Reportdesk(ReportdeskError::Validation(_)) => {
                    (StatusCode::UNPROCESSABLE_ENTITY, "Validation failed".to_string())
                }
                RegistryError::Reportdesk(inner) => (StatusCode::BAD_REQUEST, inner.to_string()),
                RegistryError::Storage(_) | RegistryError::Serialization(_) => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "Storage error".to_string())
                }
            },
            ApiError::Config(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Configuration error".to_string())
            }
            ApiError::Io(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string()),
        }
    }

    fn issues(&self) -> Option<&[ValidationIssue]> {
        match self {
            ApiError::Registry(RegistryError::Validation(e))
            | ApiError::Registry(RegistryError::Reportdesk(ReportdeskError::Validation(e))) => {
                Some(&e.issues)
            }
            _ => None,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_message) = self.status_and_message();
        if status.is_server_error() {
            error!("Request failed: {}", self);
        }

        let body = match self.issues() {
            Some(issues) => json!({
                "error": error_message,
                "status": status.as_u16(),
                "issues": issues
            }),
            None => json!({
                "error": error_message,
                "status": status.as_u16()
            }),
        };

        (status, Json(body)).into_response()
    }
}
