//! Error types for the reportdesk registry

use reportdesk::{ReportdeskError, ValidationError};
use thiserror::Error;

/// Registry-specific errors
#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("Template not found: {0}")]
    TemplateNotFound(String),

    #[error("Version {version} not found for template {template_id}")]
    VersionNotFound { template_id: String, version: u32 },

    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Version conflict for template {template_id}: expected version {expected}, got {actual}")]
    Conflict {
        template_id: String,
        expected: u32,
        actual: u32,
    },

    #[error("Invalid template: {0}")]
    Validation(#[from] ValidationError),

    #[error("Reportdesk error: {0}")]
    Reportdesk(#[from] ReportdeskError),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for registry operations
pub type Result<T> = std::result::Result<T, RegistryError>;
