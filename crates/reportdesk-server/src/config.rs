//! Server configuration management

use crate::error::{ApiError, Result};
use reportdesk::OfficerProfile;

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,

    /// Port to bind to
    pub port: u16,

    /// sqlx connection string for the template database
    pub database_url: String,

    /// Maximum accepted request body in bytes
    pub max_body_bytes: usize,

    /// Officer identity used when composing narratives
    pub officer: OfficerProfile,
}

fn optional_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl ServerConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(optional_var)
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();

        let port = match lookup("PORT") {
            Some(v) => v
                .parse()
                .map_err(|_| ApiError::Config(format!("Invalid PORT value: {}", v)))?,
            None => defaults.port,
        };
        let max_body_bytes = match lookup("MAX_BODY_BYTES") {
            Some(v) => v
                .parse()
                .map_err(|_| ApiError::Config(format!("Invalid MAX_BODY_BYTES value: {}", v)))?,
            None => defaults.max_body_bytes,
        };

        Ok(Self {
            host: lookup("HOST").unwrap_or(defaults.host),
            port,
            database_url: lookup("DATABASE_URL").unwrap_or(defaults.database_url),
            max_body_bytes,
            officer: OfficerProfile {
                name: lookup("OFFICER_NAME"),
                rank: lookup("OFFICER_RANK"),
                codename: lookup("OFFICER_CODENAME"),
            },
        })
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            database_url: "sqlite:./data/reportdesk.db".to_string(),
            max_body_bytes: 2 * 1024 * 1024,
            officer: OfficerProfile::default(),
        }
    }
}
