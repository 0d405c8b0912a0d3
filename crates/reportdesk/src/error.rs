//! Error types for the reportdesk library
//!
//! Validation problems are collected rather than reported one at a time, so a
//! caller editing a template sees every problem with a definition in a single
//! round trip.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// Main error type for the reportdesk library
#[derive(Error, Debug)]
pub enum ReportdeskError {
    /// A template definition or report submission failed validation
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// A show-condition could not be evaluated against the current values
    #[error("Condition error: {0}")]
    Condition(#[from] ConditionError),

    /// Completion times must be finite and non-negative
    #[error("Invalid completion time: {0}")]
    InvalidCompletionTime(f64),

    /// JSON serialization or deserialization failed
    #[error("Data error: {0}")]
    Data(#[from] serde_json::Error),
}

/// Shorthand result type for reportdesk operations
pub type Result<T> = std::result::Result<T, ReportdeskError>;

/// A single problem found while validating, located by a JSON-style path
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationIssue {
    /// Location of the offending value, e.g. `fields[2].showCondition.value`
    pub path: String,
    /// Human-readable description of the problem
    pub message: String,
}

impl ValidationIssue {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

/// Every issue found in one validation pass. Never empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationError {
    pub issues: Vec<ValidationIssue>,
}

impl ValidationError {
    /// Convert a list of collected issues into a result
    pub fn check(issues: Vec<ValidationIssue>) -> std::result::Result<(), ValidationError> {
        if issues.is_empty() {
            Ok(())
        } else {
            Err(ValidationError { issues })
        }
    }

    /// Whether any issue is reported at exactly this path
    pub fn has_issue_at(&self, path: &str) -> bool {
        self.issues.iter().any(|issue| issue.path == path)
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} issue(s)", self.issues.len())?;
        for (i, issue) in self.issues.iter().enumerate() {
            let sep = if i == 0 { ": " } else { "; " };
            write!(f, "{}{}", sep, issue)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

/// Errors raised while evaluating a show-condition
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConditionError {
    #[error("Field '{field}' must be numeric for {operator}, got {found}")]
    NotNumeric {
        field: String,
        operator: &'static str,
        found: String,
    },

    #[error("Field '{field}' must be text or a list for {operator}, got {found}")]
    NotSearchable {
        field: String,
        operator: &'static str,
        found: String,
    },
}

impl ConditionError {
    /// Name of the source field whose value could not be compared
    pub fn field(&self) -> &str {
        match self {
            ConditionError::NotNumeric { field, .. } | ConditionError::NotSearchable { field, .. } => {
                field
            }
        }
    }
}

/// A string that does not name any variant of a closed enumeration
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unrecognized {kind} value '{value}'")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}
