// ============================================================================
// domain/errors.rs - COMPREHENSIVE ERROR DOMAIN
// ============================================================================

use thiserror::Error;

/// Root domain error type.
///
/// All errors are:
/// - Cloneable (results are reported after the run aborts)
/// - Categorizable (for CLI display)
/// - Actionable (provides suggestions)
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DomainError {
    // ========================================================================
    // Validation Errors (400-level equivalent)
    // ========================================================================
    #[error("Invalid capability: {0}")]
    InvalidCapability(String),

    #[error("Capability '{id}' is registered more than once")]
    DuplicateCapability { id: String },

    #[error("Capability '{plugin_id}' declares '{path}' more than once")]
    DuplicatePath { plugin_id: String, path: String },

    #[error("Absolute paths not allowed: {path}")]
    AbsolutePathNotAllowed { path: String },

    #[error("Path escapes the output directory: {path}")]
    PathEscapesOutput { path: String },

    #[error("Contribution from '{plugin_id}' to '{path}' is not a JSON document: {reason}")]
    InvalidStructuredContent {
        plugin_id: String,
        path: String,
        reason: String,
    },

    // ========================================================================
    // Compatibility Errors (409-level equivalent)
    // ========================================================================
    #[error("dependency cycle detected: {}", cycle.join(" -> "))]
    CycleDetected { cycle: Vec<String> },

    #[error("'{path}' has contributions with different merge strategies: {}", strategies.join(", "))]
    MergeConflictAmbiguity {
        path: String,
        /// `plugin:strategy` pairs, in resolved order.
        strategies: Vec<String>,
    },

    #[error("'{path}' is produced by both '{first}' and '{second}' without a merge strategy")]
    PathCollision {
        path: String,
        first: String,
        second: String,
    },

    // ========================================================================
    // Not Found Errors (404-level equivalent)
    // ========================================================================
    #[error("{}", unknown_capability_message(id, required_by.as_deref()))]
    UnknownCapability {
        id: String,
        /// The capability whose `depends_on` named `id`, if it was not requested directly.
        required_by: Option<String>,
    },

    // ========================================================================
    // Constraint Violations
    // ========================================================================
    #[error("Required field missing: {field}")]
    MissingRequiredField { field: &'static str },
}

fn unknown_capability_message(id: &str, required_by: Option<&str>) -> String {
    match required_by {
        Some(parent) => format!("Unknown capability '{id}' (required by '{parent}')"),
        None => format!("Unknown capability '{id}'"),
    }
}

impl DomainError {
    /// Get user-actionable suggestions for fixing this error.
    pub fn suggestions(&self) -> Vec<String> {
        match self {
            Self::UnknownCapability { id, required_by } => {
                let mut out = vec![format!("No capability named '{}' is registered", id)];
                if let Some(parent) = required_by {
                    out.push(format!("Check the depends_on list of '{}'", parent));
                }
                out.push("Try: kiln list to see registered capabilities".into());
                out
            }
            Self::CycleDetected { cycle } => vec![
                format!("These capabilities depend on each other: {}", cycle.join(" -> ")),
                "Remove one of the depends_on edges to break the cycle".into(),
            ],
            Self::MergeConflictAmbiguity { path, .. } => vec![
                format!("All contributions to '{}' must use the same merge strategy", path),
                "Pick one of: replace, append, merge-structured".into(),
            ],
            Self::PathCollision { path, .. } => vec![
                format!("Two capabilities both write '{}'", path),
                "Declare the file as a contribution with an explicit merge strategy".into(),
            ],
            Self::DuplicatePath { plugin_id, path } => vec![format!(
                "Capability '{}' must declare '{}' only once",
                plugin_id, path
            )],
            Self::InvalidStructuredContent { path, .. } => vec![
                format!("Contributions to '{}' use merge-structured", path),
                "merge-structured content must be a valid JSON document".into(),
            ],
            _ => vec!["See documentation for more details".into()],
        }
    }

    /// Error category for CLI display styling.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidCapability(_)
            | Self::DuplicateCapability { .. }
            | Self::DuplicatePath { .. }
            | Self::AbsolutePathNotAllowed { .. }
            | Self::PathEscapesOutput { .. }
            | Self::InvalidStructuredContent { .. } => ErrorCategory::Validation,
            Self::CycleDetected { .. }
            | Self::MergeConflictAmbiguity { .. }
            | Self::PathCollision { .. } => ErrorCategory::Compatibility,
            Self::UnknownCapability { .. } => ErrorCategory::NotFound,
            Self::MissingRequiredField { .. } => ErrorCategory::Internal,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Validation,
    Compatibility,
    NotFound,
    Internal,
}
