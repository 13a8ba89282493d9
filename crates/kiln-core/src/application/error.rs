//! Application layer errors.
//!
//! These errors represent failures in orchestration, not business logic.
//! Business logic errors are `DomainError` from `crate::domain`.

use std::path::PathBuf;
use thiserror::Error;

use crate::domain::GenerationResult;
use crate::error::{ErrorCategory, KilnError};

/// Errors that occur during application orchestration.
#[derive(Debug, Error, Clone)]
pub enum ApplicationError {
    /// Malformed template syntax or a render-time failure.
    #[error("Template '{template}' failed to render: {reason}")]
    RenderingFailed { template: String, reason: String },

    /// Filesystem operation failed.
    #[error("Filesystem error at {path}: {reason}")]
    FilesystemError { path: PathBuf, reason: String },

    /// Renderer state lock poisoned.
    #[error("Template renderer lock error")]
    RendererLockError,

    /// A capability aborted the run. `completed` holds the results of the
    /// capabilities whose files were already committed, which are not rolled
    /// back, followed by the failing capability's result with
    /// `success == false` and files it wrote before the error.
    #[error("Capability '{plugin_id}' failed: {source}")]
    CapabilityFailed {
        plugin_id: String,
        #[source]
        source: Box<KilnError>,
        completed: Vec<GenerationResult>,
    },

    /// A declarative capability manifest could not be loaded.
    #[error("Invalid capability manifest {path}: {reason}")]
    InvalidManifest { path: PathBuf, reason: String },

    /// A directory that must exist does not.
    #[error("Directory not found: {path}")]
    DirectoryNotFound { path: PathBuf },
}

impl ApplicationError {
    /// Get user-actionable suggestions.
    pub fn suggestions(&self) -> Vec<String> {
        match self {
            Self::RenderingFailed { template, .. } => vec![
                format!("Check the template syntax in '{}'", template),
                "Unclosed blocks and unbalanced braces are the usual cause".into(),
            ],
            Self::FilesystemError { path, .. } => vec![
                format!("Failed to access: {}", path.display()),
                "Check that you have write permissions".into(),
            ],
            Self::RendererLockError => vec![
                "The template renderer is in an inconsistent state".into(),
                "Try again; if it persists please report a bug".into(),
            ],
            Self::CapabilityFailed {
                source, completed, ..
            } => {
                let mut out = source.suggestions();
                let written = completed
                    .iter()
                    .filter(|r| r.written().next().is_some())
                    .count();
                if written > 0 {
                    out.push(format!(
                        "{written} capabilities had already written files; they were left in place"
                    ));
                }
                out
            }
            Self::InvalidManifest { path, .. } => vec![
                format!("Fix or remove {}", path.display()),
                "Each manifest needs a [capability] table with an id".into(),
            ],
            Self::DirectoryNotFound { path } => vec![format!(
                "Create {} or point the configuration elsewhere",
                path.display()
            )],
        }
    }

    /// Get error category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::RenderingFailed { .. } => ErrorCategory::Validation,
            Self::FilesystemError { .. } | Self::RendererLockError => ErrorCategory::Internal,
            Self::CapabilityFailed { source, .. } => source.category(),
            Self::InvalidManifest { .. } => ErrorCategory::Configuration,
            Self::DirectoryNotFound { .. } => ErrorCategory::NotFound,
        }
    }
}
