//! Application layer for Kiln.
//!
//! This layer contains:
//! - **Services**: Use case orchestration (GenerationService, CapabilityService)
//! - **Ports**: Interface definitions (traits) for external dependencies
//! - **Writer**: Commits rendered files through the `Filesystem` port
//! - **Errors**: Application-specific error types
//!
//! The application layer coordinates the domain layer but contains no
//! business logic itself. All business rules live in `crate::domain`.

pub mod error;
pub mod ports;
pub mod services;
pub mod writer;

// Re-export main services
pub use services::{
    CapabilityInfo, // DTO for capability metadata
    CapabilityService,
    GenerationService,
};

// Re-export port traits (for adapter implementation)
pub use ports::{CompiledTemplate, Filesystem, TemplateRenderer};

pub use error::ApplicationError;
pub use writer::{OutputLocation, OutputWriter};
