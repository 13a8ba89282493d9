//! Infrastructure adapters for Kiln.
//!
//! This crate implements the ports defined in `kiln-core::application::ports`
//! and supplies the capabilities a registry is filled with. It contains all
//! external dependencies and I/O operations.

pub mod builtin_capabilities;
pub mod capability_loader;
pub mod filesystem;
pub mod renderer;

// Re-export commonly used adapters
pub use builtin_capabilities::{builtin_registry, register_builtins};
pub use capability_loader::{CapabilityLoader, ManifestCapability};
pub use filesystem::{LocalFilesystem, MemoryFilesystem};
pub use renderer::HandlebarsRenderer;
