//! Driven (output) ports - implemented by infrastructure.
//!
//! These traits define what the application needs from external systems.
//! The `kiln-adapters` crate provides implementations.

use std::path::Path;

use crate::domain::{Condition, TemplateContext};
use crate::error::KilnResult;

/// Port for filesystem operations.
///
/// Implemented by:
/// - `kiln_adapters::filesystem::LocalFilesystem` (production)
/// - `kiln_adapters::filesystem::MemoryFilesystem` (testing, dry runs)
#[cfg_attr(test, mockall::automock)]
pub trait Filesystem: Send + Sync {
    /// Create a directory and all parent directories.
    fn create_dir_all(&self, path: &Path) -> KilnResult<()>;

    /// Write content to a file, replacing it if present.
    fn write_file(&self, path: &Path, content: &str) -> KilnResult<()>;

    /// Set POSIX permission bits. A no-op where the platform has none.
    fn set_mode(&self, path: &Path, mode: u32) -> KilnResult<()>;

    /// Check if path exists.
    fn exists(&self, path: &Path) -> bool;
}

/// A template compiled once and rendered many times.
pub type CompiledTemplate = Box<dyn Fn(&TemplateContext) -> KilnResult<String> + Send + Sync>;

/// Port for template rendering.
///
/// Implemented by:
/// - `kiln_adapters::renderer::HandlebarsRenderer`
///
/// The template language supports dotted-path interpolation, `#each`,
/// `#if`/`else`/`#unless`, and partials with keyword arguments. Missing
/// values render as an empty string.
pub trait TemplateRenderer: Send + Sync {
    /// Render a template string.
    ///
    /// # Errors
    ///
    /// `ApplicationError::RenderingFailed` for malformed syntax.
    fn render(&self, template: &str, ctx: &TemplateContext) -> KilnResult<String>;

    /// Render a path template. Same engine, same rules.
    fn render_path(&self, path: &str, ctx: &TemplateContext) -> KilnResult<String>;

    /// Compile once; syntax errors surface here rather than at render time.
    fn compile(&self, template: &str) -> KilnResult<CompiledTemplate>;

    fn register_partial(&self, name: &str, source: &str) -> KilnResult<()>;

    /// Register every `*.hbs` file under `dir`, named by its relative path
    /// without the extension. Returns the count, 0 if `dir` does not exist.
    fn register_partials_from_dir(&self, dir: &Path) -> KilnResult<usize>;

    /// Evaluate a file condition. Never fails; malformed or unresolvable
    /// expressions are false.
    fn evaluate_condition(&self, expr: &str, ctx: &TemplateContext) -> bool {
        Condition::parse(expr).evaluate(ctx)
    }
}
