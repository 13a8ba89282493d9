//! Command handlers. Each translates arguments into service calls and
//! prints the outcome; no generation logic lives here.

pub mod completions;
pub mod init;
pub mod list;
pub mod new;
pub mod plan;

use tracing::debug;

use kiln_adapters::{CapabilityLoader, HandlebarsRenderer, builtin_registry};
use kiln_core::domain::{CapabilityId, CapabilityRegistry};

use crate::{
    config::AppConfig,
    error::{CliError, CliResult},
};

/// Built-ins plus any manifests under `capabilities.manifest_dir`.
pub(crate) fn build_registry(config: &AppConfig) -> CliResult<CapabilityRegistry> {
    let mut registry = builtin_registry().map_err(|e| CliError::Core(e.into()))?;
    if let Some(dir) = &config.capabilities.manifest_dir {
        let added = CapabilityLoader::new(dir).register_all(&mut registry)?;
        debug!(added, dir = %dir.display(), "manifest capabilities loaded");
    }
    Ok(registry)
}

/// Renderer with the partials under `capabilities.partials_dir` registered.
pub(crate) fn build_renderer(config: &AppConfig) -> CliResult<HandlebarsRenderer> {
    use kiln_core::application::ports::TemplateRenderer as _;

    let renderer = HandlebarsRenderer::new();
    if let Some(dir) = &config.capabilities.partials_dir {
        let count = renderer.register_partials_from_dir(dir)?;
        debug!(count, dir = %dir.display(), "partials registered");
    }
    Ok(renderer)
}

/// Capabilities from the command line, or the configured defaults.
pub(crate) fn requested_ids(plugins: &[String], config: &AppConfig) -> CliResult<Vec<CapabilityId>> {
    let source = if plugins.is_empty() {
        config.defaults.capabilities.as_slice()
    } else {
        plugins
    };
    if source.is_empty() {
        return Err(CliError::NoCapabilities);
    }
    Ok(source.iter().map(|p| CapabilityId::from(p.trim())).collect())
}
