//! `kiln plan`: resolution only.

use std::sync::Arc;

use kiln_core::application::CapabilityService;
use tracing::instrument;

use crate::{
    cli::PlanArgs,
    commands::{build_registry, requested_ids},
    config::AppConfig,
    error::CliResult,
    output::OutputManager,
};

#[instrument(skip_all)]
pub fn execute(args: PlanArgs, config: AppConfig, output: OutputManager) -> CliResult<()> {
    let requested = requested_ids(&args.plugins, &config)?;
    let service = CapabilityService::new(Arc::new(build_registry(&config)?));
    let resolution = service.plan(&requested)?;

    if output.is_json() {
        output.json(&resolution)?;
        return Ok(());
    }

    output.header("Execution order:")?;
    for (i, id) in resolution.order.iter().enumerate() {
        let note = if resolution.auto_enabled.contains(id) {
            "  (auto-enabled)"
        } else {
            ""
        };
        output.print(&format!("  {}. {id}{note}", i + 1))?;
    }
    Ok(())
}
