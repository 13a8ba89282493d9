//! `kiln list`: registered capabilities.

use std::sync::Arc;

use kiln_core::application::CapabilityService;

use crate::{
    cli::{ListArgs, ListFormat},
    commands::build_registry,
    config::AppConfig,
    error::CliResult,
    output::OutputManager,
};

pub fn execute(args: ListArgs, config: AppConfig, output: OutputManager) -> CliResult<()> {
    let service = CapabilityService::new(Arc::new(build_registry(&config)?));
    let capabilities = service.list();

    let format = if output.is_json() {
        ListFormat::Json
    } else {
        args.format
    };

    match format {
        ListFormat::Table => {
            output.header("Available capabilities:")?;
            let width = capabilities.iter().map(|c| c.id.len()).max().unwrap_or(0);
            for cap in &capabilities {
                let deps = if cap.depends_on.is_empty() {
                    String::new()
                } else {
                    format!("  needs {}", cap.depends_on.join(", "))
                };
                output.print(&format!(
                    "  {:<width$}  {:>4}  {:<8}  {}{}",
                    cap.id, cap.priority, cap.version, cap.description, deps
                ))?;
            }
        }
        ListFormat::List => {
            for cap in &capabilities {
                output.print(&cap.id)?;
            }
        }
        ListFormat::Json => output.json(&capabilities)?,
    }

    Ok(())
}
