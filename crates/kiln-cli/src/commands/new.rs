//! Implementation of the `kiln new` command.
//!
//! Responsibility: build the project configuration from arguments, call the
//! generation service, and display the report.

use std::io::{self, IsTerminal};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::{debug, info, instrument};

use kiln_adapters::LocalFilesystem;
use kiln_core::{
    application::{ApplicationError, GenerationService},
    domain::{CapabilityId, GenerationContext, GenerationReport, PackageTarget, Resolution},
    error::KilnError,
};

use crate::{
    cli::{GlobalArgs, NewArgs},
    commands::{build_registry, build_renderer, requested_ids},
    config::AppConfig,
    error::{CliError, CliResult},
    output::OutputManager,
};

/// Dispatch sequence:
/// 1. Derive the project name from the directory
/// 2. Assemble project values (name, config file, `--set`)
/// 3. Resolve the requested capabilities
/// 4. Confirm with user unless `--yes`, `--dry-run` or non-interactive
/// 5. Run the pipeline and print the report
#[instrument(skip_all, fields(dir = %args.dir.display()))]
pub fn execute(
    args: NewArgs,
    global: &GlobalArgs,
    config: AppConfig,
    output: OutputManager,
) -> CliResult<()> {
    let project_name = project_name(&args.dir)?;
    let requested = requested_ids(&args.plugins, &config)?;
    let project_config =
        build_project_config(&project_name, args.config_file.as_deref(), &args.set)?;

    if !args.force && !args.dry_run && is_non_empty_dir(&args.dir) {
        return Err(CliError::ProjectExists { path: args.dir });
    }

    let service = GenerationService::new(
        Arc::new(build_registry(&config)?),
        Box::new(build_renderer(&config)?),
        Box::new(LocalFilesystem::new()),
    );
    let resolution = service.resolve(&requested)?;

    let interactive = !output.is_quiet() && !output.is_json() && io::stdin().is_terminal();
    if !args.yes && !args.dry_run && interactive {
        show_plan(&project_name, &args.dir, &resolution, &output)?;
        if !confirm()? {
            return Err(CliError::Cancelled);
        }
    }

    let ctx = GenerationContext::new(args.dir.clone())
        .with_project_config(project_config)
        .with_enabled(resolution.order.iter().cloned())
        .dry_run(args.dry_run)
        .skip_prompts(args.yes)
        .verbose(global.verbose > 0)
        .overwrite(args.force);

    info!(project = %project_name, dry_run = args.dry_run, "Generation started");
    let report = match service.run(&resolution, &ctx) {
        Ok(report) => report,
        Err(e) => {
            report_abort(&e, &output)?;
            return Err(e.into());
        }
    };
    info!(
        written = report.written_count(),
        skipped = report.skipped_count(),
        "Generation completed"
    );

    if output.is_json() {
        output.json(&report)?;
        return Ok(());
    }
    print_report(&project_name, &args.dir, &report, global.verbose > 0, &output)
}

// ── Project values ────────────────────────────────────────────────────────────

pub fn project_name(dir: &Path) -> CliResult<String> {
    let leaf = match dir.file_name() {
        Some(name) => Some(PathBuf::from(name)),
        None => dir
            .canonicalize()
            .ok()
            .and_then(|p| p.file_name().map(PathBuf::from)),
    };
    let name = leaf
        .as_deref()
        .and_then(Path::to_str)
        .ok_or_else(|| CliError::InvalidProjectName {
            name: dir.display().to_string(),
            reason: "cannot derive a name from this path".into(),
        })?
        .to_string();
    validate_project_name(&name)?;
    Ok(name)
}

fn validate_project_name(name: &str) -> CliResult<()> {
    let reason = if name.trim().is_empty() {
        "name cannot be empty"
    } else if name.starts_with('.') {
        "name cannot start with '.'"
    } else if name.chars().any(char::is_control) {
        "name cannot contain control characters"
    } else {
        return Ok(());
    };
    Err(CliError::InvalidProjectName {
        name: name.into(),
        reason: reason.into(),
    })
}

/// `name`, then values from `config_file`, then `--set` assignments.
pub fn build_project_config(
    name: &str,
    config_file: Option<&Path>,
    assignments: &[(String, String)],
) -> CliResult<Map<String, Value>> {
    let mut values = Map::new();
    values.insert("name".into(), Value::String(name.into()));

    if let Some(path) = config_file {
        values.extend(read_values_file(path)?);
    }

    for (key, raw) in assignments {
        let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.clone()));
        set_dotted(&mut values, key, value);
    }

    debug!(keys = values.len(), "project configuration assembled");
    Ok(values)
}

fn read_values_file(path: &Path) -> CliResult<Map<String, Value>> {
    let raw = std::fs::read_to_string(path).map_err(|e| CliError::IoError {
        message: format!("Failed to read '{}'", path.display()),
        source: e,
    })?;
    let invalid = |reason: String| CliError::InvalidInput {
        message: format!("{}: {reason}", path.display()),
    };

    let is_json = path.extension().is_some_and(|ext| ext == "json");
    let parsed: Value = if is_json {
        serde_json::from_str(&raw).map_err(|e| invalid(e.to_string()))?
    } else {
        toml::from_str(&raw).map_err(|e| invalid(e.to_string()))?
    };

    match parsed {
        Value::Object(map) => Ok(map),
        _ => Err(invalid("expected a table of values".into())),
    }
}

fn set_dotted(map: &mut Map<String, Value>, key: &str, value: Value) {
    match key.split_once('.') {
        None => {
            map.insert(key.to_string(), value);
        }
        Some((head, rest)) => {
            let entry = map
                .entry(head.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if !entry.is_object() {
                *entry = Value::Object(Map::new());
            }
            if let Value::Object(inner) = entry {
                set_dotted(inner, rest, value);
            }
        }
    }
}

fn is_non_empty_dir(dir: &Path) -> bool {
    std::fs::read_dir(dir)
        .map(|mut entries| entries.next().is_some())
        .unwrap_or(false)
}

// ── UI helpers ────────────────────────────────────────────────────────────────

fn show_plan(
    name: &str,
    dir: &Path,
    resolution: &Resolution,
    out: &OutputManager,
) -> CliResult<()> {
    out.header("Plan")?;
    out.print(&format!("  Project:      {name}"))?;
    out.print(&format!("  Location:     {}", dir.display()))?;
    out.print(&format!("  Capabilities: {}", join(&resolution.order)))?;
    if !resolution.auto_enabled.is_empty() {
        out.print(&format!("  Auto-enabled: {}", join(&resolution.auto_enabled)))?;
    }
    out.print("")?;
    Ok(())
}

fn confirm() -> CliResult<bool> {
    use std::io::Write;

    print!("Continue? [Y/n] ");
    io::stdout().flush().map_err(|e| CliError::IoError {
        message: "failed to flush stdout".into(),
        source: e,
    })?;

    let mut input = String::new();
    io::stdin()
        .read_line(&mut input)
        .map_err(|e| CliError::IoError {
            message: "failed to read confirmation input".into(),
            source: e,
        })?;

    let input = input.trim().to_ascii_lowercase();
    Ok(input.is_empty() || input == "y" || input == "yes")
}

/// What was left on disk when a capability aborted the run.
fn report_abort(err: &KilnError, out: &OutputManager) -> io::Result<()> {
    let KilnError::Application(ApplicationError::CapabilityFailed {
        plugin_id,
        completed,
        ..
    }) = err
    else {
        return Ok(());
    };

    out.error(&format!("Capability '{plugin_id}' aborted the run"))?;
    let written: Vec<_> = completed.iter().flat_map(|r| r.written()).collect();
    if written.is_empty() {
        out.warning("No files were written")?;
    } else {
        out.warning("Already written:")?;
        for record in written {
            out.file(record, None)?;
        }
    }
    Ok(())
}

fn print_report(
    name: &str,
    dir: &Path,
    report: &GenerationReport,
    verbose: bool,
    out: &OutputManager,
) -> CliResult<()> {
    if report.dry_run {
        out.header(&format!("Dry run: '{name}' at {}", dir.display()))?;
    } else {
        out.header(&format!("Generated '{name}' at {}", dir.display()))?;
    }
    if !report.auto_enabled.is_empty() {
        out.info(&format!("Auto-enabled: {}", join(&report.auto_enabled)))?;
    }

    for result in &report.results {
        if result.files.is_empty() && !verbose {
            continue;
        }
        out.print(&format!("{}:", result.plugin_id))?;
        for record in &result.files {
            out.file(record, None)?;
        }
        if verbose {
            for line in &result.diagnostics {
                out.print(&format!("    {line}"))?;
            }
        }
    }

    if !report.merged.is_empty() {
        out.print("merged:")?;
        for merged in &report.merged {
            let note = format!("{} from {}", merged.strategy, join(&merged.contributors));
            out.file(&merged.file, Some(&note))?;
        }
    }

    for target in [PackageTarget::Root, PackageTarget::App] {
        let deps = report.dependencies_for(target);
        if !deps.is_empty() {
            out.print(&format!("Dependencies ({target}):"))?;
            for dep in deps {
                out.print(&format!("  {}@{} ({})", dep.name, dep.version, dep.kind))?;
            }
        }
        let scripts = report.scripts_for(target);
        if !scripts.is_empty() {
            out.print(&format!("Scripts ({target}):"))?;
            for script in scripts {
                out.print(&format!("  {}: {}", script.name, script.command))?;
            }
        }
    }

    out.print("")?;
    let summary = format!(
        "{} files, {} skipped",
        report.written_count(),
        report.skipped_count()
    );
    if report.dry_run {
        out.info(&format!("Dry run, nothing written: {summary}"))?;
    } else {
        out.success(&format!("Project '{name}' created: {summary}"))?;
        out.print(&format!("  cd {}", dir.display()))?;
    }
    Ok(())
}

fn join(ids: &[CapabilityId]) -> String {
    ids.iter()
        .map(CapabilityId::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

// ── Tests ─────────────────────────────────────────────────────────────────────
