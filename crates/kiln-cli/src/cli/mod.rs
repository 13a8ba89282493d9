//! CLI argument definitions using the clap derive API.
//!
//! This module is the *only* place that knows about argument names, aliases,
//! help text, and value enums.  No business logic lives here.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;

pub mod global;
pub use global::{GlobalArgs, OutputFormat};

// ── Top-level CLI ─────────────────────────────────────────────────────────────

#[derive(Debug, Parser)]
#[command(
    name    = "kiln",
    bin_name = "kiln",
    version  = env!("CARGO_PKG_VERSION"),
    author   = env!("CARGO_PKG_AUTHORS"),
    about    = "Plugin-driven project generator",
    long_about = "Plugin-driven project generator.\n\n\
                  Kiln composes a project from capabilities. Each capability \
                  contributes files, dependencies and scripts; shared files \
                  such as package.json are merged.",
    after_help = "EXAMPLES:\n\
        \x20 kiln new my-app -p web-app -p testing\n\
        \x20 kiln new my-app -p container --set port=8080 --dry-run\n\
        \x20 kiln plan -p testing\n\
        \x20 kiln completions bash > /usr/share/bash-completion/completions/kiln",
    arg_required_else_help = true,
    subcommand_required    = true,
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Commands,
}

// ── Subcommands ───────────────────────────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Generate a new project.
    #[command(visible_alias = "n")]
    New(NewArgs),

    /// List registered capabilities.
    #[command(visible_alias = "ls")]
    List(ListArgs),

    /// Print the resolved capability order without generating anything.
    Plan(PlanArgs),

    /// Write the default configuration file.
    Init(InitArgs),

    /// Generate shell completion scripts.
    Completions(CompletionsArgs),
}

// ── new ───────────────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct NewArgs {
    /// Output directory. Its last component becomes the project name.
    #[arg(value_name = "DIR")]
    pub dir: PathBuf,

    /// Capability to enable; repeatable. Falls back to `defaults.capabilities`.
    #[arg(
        short = 'p',
        long = "plugin",
        visible_alias = "capability",
        value_name = "CAP"
    )]
    pub plugins: Vec<String>,

    /// Project values from a TOML or JSON file.
    #[arg(long = "config-file", value_name = "FILE")]
    pub config_file: Option<PathBuf>,

    /// Set a project value; dotted keys nest. Values parse as JSON when
    /// they can (`port=8080`, `strict=false`), otherwise as strings.
    #[arg(long = "set", value_name = "KEY=VALUE", value_parser = parse_assignment)]
    pub set: Vec<(String, String)>,

    #[arg(long = "dry-run", help = "Report what would be written without writing")]
    pub dry_run: bool,

    #[arg(long = "force", help = "Generate into a non-empty directory, overwriting files")]
    pub force: bool,

    #[arg(short = 'y', long = "yes", help = "Skip the confirmation prompt")]
    pub yes: bool,
}

fn parse_assignment(raw: &str) -> Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{raw}'"))?;
    let key = key.trim();
    if key.is_empty() || key.split('.').any(str::is_empty) {
        return Err(format!("invalid key in '{raw}'"));
    }
    Ok((key.to_string(), value.to_string()))
}

// ── list ──────────────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ListArgs {
    #[arg(long = "format", value_enum, default_value = "table")]
    pub format: ListFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ListFormat {
    Table,
    /// One id per line.
    List,
    Json,
}

// ── plan ──────────────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct PlanArgs {
    #[arg(
        short = 'p',
        long = "plugin",
        visible_alias = "capability",
        value_name = "CAP"
    )]
    pub plugins: Vec<String>,
}

// ── init ──────────────────────────────────────────────────────────────────────

/// Writes to `--config` when given, otherwise the platform config path.
#[derive(Debug, Args)]
pub struct InitArgs {
    #[arg(short = 'f', long = "force", help = "Overwrite an existing configuration")]
    pub force: bool,
}

// ── completions ───────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    #[arg(value_enum)]
    pub shell: Shell,
}
