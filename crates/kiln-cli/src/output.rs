//! Output management and formatting.

use std::io::{self, IsTerminal};

use console::Term;
use owo_colors::OwoColorize;
use serde::Serialize;

use kiln_core::domain::{FileOutcome, FileRecord};

use crate::cli::global::{GlobalArgs, OutputFormat};
use crate::config::AppConfig;

pub struct OutputManager {
    resolved_format: OutputFormat,
    quiet: bool,
    no_color: bool,
    term: Term,
}

impl OutputManager {
    pub fn new(args: &GlobalArgs, config: &AppConfig) -> Self {
        let resolved_format = match args.output_format {
            OutputFormat::Auto if config.output.format == "json" => OutputFormat::Json,
            OutputFormat::Auto if io::stdout().is_terminal() => OutputFormat::Human,
            OutputFormat::Auto => OutputFormat::Plain,
            explicit => explicit,
        };

        Self {
            resolved_format,
            quiet: args.quiet,
            no_color: args.no_color
                || config.output.no_color
                || resolved_format != OutputFormat::Human,
            term: Term::stdout(),
        }
    }

    // ── Public write methods ───────────────────────────────────────────────

    /// Suppressed in quiet mode and when emitting JSON.
    pub fn print(&self, msg: &str) -> io::Result<()> {
        if self.silent() {
            return Ok(());
        }
        self.term.write_line(msg)
    }

    pub fn success(&self, msg: &str) -> io::Result<()> {
        self.marked("\u{2713}", msg, |s| s.green().bold().to_string())
    }

    /// Never suppressed.
    pub fn error(&self, msg: &str) -> io::Result<()> {
        let line = if self.no_color {
            format!("\u{2717} {msg}")
        } else {
            format!("{} {}", "\u{2717}".red().bold(), msg.red())
        };
        Term::stderr().write_line(&line)
    }

    pub fn warning(&self, msg: &str) -> io::Result<()> {
        self.marked("\u{26a0}", msg, |s| s.yellow().bold().to_string())
    }

    pub fn info(&self, msg: &str) -> io::Result<()> {
        self.marked("\u{2139}", msg, |s| s.blue().bold().to_string())
    }

    pub fn header(&self, text: &str) -> io::Result<()> {
        if self.silent() {
            return Ok(());
        }
        let line = if self.no_color {
            text.to_owned()
        } else {
            text.cyan().bold().to_string()
        };
        self.term.write_line(&line)
    }

    /// One report line per file: marker, path, and the skip reason if any.
    pub fn file(&self, record: &FileRecord, note: Option<&str>) -> io::Result<()> {
        if self.silent() {
            return Ok(());
        }
        let suffix = note.map(|n| format!(" ({n})")).unwrap_or_default();
        let line = match (&record.outcome, self.no_color) {
            (FileOutcome::Written, true) => format!("  + {}{suffix}", record.path),
            (FileOutcome::Written, false) => {
                format!("  {} {}{}", "+".green(), record.path, suffix.dimmed())
            }
            (FileOutcome::WouldWrite, true) => format!("  ~ {}{suffix}", record.path),
            (FileOutcome::WouldWrite, false) => {
                format!("  {} {}{}", "~".yellow(), record.path, suffix.dimmed())
            }
            (FileOutcome::Skipped { reason }, true) => {
                format!("  - {} (skipped: {reason})", record.path)
            }
            (FileOutcome::Skipped { reason }, false) => format!(
                "  {} {} {}",
                "-".dimmed(),
                record.path.dimmed(),
                format!("(skipped: {reason})").dimmed()
            ),
        };
        self.term.write_line(&line)
    }

    /// Pretty JSON on stdout. Written even in quiet mode.
    pub fn json<T: Serialize>(&self, value: &T) -> io::Result<()> {
        let text = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        self.term.write_line(&text)
    }

    fn marked(
        &self,
        mark: &str,
        msg: &str,
        paint: impl Fn(&str) -> String,
    ) -> io::Result<()> {
        if self.silent() {
            return Ok(());
        }
        let line = if self.no_color {
            format!("{mark} {msg}")
        } else {
            format!("{} {msg}", paint(mark))
        };
        self.term.write_line(&line)
    }

    fn silent(&self) -> bool {
        self.quiet || self.is_json()
    }

    // ── Accessors ─────────────────────────────────────────────────────────

    pub fn supports_color(&self) -> bool {
        !self.no_color
    }

    pub fn is_quiet(&self) -> bool {
        self.quiet
    }

    pub fn is_json(&self) -> bool {
        self.resolved_format == OutputFormat::Json
    }

    /// The resolved (non-Auto) output format.
    pub fn format(&self) -> OutputFormat {
        self.resolved_format
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_manager(quiet: bool, no_color: bool, format: OutputFormat) -> OutputManager {
        let args = GlobalArgs {
            verbose: 0,
            quiet,
            no_color,
            config: None,
            output_format: format,
        };
        OutputManager::new(&args, &AppConfig::default())
    }

    #[test]
    fn quiet_suppresses_print() {
        let out = make_manager(true, true, OutputFormat::Plain);
        assert!(out.is_quiet());
        assert!(out.print("hello").is_ok());
    }

    #[test]
    fn plain_format_disables_color() {
        assert!(!make_manager(false, false, OutputFormat::Plain).supports_color());
        assert!(make_manager(false, false, OutputFormat::Human).supports_color());
        assert!(!make_manager(false, true, OutputFormat::Human).supports_color());
    }

    #[test]
    fn json_format_is_reported() {
        let out = make_manager(false, false, OutputFormat::Json);
        assert!(out.is_json());
        assert_eq!(out.format(), OutputFormat::Json);
    }

    #[test]
    fn auto_follows_configured_json() {
        let args = GlobalArgs {
            verbose: 0,
            quiet: false,
            no_color: false,
            config: None,
            output_format: OutputFormat::Auto,
        };
        let mut config = AppConfig::default();
        config.output.format = "json".into();
        assert!(OutputManager::new(&args, &config).is_json());
    }
}
