//! Application configuration.
//!
//! [`AppConfig`] is loaded once at startup and passed down by value.  The
//! CLI layer owns config; the core crate never sees it.
//!
//! # Resolution order (highest priority first)
//!
//! 1. CLI flags (handled at the call-site, not here)
//! 2. `KILN_*` environment variables, `__` between nested keys
//!    (`KILN_CAPABILITIES__MANIFEST_DIR=./caps`)
//! 3. Config file: `--config` path (required) or the platform path (optional)
//! 4. Built-in defaults

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub output: OutputConfig,
    pub capabilities: CapabilitiesConfig,
    pub defaults: Defaults,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub no_color: bool,
    pub format: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            no_color: false,
            format: "human".into(),
        }
    }
}

/// Where extra capabilities and shared partials live.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CapabilitiesConfig {
    pub manifest_dir: Option<PathBuf>,
    pub partials_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Defaults {
    /// Requested when `kiln new` is given no `-p`.
    pub capabilities: Vec<String>,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            capabilities: vec!["base".into()],
        }
    }
}

impl AppConfig {
    /// Load configuration, layering file and environment over the defaults.
    ///
    /// `config_file` is the `--config` path; when given it must exist.
    pub fn load(config_file: Option<&Path>) -> anyhow::Result<Self> {
        let file = match config_file {
            Some(path) => config::File::from(path).required(true),
            None => config::File::from(Self::config_path()).required(false),
        };

        config::Config::builder()
            .add_source(config::Config::try_from(&Self::default())?)
            .add_source(file)
            .add_source(
                config::Environment::with_prefix("KILN")
                    .prefix_separator("_")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("defaults.capabilities")
                    .try_parsing(true),
            )
            .build()
            .context("failed to read configuration")?
            .try_deserialize()
            .context("invalid configuration")
    }

    /// Default configuration file location, falling back to `.kiln.toml` in
    /// the current directory.
    pub fn config_path() -> PathBuf {
        directories::ProjectDirs::from("dev", "kiln", "kiln")
            .map(|d| d.config_dir().join("config.toml"))
            .unwrap_or_else(|| PathBuf::from(".kiln.toml"))
    }

    /// The defaults as a commented TOML document, written by `kiln init`.
    pub fn default_toml() -> anyhow::Result<String> {
        let body = toml::to_string_pretty(&Self::default())
            .context("failed to serialise default configuration")?;
        Ok(format!(
            "# Kiln configuration\n\
             # capabilities.manifest_dir: directory of capability.toml manifests\n\
             # capabilities.partials_dir: directory of *.hbs partials\n\n{body}"
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn defaults_request_base() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.defaults.capabilities, ["base"]);
        assert!(!cfg.output.no_color);
        assert!(cfg.capabilities.manifest_dir.is_none());
    }

    #[test]
    fn file_overrides_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("kiln.toml");
        std::fs::write(
            &path,
            "[output]\nno_color = true\n\n[capabilities]\nmanifest_dir = \"caps\"\n\n[defaults]\ncapabilities = [\"web-app\", \"testing\"]\n",
        )
        .unwrap();

        let cfg = AppConfig::load(Some(&path)).unwrap();
        assert!(cfg.output.no_color);
        assert_eq!(cfg.output.format, "human");
        assert_eq!(cfg.capabilities.manifest_dir, Some(PathBuf::from("caps")));
        assert_eq!(cfg.defaults.capabilities, ["web-app", "testing"]);
    }

    #[test]
    fn explicit_missing_file_is_error() {
        assert!(AppConfig::load(Some(Path::new("/no/such/kiln.toml"))).is_err());
    }

    #[test]
    fn default_toml_round_trips() {
        let text = AppConfig::default_toml().unwrap();
        let parsed: AppConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed, AppConfig::default());
    }

    #[test]
    fn config_path_is_not_empty() {
        assert!(!AppConfig::config_path().as_os_str().is_empty());
    }
}
