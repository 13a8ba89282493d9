//! Tests for error handling, exit codes and suggestions.

use std::fs;
use std::path::Path;

use assert_cmd::Command;
use assert_cmd::cargo;
use predicates::prelude::*;
use tempfile::TempDir;

fn kiln(home: &Path) -> Command {
    let mut cmd = cargo::cargo_bin_cmd!("kiln");
    cmd.env("HOME", home)
        .env("XDG_CONFIG_HOME", home.join(".config"))
        .env_remove("RUST_LOG")
        .current_dir(home);
    cmd
}

#[test]
fn unknown_capability_is_not_found() {
    let temp = TempDir::new().unwrap();
    kiln(temp.path())
        .args(["new", "app", "-p", "nope", "--yes"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("Unknown capability 'nope'"))
        .stderr(predicate::str::contains("Suggestions:"));

    assert!(!temp.path().join("app").exists());
}

#[test]
fn unknown_capability_in_plan() {
    let temp = TempDir::new().unwrap();
    kiln(temp.path())
        .args(["plan", "-p", "base", "-p", "missing"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("missing"));
}

#[test]
fn empty_defaults_means_no_capabilities() {
    let temp = TempDir::new().unwrap();
    let config = temp.path().join("kiln.toml");
    fs::write(&config, "[defaults]\ncapabilities = []\n").unwrap();

    kiln(temp.path())
        .args(["-c", config.to_str().unwrap(), "new", "app", "--yes"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("No capabilities requested"))
        .stderr(predicate::str::contains("kiln list"));
}

#[test]
fn non_empty_directory_needs_force() {
    let temp = TempDir::new().unwrap();
    let project = temp.path().join("taken");
    fs::create_dir(&project).unwrap();
    fs::write(project.join("README.md"), "existing\n").unwrap();

    kiln(temp.path())
        .args(["new", "taken", "--yes"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("already exists"))
        .stderr(predicate::str::contains("--force"));

    assert_eq!(
        fs::read_to_string(project.join("README.md")).unwrap(),
        "existing\n"
    );
}

#[test]
fn invalid_project_name() {
    let temp = TempDir::new().unwrap();
    kiln(temp.path())
        .args(["new", ".hidden", "--yes"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Invalid project name"));
}

#[test]
fn malformed_set_is_rejected_by_the_parser() {
    let temp = TempDir::new().unwrap();
    kiln(temp.path())
        .args(["new", "app", "--set", "novalue", "--yes"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("KEY=VALUE"));
}

#[test]
fn missing_config_file_is_a_configuration_error() {
    let temp = TempDir::new().unwrap();
    kiln(temp.path())
        .args(["-c", "does-not-exist.toml", "list"])
        .assert()
        .code(4)
        .stderr(predicate::str::contains("Configuration error"));
}

#[test]
fn unparseable_config_file_is_a_configuration_error() {
    let temp = TempDir::new().unwrap();
    let config = temp.path().join("kiln.toml");
    fs::write(&config, "[output\nno_color = ").unwrap();

    kiln(temp.path())
        .args(["-c", config.to_str().unwrap(), "list"])
        .assert()
        .code(4);
}

#[test]
fn missing_manifest_dir_is_not_found() {
    let temp = TempDir::new().unwrap();
    let config = temp.path().join("kiln.toml");
    fs::write(&config, "[capabilities]\nmanifest_dir = \"no-such-dir\"\n").unwrap();

    kiln(temp.path())
        .args(["-c", config.to_str().unwrap(), "list"])
        .assert()
        .code(3);
}

#[test]
fn non_table_values_file_is_invalid_input() {
    let temp = TempDir::new().unwrap();
    let values = temp.path().join("values.json");
    fs::write(&values, "[1, 2, 3]").unwrap();

    kiln(temp.path())
        .args([
            "new",
            "app",
            "--config-file",
            values.to_str().unwrap(),
            "--yes",
        ])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("expected a table"));
}

#[test]
fn verbose_errors_omit_the_verbose_hint() {
    let temp = TempDir::new().unwrap();
    kiln(temp.path())
        .args(["-v", "new", "app", "-p", "nope", "--yes"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("Use -v / --verbose").not());
}

#[test]
fn missing_subcommand_shows_usage() {
    let temp = TempDir::new().unwrap();
    kiln(temp.path())
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Usage"));
}
