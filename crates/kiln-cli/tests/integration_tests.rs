//! Integration tests for the kiln binary.

use std::fs;
use std::path::Path;

use assert_cmd::Command;
use assert_cmd::cargo;
use predicates::prelude::*;
use tempfile::TempDir;

/// A `kiln` invocation isolated from the user's config and environment.
fn kiln(home: &Path) -> Command {
    let mut cmd = cargo::cargo_bin_cmd!("kiln");
    cmd.env("HOME", home)
        .env("XDG_CONFIG_HOME", home.join(".config"))
        .env_remove("RUST_LOG")
        .env_remove("NO_COLOR")
        .current_dir(home);
    cmd
}

#[test]
fn help_describes_the_tool() {
    let temp = TempDir::new().unwrap();
    kiln(temp.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Plugin-driven project generator"))
        .stdout(predicate::str::contains("new"))
        .stdout(predicate::str::contains("plan"));
}

#[test]
fn short_and_long_help_share_the_summary() {
    let temp = TempDir::new().unwrap();
    for flag in ["-h", "--help"] {
        kiln(temp.path())
            .arg(flag)
            .assert()
            .success()
            .stdout(predicate::str::contains("Plugin-driven project generator"));
    }
    kiln(temp.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Kiln composes a project from capabilities"));
}

#[test]
fn version_flag() {
    let temp = TempDir::new().unwrap();
    kiln(temp.path())
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn new_help_lists_generation_flags() {
    let temp = TempDir::new().unwrap();
    kiln(temp.path())
        .args(["new", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--plugin"))
        .stdout(predicate::str::contains("--set"))
        .stdout(predicate::str::contains("--dry-run"));
}

#[test]
fn list_shows_builtin_capabilities() {
    let temp = TempDir::new().unwrap();
    kiln(temp.path())
        .args(["list", "--format", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("base"))
        .stdout(predicate::str::contains("web-app"))
        .stdout(predicate::str::contains("container"));
}

#[test]
fn list_json_is_machine_readable() {
    let temp = TempDir::new().unwrap();
    let out = kiln(temp.path())
        .args(["list", "--format", "json"])
        .output()
        .unwrap();
    assert!(out.status.success());

    let caps: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    let ids: Vec<&str> = caps
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["id"].as_str().unwrap())
        .collect();
    assert!(ids.contains(&"type-checking"));
    assert!(ids.contains(&"linting"));
}

#[test]
fn plan_orders_dependencies_first() {
    let temp = TempDir::new().unwrap();
    let out = kiln(temp.path())
        .args(["--output-format", "json", "plan", "-p", "testing"])
        .output()
        .unwrap();
    assert!(out.status.success());

    let plan: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(
        plan["order"],
        serde_json::json!(["base", "type-checking", "testing"])
    );
    assert_eq!(
        plan["auto_enabled"],
        serde_json::json!(["base", "type-checking"])
    );
}

#[test]
fn plan_marks_auto_enabled_capabilities() {
    let temp = TempDir::new().unwrap();
    kiln(temp.path())
        .args(["plan", "-p", "web-app"])
        .assert()
        .success()
        .stdout(predicate::str::contains("1. base  (auto-enabled)"))
        .stdout(predicate::str::contains("3. web-app"));
}

#[test]
fn new_project_writes_files() {
    let temp = TempDir::new().unwrap();
    kiln(temp.path())
        .args(["new", "my-app", "-p", "web-app", "-p", "testing", "--yes"])
        .assert()
        .success();

    let project = temp.path().join("my-app");
    for file in [
        "package.json",
        "tsconfig.json",
        "src/server.ts",
        "vitest.config.ts",
        "README.md",
        ".gitignore",
    ] {
        assert!(project.join(file).is_file(), "missing {file}");
    }

    let package: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(project.join("package.json")).unwrap()).unwrap();
    assert_eq!(package["name"], "my-app");
    assert!(package["scripts"]["test"].is_string());
    assert!(package["scripts"]["start"].is_string());
}

#[test]
fn new_dry_run_writes_nothing() {
    let temp = TempDir::new().unwrap();
    kiln(temp.path())
        .args(["new", "preview", "-p", "container", "--dry-run"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Dockerfile"));

    assert!(!temp.path().join("preview").exists());
}

#[test]
fn set_values_reach_templates() {
    let temp = TempDir::new().unwrap();
    kiln(temp.path())
        .args([
            "new", "svc", "-p", "web-app", "-p", "container", "--set", "port=8080", "--yes",
        ])
        .assert()
        .success();

    let dockerfile = fs::read_to_string(temp.path().join("svc/Dockerfile")).unwrap();
    assert!(dockerfile.contains("EXPOSE 8080"));
    let server = fs::read_to_string(temp.path().join("svc/src/server.ts")).unwrap();
    assert!(server.contains("8080"));
}

#[test]
fn json_report_lists_order_and_files() {
    let temp = TempDir::new().unwrap();
    let out = kiln(temp.path())
        .args(["--output-format", "json", "new", "lib", "-p", "linting", "--yes"])
        .output()
        .unwrap();
    assert!(out.status.success());

    let report: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(report["order"], serde_json::json!(["base", "linting"]));
    assert_eq!(report["dry_run"], false);
    assert!(!report["merged"].as_array().unwrap().is_empty());
}

#[test]
fn force_generates_into_existing_directory() {
    let temp = TempDir::new().unwrap();
    let project = temp.path().join("app");
    fs::create_dir(&project).unwrap();
    fs::write(project.join(".gitignore"), "mine\n").unwrap();
    fs::write(project.join("notes.txt"), "keep\n").unwrap();

    kiln(temp.path())
        .args(["new", "app", "--force", "--yes"])
        .assert()
        .success();

    assert_ne!(
        fs::read_to_string(project.join(".gitignore")).unwrap(),
        "mine\n"
    );
    assert_eq!(
        fs::read_to_string(project.join("notes.txt")).unwrap(),
        "keep\n"
    );
    assert!(project.join("package.json").is_file());
}

#[test]
fn manifest_capabilities_from_config() {
    let temp = TempDir::new().unwrap();
    let cap_dir = temp.path().join("caps/notes");
    fs::create_dir_all(&cap_dir).unwrap();
    fs::write(
        cap_dir.join("capability.toml"),
        r###"
[capability]
id = "notes"
priority = 60
description = "Project notes"
depends_on = ["base"]

[[files]]
path = "NOTES.md"
content = "# Notes for {{name}}\n"
"###,
    )
    .unwrap();

    let config = temp.path().join("kiln.toml");
    fs::write(
        &config,
        format!(
            "[capabilities]\nmanifest_dir = {:?}\n",
            temp.path().join("caps").display().to_string()
        ),
    )
    .unwrap();

    kiln(temp.path())
        .args(["-c", config.to_str().unwrap(), "list", "--format", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("notes"));

    kiln(temp.path())
        .args(["-c", config.to_str().unwrap(), "new", "docs", "-p", "notes", "--yes"])
        .assert()
        .success();
    assert_eq!(
        fs::read_to_string(temp.path().join("docs/NOTES.md")).unwrap(),
        "# Notes for docs\n"
    );
}

#[test]
fn init_writes_default_config() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("conf/kiln.toml");

    kiln(temp.path())
        .args(["-c", path.to_str().unwrap(), "init"])
        .assert()
        .success();

    let written = fs::read_to_string(&path).unwrap();
    assert!(written.contains("[defaults]"));
    assert!(written.contains("capabilities"));

    // The written file is itself a loadable config.
    kiln(temp.path())
        .args(["-c", path.to_str().unwrap(), "plan"])
        .assert()
        .success()
        .stdout(predicate::str::contains("base"));
}

#[test]
fn init_without_force_keeps_existing_config() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("kiln.toml");
    fs::write(&path, "[output]\nno_color = true\n").unwrap();

    kiln(temp.path())
        .args(["-c", path.to_str().unwrap(), "init"])
        .assert()
        .success();

    assert_eq!(
        fs::read_to_string(&path).unwrap(),
        "[output]\nno_color = true\n"
    );
}

#[test]
fn completions_for_bash() {
    let temp = TempDir::new().unwrap();
    kiln(temp.path())
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("kiln"));
}

#[test]
fn env_overrides_config_defaults() {
    let temp = TempDir::new().unwrap();
    kiln(temp.path())
        .env("KILN_OUTPUT__FORMAT", "json")
        .args(["plan", "-p", "linting"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"order\""));
}
