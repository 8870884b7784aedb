//! Smoke tests for the `ciartifact` binary.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

fn ciartifact() -> Command {
    let mut cmd = Command::cargo_bin("ciartifact").unwrap();
    cmd.env_remove("GITHUB_TOKEN").env_remove("RUST_LOG");
    cmd
}

#[test]
fn help_lists_subcommands() {
    ciartifact()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("resolve"))
        .stdout(predicate::str::contains("restore"))
        .stdout(predicate::str::contains("download"));
}

#[test]
fn version_flag_prints_version() {
    ciartifact()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn missing_config_fails() {
    let tmp = TempDir::new().unwrap();
    ciartifact()
        .current_dir(tmp.path())
        .args(["key", "ecmwf/eckit"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("ciartifact.toml"));
}

#[test]
fn malformed_repository_is_rejected() {
    ciartifact()
        .args(["key", "eckit"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("owner/name"));
}

#[test]
fn invalid_config_fails() {
    let tmp = TempDir::new().unwrap();
    let config = tmp.path().join("ciartifact.toml");
    fs::write(&config, "os = \"linux\"\n").unwrap();

    ciartifact()
        .arg("--config")
        .arg(&config)
        .args(["key", "ecmwf/eckit"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid configuration"));
}

#[test]
fn unreachable_api_fails_restore() {
    let tmp = TempDir::new().unwrap();
    let config = tmp.path().join("ciartifact.toml");
    fs::write(
        &config,
        "os = \"linux\"\ncompiler = \"gcc\"\n\n[environment]\ncmake_version = \"3.25.1\"\n",
    )
    .unwrap();

    // Nothing listens on port 9; the head lookup fails before the cache is read.
    ciartifact()
        .arg("--config")
        .arg(&config)
        .args(["--api-url", "http://127.0.0.1:9", "--cache-dir"])
        .arg(tmp.path().join("cache"))
        .args(["restore", "ecmwf/eckit", "--install-dir"])
        .arg(tmp.path().join("install"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("fetch repository HEAD"));
}
