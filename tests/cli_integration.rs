//! CLI integration tests for versionist.
//!
//! Every test passes `--proxy off` or a local mock server so nothing leaves
//! the machine.

use std::fs;
use std::path::Path;
use std::process::Command;

use assert_cmd::prelude::*;
use httpmock::prelude::*;
use predicates::prelude::*;
use tempfile::TempDir;

/// Get the versionist binary command.
fn versionist() -> Command {
    let mut cmd = Command::cargo_bin("versionist").unwrap();
    cmd.env("NETRC", "/nonexistent/versionist-test.netrc");
    cmd
}

const MANIFEST: &str = r#"go_version: "1.21"
projects:
  - package: a.example/lib
    version: v1.2.0
"#;

const GO_MOD: &str = "module example.com/app

go 1.20

require (
	a.example/lib v1.0.0
	a.example/lib/sub v0.9.0 // indirect
)
";

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
}

fn setup(manifest: &str) -> TempDir {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), "versionist.yml", manifest);
    write(tmp.path(), "go.mod", GO_MOD);
    write(tmp.path(), "services/api/go.mod", GO_MOD);
    tmp
}

// ============================================================================
// reconciliation
// ============================================================================

#[test]
fn test_rewrites_direct_requirements_and_go_version() {
    let tmp = setup(MANIFEST);

    versionist()
        .args(["--config-path", "versionist.yml", "--proxy", "off"])
        .current_dir(tmp.path())
        .assert()
        .success()
        .stderr(predicate::str::contains("Updated"));

    for rel in ["go.mod", "services/api/go.mod"] {
        let content = fs::read_to_string(tmp.path().join(rel)).unwrap();
        assert!(content.contains("go 1.21"), "{rel}: {content}");
        assert!(content.contains("\ta.example/lib v1.2.0\n"));
        assert!(content.contains("\ta.example/lib/sub v0.9.0 // indirect\n"));
        assert!(content.ends_with("// Modified by versionist\n"));
    }
}

#[test]
fn test_second_run_changes_nothing() {
    let tmp = setup(MANIFEST);
    let config = tmp.path().join("versionist.yml");

    versionist()
        .arg("--config-path")
        .arg(&config)
        .args(["--proxy", "off"])
        .assert()
        .success();
    let first = fs::read_to_string(tmp.path().join("go.mod")).unwrap();

    versionist()
        .arg("--config-path")
        .arg(&config)
        .args(["--proxy", "off"])
        .assert()
        .success()
        .stderr(predicate::str::contains("Updated").not());
    assert_eq!(fs::read_to_string(tmp.path().join("go.mod")).unwrap(), first);
}

#[test]
fn test_dry_run_writes_nothing() {
    let tmp = setup(MANIFEST);

    versionist()
        .args(["--config-path", "versionist.yml", "--proxy", "off", "--dry-run"])
        .current_dir(tmp.path())
        .assert()
        .success()
        .stderr(predicate::str::contains("Would update"));

    assert_eq!(fs::read_to_string(tmp.path().join("go.mod")).unwrap(), GO_MOD);
}

#[test]
fn test_root_flag_overrides_manifest_dir() {
    let tmp = setup(MANIFEST);
    let other = TempDir::new().unwrap();
    write(other.path(), "go.mod", GO_MOD);

    versionist()
        .arg("--config-path")
        .arg(tmp.path().join("versionist.yml"))
        .arg("--root")
        .arg(other.path())
        .args(["--proxy", "off"])
        .assert()
        .success();

    assert!(fs::read_to_string(other.path().join("go.mod"))
        .unwrap()
        .contains("a.example/lib v1.2.0"));
    assert_eq!(fs::read_to_string(tmp.path().join("go.mod")).unwrap(), GO_MOD);
}

#[test]
fn test_latest_resolved_through_proxy() {
    let server = MockServer::start();
    let latest = server.mock(|when, then| {
        when.method(GET).path("/a.example/lib/@latest");
        then.status(200).body(r#"{"Version":"v1.9.0"}"#);
    });
    let tmp = setup(
        "go_version: \"1.21\"\nprojects:\n  - package: a.example/lib\n    version: latest\n",
    );

    versionist()
        .args(["--config-path", "versionist.yml", "--proxy"])
        .arg(server.base_url())
        .current_dir(tmp.path())
        .assert()
        .success();

    latest.assert_hits(1);
    assert!(fs::read_to_string(tmp.path().join("go.mod"))
        .unwrap()
        .contains("a.example/lib v1.9.0"));
}

#[test]
fn test_failed_lookup_leaves_requirement_and_fails() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET);
        then.status(503);
    });
    let tmp = setup(
        "go_version: \"1.20\"\nprojects:\n  - package: a.example/lib\n    version: latest\n",
    );

    versionist()
        .args(["--config-path", "versionist.yml", "--proxy"])
        .arg(server.base_url())
        .current_dir(tmp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("503"));

    assert_eq!(fs::read_to_string(tmp.path().join("go.mod")).unwrap(), GO_MOD);
}

// ============================================================================
// errors
// ============================================================================

#[test]
fn test_invalid_match_aborts_before_touching_files() {
    let tmp = setup(
        "go_version: \"1.21\"\nprojects:\n  - package: a.example/lib\n    version: v1.2.0\n    match:\n      - a.example/*\n",
    );

    versionist()
        .args(["--config-path", "versionist.yml", "--proxy", "off"])
        .current_dir(tmp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid match"));

    assert_eq!(fs::read_to_string(tmp.path().join("go.mod")).unwrap(), GO_MOD);
}

#[test]
fn test_missing_manifest_fails() {
    let tmp = TempDir::new().unwrap();

    versionist()
        .args(["--config-path", "missing.yml", "--proxy", "off"])
        .current_dir(tmp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to read manifest"));
}

#[test]
fn test_broken_descriptor_is_reported_but_others_are_fixed() {
    let tmp = setup(MANIFEST);
    write(tmp.path(), "broken/go.mod", "module broken\nrequire (\n");

    versionist()
        .args(["--config-path", "versionist.yml", "--proxy", "off"])
        .current_dir(tmp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("could not be processed"))
        .stderr(predicate::str::contains("--> broken/go.mod:2"));

    assert!(fs::read_to_string(tmp.path().join("go.mod"))
        .unwrap()
        .contains("a.example/lib v1.2.0"));
}
