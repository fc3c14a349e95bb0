//! Integration tests for the apilink CLI
//!
//! These tests run the actual binary against scratch unit and registry files.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Get the binary to test
fn apilink_cmd() -> Command {
    Command::cargo_bin("apilink").unwrap()
}

const API_UNIT: &str = r#"
package: api
declarations:
  - type:
      name: Api
      kind: interface
      line: 5
      markers: [{ kind: provides, value: impl.ApiImpl, line: 4, column: 1 }]
      members:
        - method:
            name: doThing
            modifiers: [static]
            returns: void
            markers: [{ kind: provides, value: "impl.ApiImpl#doThing", line: 7, column: 5 }]
"#;

const IMPL_UNIT: &str = r#"
package: impl
declarations:
  - type:
      name: ApiImpl
      members:
        - method: { name: doThing, returns: void }
"#;

fn write(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, contents).unwrap();
    path
}

#[test]
fn test_help_lists_subcommands() {
    apilink_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("link"))
        .stdout(predicate::str::contains("check"))
        .stdout(predicate::str::contains("show"));
}

// ============================================================================
// link
// ============================================================================

#[test]
fn test_link_writes_registry() {
    let temp_dir = TempDir::new().unwrap();
    let api = write(temp_dir.path(), "api/Api.yaml", API_UNIT);
    let implementation = write(temp_dir.path(), "impl/ApiImpl.yaml", IMPL_UNIT);
    let registry = temp_dir.path().join("build/api.registry");

    apilink_cmd()
        .arg("link")
        .arg("--registry")
        .arg(&registry)
        .args(["--impl-version", "21.0.4"])
        .arg("--classpath")
        .arg(&implementation)
        .arg(&api)
        .assert()
        .success()
        .stdout(predicate::str::contains("Linked 1 unit(s)"));

    assert_eq!(
        fs::read_to_string(&registry).unwrap(),
        "VERSION 21.0.4\n\
         TYPE api.Api impl.ApiImpl PROVIDES INTERNAL\n\
         STATIC api.Api doThing ()V impl.ApiImpl doThing INTERNAL\n"
    );
}

#[test]
fn test_link_walks_directories_and_reads_config() {
    let temp_dir = TempDir::new().unwrap();
    write(temp_dir.path(), "units/api/Api.yaml", API_UNIT);
    write(temp_dir.path(), "units/impl/ApiImpl.yml", IMPL_UNIT);
    write(temp_dir.path(), "units/README.txt", "not a unit");
    let registry = temp_dir.path().join("api.registry");
    let version = write(temp_dir.path(), "impl.version", "17.0.9-b1\n");
    let config = write(
        temp_dir.path(),
        "apilink.yaml",
        &format!(
            "registry: {}\nversion_file: {}\n",
            registry.display(),
            version.display()
        ),
    );

    apilink_cmd()
        .arg("link")
        .arg("--config")
        .arg(&config)
        .arg(temp_dir.path().join("units"))
        .assert()
        .success()
        .stdout(predicate::str::contains("Linked 2 unit(s)"));

    let text = fs::read_to_string(&registry).unwrap();
    assert!(text.starts_with("VERSION 17.0.9-b1\n"));
    assert_eq!(text.matches("INTERNAL").count(), 2);
}

#[test]
fn test_link_reports_conflicts_and_fails() {
    let temp_dir = TempDir::new().unwrap();
    let first = write(temp_dir.path(), "A.yaml", API_UNIT);
    let second = write(
        temp_dir.path(),
        "B.yaml",
        "package: api\ndeclarations:\n  - type: { name: Other, line: 2, markers: [{ kind: provides, value: impl.ApiImpl }] }",
    );
    let registry = temp_dir.path().join("api.registry");

    apilink_cmd()
        .arg("link")
        .arg("--registry")
        .arg(&registry)
        .args(["--impl-version", "1"])
        .arg(&first)
        .arg(&second)
        .assert()
        .failure()
        .stderr(predicate::str::contains("B.yaml:2:0:"))
        .stderr(predicate::str::contains(
            "conflicting API binding: api.Other -> impl.ApiImpl <- api.Api",
        ));

    // Registry is still written
    assert!(registry.exists());
}

#[test]
fn test_link_without_version_fails_with_fix() {
    let temp_dir = TempDir::new().unwrap();
    let api = write(temp_dir.path(), "Api.yaml", API_UNIT);

    apilink_cmd()
        .arg("link")
        .arg("--registry")
        .arg(temp_dir.path().join("api.registry"))
        .arg(&api)
        .assert()
        .failure()
        .stderr(predicate::str::contains("LINK-040"))
        .stderr(predicate::str::contains("Fix:"));
}

#[test]
fn test_link_rejects_malformed_registry() {
    let temp_dir = TempDir::new().unwrap();
    let api = write(temp_dir.path(), "Api.yaml", API_UNIT);
    let registry = write(temp_dir.path(), "api.registry", "VERSION 1\nBOGUS line\n");

    apilink_cmd()
        .arg("link")
        .arg("--registry")
        .arg(&registry)
        .args(["--impl-version", "2"])
        .arg(&api)
        .assert()
        .failure()
        .stderr(predicate::str::contains("LINK-010"))
        .stderr(predicate::str::contains("unknown record 'BOGUS'"));

    assert_eq!(fs::read_to_string(&registry).unwrap(), "VERSION 1\nBOGUS line\n");
}

// ============================================================================
// check
// ============================================================================

#[test]
fn test_check_counts_bindings() {
    let temp_dir = TempDir::new().unwrap();
    let api = write(temp_dir.path(), "Api.yaml", API_UNIT);

    apilink_cmd()
        .arg("check")
        .arg(&api)
        .assert()
        .success()
        .stdout(predicate::str::contains("1 unit(s) OK, 2 binding(s) found"));
}

#[test]
fn test_check_reports_marker_errors() {
    let temp_dir = TempDir::new().unwrap();
    let bad = write(
        temp_dir.path(),
        "Bad.yaml",
        "declarations:\n  - type: { name: a.Svc, markers: [{ kind: service, line: 3, column: 2 }] }",
    );

    apilink_cmd()
        .arg("check")
        .arg(&bad)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Bad.yaml:3:2:"))
        .stderr(predicate::str::contains("@Service also requires @Provides"));
}

#[test]
fn test_check_invalid_unit_yaml() {
    let temp_dir = TempDir::new().unwrap();
    let bad = write(temp_dir.path(), "Broken.yaml", "declarations: [unclosed");

    apilink_cmd()
        .arg("check")
        .arg(&bad)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error:"))
        .stderr(predicate::str::contains("Broken.yaml"));
}

// ============================================================================
// show
// ============================================================================

#[test]
fn test_show_text_and_json() {
    let temp_dir = TempDir::new().unwrap();
    let registry = write(
        temp_dir.path(),
        "api.registry",
        "VERSION 3\nTYPE a.Api a.ApiImpl TWO_WAY INTERNAL\nSTATIC a.Api make ()La/Api; a.ApiImpl create\n",
    );

    apilink_cmd()
        .args(["show", "--registry"])
        .arg(&registry)
        .assert()
        .success()
        .stdout(predicate::str::contains("a.Api -> a.ApiImpl [TWO_WAY] internal"))
        .stdout(predicate::str::contains("a.Api#make()La/Api; -> a.ApiImpl#create"));

    apilink_cmd()
        .args(["show", "--format", "json", "--registry"])
        .arg(&registry)
        .assert()
        .success()
        .stdout(predicate::str::contains("\"kind\": \"TWO_WAY\""))
        .stdout(predicate::str::contains("\"descriptor\": \"()La/Api;\""));
}

#[test]
fn test_show_missing_registry() {
    let temp_dir = TempDir::new().unwrap();

    apilink_cmd()
        .args(["show", "--registry"])
        .arg(temp_dir.path().join("missing.registry"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("does not exist"));
}
