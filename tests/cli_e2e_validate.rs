//! End-to-end tests for the `validate` command.

mod common;
use common::prelude::*;

#[test]
fn test_validate_clean_fleet() {
    let fixture = TestFixture::new()
        .with_document(documents::CLEAN)
        .with_clean_repos();

    fixture
        .command()
        .arg("validate")
        .assert()
        .success()
        .stdout(predicate::str::contains("Services checked: 2"))
        .stdout(predicate::str::contains("Fleet document is valid"));
}

#[test]
fn test_validate_invalid_declaration_fails() {
    let fixture = TestFixture::new().with_document(documents::INVALID_SERVICE);

    fixture
        .command()
        .arg("validate")
        .assert()
        .code(1)
        .stdout(predicate::str::contains("[ERR] ghost [InvalidServiceDeclaration]"))
        .stderr(predicate::str::contains("Validation failed"));
}

#[test]
fn test_validate_missing_checkout_with_url_is_warning() {
    let fixture = TestFixture::new().with_document(documents::REMOTE_ONLY);

    fixture
        .command()
        .arg("validate")
        .assert()
        .success()
        .stdout(predicate::str::contains("[WARN] docs [PathNotFound]"));
}

#[test]
fn test_validate_strict_fails_on_warnings() {
    let fixture = TestFixture::new().with_document(documents::REMOTE_ONLY);

    fixture
        .command()
        .args(["validate", "--strict"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("strict mode"));
}

#[test]
fn test_validate_directory_without_repository_warns() {
    let fixture = TestFixture::new()
        .with_document(documents::CLEAN)
        .with_repo("libs/shared-lib")
        .with_file("services/billing/README.md", "not a repo");

    fixture
        .command()
        .arg("validate")
        .assert()
        .success()
        .stdout(predicate::str::contains("[NotAGitRepository]"));
}

#[test]
fn test_validate_reports_every_finding() {
    let fixture = TestFixture::new().with_document(
        r#"fleet:
  name: many
services:
  one:
    type: service
  two:
    type: tool
"#,
    );

    fixture
        .command()
        .arg("validate")
        .assert()
        .failure()
        .stdout(predicate::str::contains("one [InvalidServiceDeclaration]"))
        .stdout(predicate::str::contains("two [InvalidServiceDeclaration]"));
}

#[test]
fn test_validate_json_output() {
    let fixture = TestFixture::new().with_document(documents::REMOTE_ONLY);

    let output = fixture
        .command()
        .args(["validate", "--format", "json"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let value: serde_json::Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(value["services_checked"], 1);
    assert_eq!(value["findings"][0]["kind"], "PathNotFound");
    assert_eq!(value["findings"][0]["severity"], "warning");
}

#[test]
fn test_validate_requires_fleet() {
    let fixture = TestFixture::new();

    fixture
        .command()
        .arg("validate")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Fleet document not found"));
}

#[test]
fn test_validate_with_fleet_mode_disabled_fails() {
    let fixture = TestFixture::new().with_document(documents::CLEAN);

    fixture
        .command()
        .args(["--fleet-mode", "false", "validate"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("fleet mode is disabled"));
}
