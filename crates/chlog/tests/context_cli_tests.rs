//! End-to-end tests for the `context` subcommand.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn chlog() -> Command {
    Command::new(assert_cmd::cargo::cargo_bin!("chlog"))
}

#[test]
fn test_contexts_are_printed_as_a_json_array() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("root.yaml"),
        r#"databaseChangeLog:
  - changeSet:
      id: "1"
      author: alice
      context: "prod, dev"
      changes: []
  - include:
      file: child.yaml
      context: staging
"#,
    )
    .unwrap();
    std::fs::write(
        dir.path().join("child.yaml"),
        r#"databaseChangeLog:
  - changeSet:
      id: "2"
      author: bob
      contextFilter: Test
      changes: []
"#,
    )
    .unwrap();

    chlog()
        .arg("context")
        .arg(dir.path().join("root.yaml"))
        .assert()
        .success()
        .stdout(predicate::str::contains(
            r#"["dev","prod","staging","Test"]"#,
        ));
}

#[test]
fn test_changelog_without_contexts_prints_empty_array() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("root.json"),
        r#"{"databaseChangeLog": [{"changeSet": {"id": "1", "author": "alice", "changes": []}}]}"#,
    )
    .unwrap();

    chlog()
        .arg("context")
        .arg(dir.path().join("root.json"))
        .assert()
        .success()
        .stdout("[]\n");
}

#[test]
fn test_missing_changelog_is_a_usage_error() {
    chlog()
        .arg("context")
        .arg("/no/such/changelog.yaml")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("does not exist"));
}

#[test]
fn test_broken_include_reference_is_a_generic_error() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("root.json"),
        r#"{"databaseChangeLog": [{"include": {"file": "missing.json"}}]}"#,
    )
    .unwrap();

    chlog()
        .arg("context")
        .arg(dir.path().join("root.json"))
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Error:"));
}
