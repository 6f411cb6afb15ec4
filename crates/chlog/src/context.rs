//! Collecting the context expressions used across a changelog tree.
//!
//! Follows `include` and `includeAll` references from a root changelog and
//! gathers every context named on a changeset or inherited from an include
//! directive. Useful for discovering which `--contexts` values a deployment
//! can be filtered by.

use crate::engine::{ChangelogEngine, Entry};
use crate::format::Format;
use anyhow::{Context, Result};
use serde_json::Value;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Every context expression reachable from `changelog`, sorted
/// case-insensitively and deduplicated.
pub fn resolve_contexts(engine: &dyn ChangelogEngine, changelog: &Path) -> Result<Vec<String>> {
    let root_dir = changelog.parent().unwrap_or(Path::new("")).to_path_buf();
    let mut contexts = Vec::new();
    let mut visited = HashSet::new();
    collect(engine, &root_dir, changelog, &mut visited, &mut contexts)?;

    contexts.sort_by_key(|context| context.to_lowercase());
    contexts.dedup_by(|a, b| a.eq_ignore_ascii_case(b));
    Ok(contexts)
}

fn collect(
    engine: &dyn ChangelogEngine,
    root_dir: &Path,
    changelog: &Path,
    visited: &mut HashSet<PathBuf>,
    contexts: &mut Vec<String>,
) -> Result<()> {
    // Cycle protection keyed on the canonical path.
    let canonical = changelog
        .canonicalize()
        .with_context(|| format!("changelog '{}' not found", changelog.display()))?;
    if !visited.insert(canonical) {
        return Ok(());
    }

    let format = Format::from_path(changelog).with_context(|| {
        format!(
            "'{}' has no recognized changelog extension",
            changelog.display()
        )
    })?;
    let file_name = changelog
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default();
    let bytes = std::fs::read(changelog)
        .with_context(|| format!("failed to read '{}'", changelog.display()))?;
    let parsed = engine.parse(format, file_name, &bytes)?;

    for entry in &parsed.entries {
        match entry {
            Entry::ChangeSet(change_set) => {
                for key in ["context", "contextFilter"] {
                    if let Some(expression) =
                        change_set.attributes.get(key).and_then(Value::as_str)
                    {
                        push_contexts(contexts, expression);
                    }
                }
            }
            Entry::Directive { name, value } if name == "include" => {
                if let Some(expression) = value.get("context").and_then(Value::as_str) {
                    push_contexts(contexts, expression);
                }
                if let Some(reference) = value.get("file").and_then(Value::as_str) {
                    let basis = if is_truthy(value.get("relativeToChangelogFile")) {
                        changelog.parent().unwrap_or(Path::new("")).to_path_buf()
                    } else {
                        root_dir.to_path_buf()
                    };
                    collect(engine, root_dir, &basis.join(reference), visited, contexts)?;
                }
            }
            Entry::Directive { name, value } if name == "includeAll" => {
                if let Some(expression) = value.get("context").and_then(Value::as_str) {
                    push_contexts(contexts, expression);
                }
                if let Some(directory) = value.get("path").and_then(Value::as_str) {
                    let basis = if is_truthy(value.get("relativeToChangelogFile")) {
                        changelog.parent().unwrap_or(Path::new("")).to_path_buf()
                    } else {
                        root_dir.to_path_buf()
                    };
                    collect_directory(engine, root_dir, &basis.join(directory), visited, contexts)?;
                }
            }
            Entry::Directive { .. } => {}
        }
    }
    Ok(())
}

fn collect_directory(
    engine: &dyn ChangelogEngine,
    root_dir: &Path,
    directory: &Path,
    visited: &mut HashSet<PathBuf>,
    contexts: &mut Vec<String>,
) -> Result<()> {
    let entries = std::fs::read_dir(directory)
        .with_context(|| format!("failed to list '{}'", directory.display()))?;
    let mut files: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && Format::from_path(path).is_some())
        .collect();
    files.sort();
    for file in files {
        collect(engine, root_dir, &file, visited, contexts)?;
    }
    Ok(())
}

fn push_contexts(contexts: &mut Vec<String>, expression: &str) {
    for context in expression.split(',') {
        let context = context.trim();
        if !context.is_empty() {
            contexts.push(context.to_string());
        }
    }
}

fn is_truthy(value: Option<&Value>) -> bool {
    value.is_some_and(|v| v.as_bool() == Some(true) || v.as_str() == Some("true"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::SerdeEngine;
    use tempfile::TempDir;

    #[test]
    fn test_contexts_are_collected_sorted_and_deduplicated() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("root.yaml"),
            r#"databaseChangeLog:
  - changeSet:
      id: "1"
      author: alice
      context: "prod, Dev"
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
      contextFilter: dev
      changes: []
"#,
        )
        .unwrap();

        let contexts = resolve_contexts(&SerdeEngine, &dir.path().join("root.yaml")).unwrap();
        assert_eq!(contexts, ["Dev", "prod", "staging"]);
    }

    #[test]
    fn test_include_all_visits_directory_and_cycles_are_safe() {
        let dir = TempDir::new().unwrap();
        let sub = dir.path().join("sub");
        std::fs::create_dir(&sub).unwrap();
        std::fs::write(
            dir.path().join("root.json"),
            r#"{"databaseChangeLog": [
  {"includeAll": {"path": "sub"}}
]}"#,
        )
        .unwrap();
        // loops back to the root
        std::fs::write(
            sub.join("leaf.json"),
            r#"{"databaseChangeLog": [
  {"changeSet": {"id": "1", "author": "alice", "context": "nested", "changes": []}},
  {"include": {"file": "root.json"}}
]}"#,
        )
        .unwrap();
        std::fs::write(sub.join("readme.txt"), "skipped").unwrap();

        let contexts = resolve_contexts(&SerdeEngine, &dir.path().join("root.json")).unwrap();
        assert_eq!(contexts, ["nested"]);
    }

    #[test]
    fn test_missing_include_target_is_an_error() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("root.json"),
            r#"{"databaseChangeLog": [{"include": {"file": "absent.json"}}]}"#,
        )
        .unwrap();

        let result = resolve_contexts(&SerdeEngine, &dir.path().join("root.json"));
        assert!(result.is_err());
    }
}
