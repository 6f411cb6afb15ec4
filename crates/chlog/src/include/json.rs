//! Include rewriting for JSON changelogs.

use super::{json_pattern, remap_reference, IncludeRewriter, RewriteError};
use crate::convert::RewriteLedger;
use regex::Regex;
use serde_json::Value;
use std::path::Path;

pub(super) struct JsonIncludeRewriter;

impl IncludeRewriter for JsonIncludeRewriter {
    fn pattern(&self) -> &'static Regex {
        json_pattern()
    }

    fn rewrite(
        &self,
        ledger: &RewriteLedger,
        input_root: &Path,
        include_file: &Path,
        destination: &Path,
    ) -> Result<(), RewriteError> {
        let content = std::fs::read(include_file).map_err(|source| RewriteError::Read {
            path: include_file.to_path_buf(),
            source,
        })?;
        let malformed = |message: String| RewriteError::Malformed {
            syntax: "JSON",
            path: include_file.to_path_buf(),
            message,
        };

        let mut document: Value =
            serde_json::from_slice(&content).map_err(|e| malformed(e.to_string()))?;

        let entries = document
            .get_mut("databaseChangeLog")
            .and_then(Value::as_array_mut)
            .ok_or_else(|| malformed("missing 'databaseChangeLog' array".to_string()))?;
        for entry in entries {
            let Some(include) = entry.get_mut("include") else {
                continue;
            };
            let relative_to_changelog = include
                .get("relativeToChangelogFile")
                .is_some_and(is_truthy);
            let Some(literal) = include.get("file").and_then(Value::as_str) else {
                continue;
            };
            if let Some(remapped) = remap_reference(
                ledger,
                input_root,
                include_file,
                literal,
                relative_to_changelog,
            ) {
                include["file"] = Value::String(remapped);
            }
        }

        let mut rendered =
            serde_json::to_string_pretty(&document).map_err(|e| malformed(e.to_string()))?;
        rendered.push('\n');
        std::fs::write(destination, rendered).map_err(|source| RewriteError::Write {
            path: destination.to_path_buf(),
            source,
        })
    }
}

fn is_truthy(value: &Value) -> bool {
    value.as_bool() == Some(true) || value.as_str() == Some("true")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const CHANGELOG: &str = r#"{
  "databaseChangeLog": [
    { "include": { "file": "a.json" } },
    { "include": { "file": "sub/b.json", "relativeToChangelogFile": false } },
    { "include": { "file": "unknown.json" } },
    { "includeAll": { "path": "sub" } }
  ]
}"#;

    #[test]
    fn test_rewrites_matching_includes() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("root.json");
        std::fs::write(&root, CHANGELOG).unwrap();
        let destination = dir.path().join("root.out.json");

        let mut ledger = RewriteLedger::default();
        ledger.record(dir.path().join("a.json"), dir.path().join("a.xml"));
        ledger.record(dir.path().join("sub/b.json"), dir.path().join("sub/b.xml"));

        JsonIncludeRewriter
            .rewrite(&ledger, dir.path(), &root, &destination)
            .unwrap();

        let rewritten = std::fs::read_to_string(&destination).unwrap();
        assert!(rewritten.contains(r#""file": "a.xml""#));
        assert!(rewritten.contains(r#""file": "sub/b.xml""#));
        assert!(rewritten.contains(r#""file": "unknown.json""#));
        assert!(rewritten.contains(r#""path": "sub""#));
    }

    #[test]
    fn test_malformed_json_is_an_error() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("root.json");
        std::fs::write(&root, "{ broken").unwrap();

        let result = JsonIncludeRewriter.rewrite(
            &RewriteLedger::default(),
            dir.path(),
            &root,
            &dir.path().join("out.json"),
        );
        assert!(matches!(result, Err(RewriteError::Malformed { .. })));
    }
}
