//! Include rewriting for YAML changelogs.

use super::{remap_reference, yaml_pattern, IncludeRewriter, RewriteError};
use crate::convert::RewriteLedger;
use regex::Regex;
use serde_yaml::Value;
use std::path::Path;

pub(super) struct YamlIncludeRewriter;

impl IncludeRewriter for YamlIncludeRewriter {
    fn pattern(&self) -> &'static Regex {
        yaml_pattern()
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
            syntax: "YAML",
            path: include_file.to_path_buf(),
            message,
        };

        let mut document: Value =
            serde_yaml::from_slice(&content).map_err(|e| malformed(e.to_string()))?;

        let entries = document
            .get_mut("databaseChangeLog")
            .and_then(Value::as_sequence_mut)
            .ok_or_else(|| malformed("missing 'databaseChangeLog' sequence".to_string()))?;
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

        let rendered = serde_yaml::to_string(&document).map_err(|e| malformed(e.to_string()))?;
        std::fs::write(destination, rendered).map_err(|source| RewriteError::Write {
            path: destination.to_path_buf(),
            source,
        })
    }
}

fn is_truthy(value: &Value) -> bool {
    value.as_bool() == Some(true) || value.as_str() == Some("true")
}
