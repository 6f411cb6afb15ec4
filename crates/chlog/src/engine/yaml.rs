//! YAML codec. Delegates the document mapping to the JSON codec; the two
//! formats share the `databaseChangeLog` structure.

use super::model::Changelog;
use super::{json, EngineError};
use crate::format::Format;
use serde_json::Value;

pub(super) fn parse(name: &str, bytes: &[u8]) -> Result<Changelog, EngineError> {
    let document: Value = serde_yaml::from_slice(bytes).map_err(|e| EngineError::Parse {
        format: Format::Yaml,
        name: name.to_string(),
        message: e.to_string(),
    })?;
    json::from_document(&document).map_err(|message| EngineError::Parse {
        format: Format::Yaml,
        name: name.to_string(),
        message,
    })
}

pub(super) fn serialize(changelog: &Changelog) -> Result<Vec<u8>, EngineError> {
    let document = json::to_document(changelog);
    let rendered = serde_yaml::to_string(&document).map_err(|e| EngineError::Serialize {
        format: Format::Yaml,
        message: e.to_string(),
    })?;
    Ok(rendered.into_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const YAML_CHANGELOG: &str = r#"databaseChangeLog:
  - changeSet:
      id: "1"
      author: bob
      context: testing
      changes:
        - sql:
            sql: CREATE TABLE person (id INT);
  - include:
      file: other.yaml
      relativeToChangelogFile: true
"#;

    #[test]
    fn test_parse_yaml_changelog() {
        let changelog = parse("changelog.yaml", YAML_CHANGELOG.as_bytes()).unwrap();
        let change_set = changelog.change_sets().next().unwrap();
        assert_eq!(change_set.id, "1");
        assert_eq!(change_set.author, "bob");
        assert_eq!(change_set.attributes["context"], json!("testing"));
        assert_eq!(change_set.changes[0].kind, "sql");
    }

    #[test]
    fn test_round_trip_preserves_model() {
        let changelog = parse("changelog.yaml", YAML_CHANGELOG.as_bytes()).unwrap();
        let rendered = serialize(&changelog).unwrap();
        let reparsed = parse("changelog.yaml", &rendered).unwrap();
        assert_eq!(changelog, reparsed);
    }

    #[test]
    fn test_parse_rejects_invalid_yaml() {
        let err = parse("bad.yaml", b"{ not yaml: [").unwrap_err();
        assert!(matches!(err, EngineError::Parse { .. }));
    }
}
