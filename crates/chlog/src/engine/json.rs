//! JSON codec. Also hosts the document mapping shared with the YAML codec,
//! since both formats carry the same `databaseChangeLog` structure.

use super::model::{Change, ChangeSet, Changelog, Entry};
use super::EngineError;
use crate::format::Format;
use serde_json::{json, Map, Value};

pub(super) fn parse(name: &str, bytes: &[u8]) -> Result<Changelog, EngineError> {
    let document: Value = serde_json::from_slice(bytes).map_err(|e| EngineError::Parse {
        format: Format::Json,
        name: name.to_string(),
        message: e.to_string(),
    })?;
    from_document(&document).map_err(|message| EngineError::Parse {
        format: Format::Json,
        name: name.to_string(),
        message,
    })
}

pub(super) fn serialize(changelog: &Changelog) -> Result<Vec<u8>, EngineError> {
    let document = to_document(changelog);
    let mut rendered =
        serde_json::to_string_pretty(&document).map_err(|e| EngineError::Serialize {
            format: Format::Json,
            message: e.to_string(),
        })?;
    rendered.push('\n');
    Ok(rendered.into_bytes())
}

/// Map a `databaseChangeLog` document into the generic model.
pub(super) fn from_document(document: &Value) -> Result<Changelog, String> {
    let items = document
        .get("databaseChangeLog")
        .and_then(Value::as_array)
        .ok_or_else(|| "missing 'databaseChangeLog' array".to_string())?;

    let mut entries = Vec::with_capacity(items.len());
    for item in items {
        let object = item
            .as_object()
            .ok_or_else(|| "changelog entries must be objects".to_string())?;
        let (key, value) = object
            .iter()
            .next()
            .ok_or_else(|| "empty changelog entry".to_string())?;
        if key == "changeSet" {
            entries.push(Entry::ChangeSet(change_set_from_value(value)?));
        } else {
            entries.push(Entry::Directive {
                name: key.clone(),
                value: value.clone(),
            });
        }
    }
    Ok(Changelog { entries })
}

/// Map the generic model back into a `databaseChangeLog` document.
pub(super) fn to_document(changelog: &Changelog) -> Value {
    let items: Vec<Value> = changelog
        .entries
        .iter()
        .map(|entry| match entry {
            Entry::ChangeSet(change_set) => json!({ "changeSet": change_set_to_value(change_set) }),
            Entry::Directive { name, value } => {
                let mut object = Map::new();
                object.insert(name.clone(), value.clone());
                Value::Object(object)
            }
        })
        .collect();
    json!({ "databaseChangeLog": items })
}

fn change_set_from_value(value: &Value) -> Result<ChangeSet, String> {
    let object = value
        .as_object()
        .ok_or_else(|| "'changeSet' must be an object".to_string())?;

    let mut change_set = ChangeSet::default();
    for (key, value) in object {
        match key.as_str() {
            "id" => change_set.id = scalar_string(value),
            "author" => change_set.author = scalar_string(value),
            "logicalFilePath" => change_set.logical_file_path = Some(scalar_string(value)),
            "changes" => {
                let changes = value
                    .as_array()
                    .ok_or_else(|| "'changes' must be an array".to_string())?;
                for change in changes {
                    let object = change
                        .as_object()
                        .ok_or_else(|| "each change must be an object".to_string())?;
                    let (kind, value) = object
                        .iter()
                        .next()
                        .ok_or_else(|| "empty change entry".to_string())?;
                    change_set.changes.push(Change {
                        kind: kind.clone(),
                        value: value.clone(),
                    });
                }
            }
            _ => {
                change_set.attributes.insert(key.clone(), value.clone());
            }
        }
    }
    Ok(change_set)
}

fn change_set_to_value(change_set: &ChangeSet) -> Value {
    let mut object = Map::new();
    object.insert("id".to_string(), Value::String(change_set.id.clone()));
    object.insert(
        "author".to_string(),
        Value::String(change_set.author.clone()),
    );
    if let Some(path) = &change_set.logical_file_path {
        object.insert("logicalFilePath".to_string(), Value::String(path.clone()));
    }
    for (key, value) in &change_set.attributes {
        object.insert(key.clone(), value.clone());
    }
    let changes: Vec<Value> = change_set
        .changes
        .iter()
        .map(|change| {
            let mut object = Map::new();
            object.insert(change.kind.clone(), change.value.clone());
            Value::Object(object)
        })
        .collect();
    object.insert("changes".to_string(), Value::Array(changes));
    Value::Object(object)
}

fn scalar_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const JSON_CHANGELOG: &str = r#"{
  "databaseChangeLog": [
    {
      "changeSet": {
        "id": 1,
        "author": "alice",
        "context": "dev",
        "changes": [
          { "createTable": { "tableName": "person" } }
        ]
      }
    },
    {
      "include": { "file": "other.json", "relativeToChangelogFile": true }
    }
  ]
}"#;

    #[test]
    fn test_parse_change_set_and_directive() {
        let changelog = parse("changelog.json", JSON_CHANGELOG.as_bytes()).unwrap();
        assert_eq!(changelog.entries.len(), 2);

        let change_set = changelog.change_sets().next().unwrap();
        // numeric ids are normalized to strings
        assert_eq!(change_set.id, "1");
        assert_eq!(change_set.author, "alice");
        assert_eq!(change_set.attributes["context"], json!("dev"));
        assert_eq!(change_set.changes[0].kind, "createTable");

        match &changelog.entries[1] {
            Entry::Directive { name, value } => {
                assert_eq!(name, "include");
                assert_eq!(value["file"], json!("other.json"));
            }
            other => panic!("expected directive, got {other:?}"),
        }
    }

    #[test]
    fn test_serialize_round_trip() {
        let changelog = parse("changelog.json", JSON_CHANGELOG.as_bytes()).unwrap();
        let rendered = serialize(&changelog).unwrap();
        let reparsed = parse("changelog.json", &rendered).unwrap();
        assert_eq!(changelog, reparsed);
    }

    #[test]
    fn test_parse_rejects_non_changelog_document() {
        let err = parse("bogus.json", br#"{"foo": 1}"#).unwrap_err();
        assert!(err.to_string().contains("databaseChangeLog"));
    }
}
