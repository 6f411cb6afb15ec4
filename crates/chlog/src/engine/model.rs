//! Generic in-memory representation of a parsed changelog.
//!
//! Every codec parses into and serializes from this model, so a changelog can
//! be read in one format and written in any other. Entries that the converter
//! does not need to understand (preConditions, property, ...) are carried as
//! generic [`Entry::Directive`] values instead of being dropped.

use serde_json::Value;
use std::collections::BTreeMap;

/// A parsed changelog: an ordered list of top-level entries.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Changelog {
    pub entries: Vec<Entry>,
}

impl Changelog {
    /// Stamp every changeset with the file name the changelog is about to be
    /// written under, so identifiers inside the body match the new file.
    pub fn stamp_file_path(&mut self, file_name: &str) {
        for entry in &mut self.entries {
            if let Entry::ChangeSet(change_set) = entry {
                change_set.logical_file_path = Some(file_name.to_string());
            }
        }
    }

    /// The changesets of this changelog, in order.
    pub fn change_sets(&self) -> impl Iterator<Item = &ChangeSet> {
        self.entries.iter().filter_map(|entry| match entry {
            Entry::ChangeSet(change_set) => Some(change_set),
            Entry::Directive { .. } => None,
        })
    }
}

/// A top-level changelog entry.
#[derive(Debug, Clone, PartialEq)]
pub enum Entry {
    ChangeSet(ChangeSet),
    /// Any non-changeset entry (include, includeAll, preConditions, ...),
    /// kept as raw structured data.
    Directive { name: String, value: Value },
}

/// A single changeset.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChangeSet {
    pub id: String,
    pub author: String,
    /// Rewritten to the new file name before serialization.
    pub logical_file_path: Option<String>,
    /// Remaining scalar or structured attributes (context, labels, dbms, ...).
    pub attributes: BTreeMap<String, Value>,
    pub changes: Vec<Change>,
}

/// A single change operation inside a changeset, kept generically.
#[derive(Debug, Clone, PartialEq)]
pub struct Change {
    pub kind: String,
    pub value: Value,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_stamp_file_path_touches_only_change_sets() {
        let mut changelog = Changelog {
            entries: vec![
                Entry::ChangeSet(ChangeSet {
                    id: "1".into(),
                    author: "alice".into(),
                    ..Default::default()
                }),
                Entry::Directive {
                    name: "include".into(),
                    value: json!({"file": "other.xml"}),
                },
            ],
        };

        changelog.stamp_file_path("new.yaml");

        assert_eq!(
            changelog.change_sets().next().unwrap().logical_file_path,
            Some("new.yaml".to_string())
        );
        assert!(matches!(
            &changelog.entries[1],
            Entry::Directive { name, .. } if name == "include"
        ));
    }
}
