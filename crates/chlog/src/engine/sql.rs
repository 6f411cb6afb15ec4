//! Formatted-SQL codec.
//!
//! Reads and writes the comment-annotated SQL dialect: a `-- liquibase
//! formatted sql` header, `-- changeset author:id` markers with optional
//! `key:value` attributes, raw statements as the changeset body and
//! `-- rollback` lines. Structured changes other than raw `sql`/`rollback`
//! cannot be rendered as SQL and turn into a serialize error.

use super::model::{Change, ChangeSet, Changelog, Entry};
use super::EngineError;
use crate::format::Format;
use regex::Regex;
use serde_json::Value;
use std::fmt::Write as _;
use std::sync::OnceLock;

fn header_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)^--\s*liquibase\s+formatted\s+sql\b").unwrap())
}

fn change_set_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)^--\s*changeset\s+([^:\s]+):(\S+)\s*(.*)$").unwrap())
}

fn attribute_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"(\w+):("[^"]*"|\S+)"#).unwrap())
}

fn rollback_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)^--\s*rollback\s?(.*)$").unwrap())
}

pub(super) fn parse(name: &str, bytes: &[u8]) -> Result<Changelog, EngineError> {
    let parse_error = |message: String| EngineError::Parse {
        format: Format::Sql,
        name: name.to_string(),
        message,
    };

    let text = std::str::from_utf8(bytes).map_err(|e| parse_error(e.to_string()))?;

    let mut entries: Vec<Entry> = Vec::new();
    let mut current: Option<(ChangeSet, String, Vec<String>)> = None;
    let mut saw_header = false;

    for (number, line) in text.lines().enumerate() {
        if !saw_header {
            if line.trim().is_empty() {
                continue;
            }
            if header_re().is_match(line) {
                saw_header = true;
                continue;
            }
            return Err(parse_error(
                "missing '-- liquibase formatted sql' header".to_string(),
            ));
        }

        if let Some(captures) = change_set_re().captures(line) {
            if let Some(pending) = current.take() {
                entries.push(Entry::ChangeSet(finish_change_set(pending)));
            }
            let mut change_set = ChangeSet {
                author: captures[1].to_string(),
                id: captures[2].to_string(),
                ..Default::default()
            };
            for attribute in attribute_re().captures_iter(&captures[3]) {
                let key = attribute[1].to_string();
                let value = attribute[2].trim_matches('"').to_string();
                if key == "logicalFilePath" {
                    change_set.logical_file_path = Some(value);
                } else {
                    change_set.attributes.insert(key, Value::String(value));
                }
            }
            current = Some((change_set, String::new(), Vec::new()));
            continue;
        }

        if let Some((_, _, rollbacks)) = current.as_mut() {
            if let Some(captures) = rollback_re().captures(line) {
                rollbacks.push(captures[1].to_string());
                continue;
            }
        }

        if line.trim_start().starts_with("--") {
            continue;
        }

        match current.as_mut() {
            Some((_, body, _)) => {
                body.push_str(line);
                body.push('\n');
            }
            None => {
                if !line.trim().is_empty() {
                    return Err(parse_error(format!(
                        "statement outside of a changeset at line {}",
                        number + 1
                    )));
                }
            }
        }
    }

    if let Some(pending) = current.take() {
        entries.push(Entry::ChangeSet(finish_change_set(pending)));
    }
    if !saw_header {
        return Err(parse_error(
            "missing '-- liquibase formatted sql' header".to_string(),
        ));
    }
    Ok(Changelog { entries })
}

fn finish_change_set((mut change_set, body, rollbacks): (ChangeSet, String, Vec<String>)) -> ChangeSet {
    let body = body.trim().to_string();
    if !body.is_empty() {
        change_set.changes.push(Change {
            kind: "sql".to_string(),
            value: Value::String(body),
        });
    }
    for rollback in rollbacks {
        change_set.changes.push(Change {
            kind: "rollback".to_string(),
            value: Value::String(rollback.trim().to_string()),
        });
    }
    change_set
}

pub(super) fn serialize(changelog: &Changelog) -> Result<Vec<u8>, EngineError> {
    let serialize_error = |message: String| EngineError::Serialize {
        format: Format::Sql,
        message,
    };

    let mut rendered = String::from("-- liquibase formatted sql\n");
    for entry in &changelog.entries {
        let change_set = match entry {
            Entry::ChangeSet(change_set) => change_set,
            Entry::Directive { name, .. } => {
                return Err(serialize_error(format!(
                    "'{name}' entries cannot be represented in formatted SQL"
                )));
            }
        };

        let _ = write!(rendered, "\n-- changeset {}:{}", change_set.author, change_set.id);
        if let Some(path) = &change_set.logical_file_path {
            let _ = write!(rendered, " logicalFilePath:{}", attribute_text(path));
        }
        for (key, value) in &change_set.attributes {
            match value {
                Value::String(text) => {
                    let _ = write!(rendered, " {key}:{}", attribute_text(text));
                }
                Value::Bool(flag) => {
                    let _ = write!(rendered, " {key}:{flag}");
                }
                Value::Number(number) => {
                    let _ = write!(rendered, " {key}:{number}");
                }
                _ => {
                    return Err(serialize_error(format!(
                        "attribute '{key}' is not a scalar and cannot be rendered as SQL"
                    )));
                }
            }
        }
        rendered.push('\n');

        for change in &change_set.changes {
            match change.kind.as_str() {
                "sql" => {
                    let body = raw_sql(&change.value).ok_or_else(|| {
                        serialize_error("'sql' change carries no statement text".to_string())
                    })?;
                    rendered.push_str(body.trim_end());
                    rendered.push('\n');
                }
                "rollback" => {
                    let body = raw_sql(&change.value).ok_or_else(|| {
                        serialize_error("'rollback' change carries no statement text".to_string())
                    })?;
                    let _ = writeln!(rendered, "-- rollback {}", body.trim());
                }
                other => {
                    return Err(serialize_error(format!(
                        "'{other}' changes cannot be represented in formatted SQL"
                    )));
                }
            }
        }
    }
    Ok(rendered.into_bytes())
}

/// Wrap attribute values containing whitespace in quotes.
fn attribute_text(value: &str) -> String {
    if value.chars().any(char::is_whitespace) {
        format!("\"{value}\"")
    } else {
        value.to_string()
    }
}

/// The statement text of a raw `sql`/`rollback` change, whether it was parsed
/// from SQL directly or carried over from a structured format.
fn raw_sql(value: &Value) -> Option<&str> {
    match value {
        Value::String(text) => Some(text),
        Value::Object(object) => object.get("sql").and_then(Value::as_str),
        _ => None,
    }
}
