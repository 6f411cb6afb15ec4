//! XML codec.
//!
//! Elements are mapped onto the generic value model: attributes become scalar
//! object entries, child elements become nested objects (arrays when a tag
//! repeats) and text content is kept under the `value` key. The reverse
//! mapping turns scalars back into attributes and nested values back into
//! child elements, which is how changelog XML is conventionally shaped.

use super::model::{Change, ChangeSet, Changelog, Entry};
use super::EngineError;
use crate::format::Format;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use serde_json::{Map, Value};
use std::io::Cursor;

const XMLNS: &str = "http://www.liquibase.org/xml/ns/dbchangelog";
const XMLNS_XSI: &str = "http://www.w3.org/2001/XMLSchema-instance";
const SCHEMA_LOCATION: &str =
    "http://www.liquibase.org/xml/ns/dbchangelog http://www.liquibase.org/xml/ns/dbchangelog/dbchangelog-latest.xsd";

pub(super) fn parse(name: &str, bytes: &[u8]) -> Result<Changelog, EngineError> {
    let parse_error = |message: String| EngineError::Parse {
        format: Format::Xml,
        name: name.to_string(),
        message,
    };

    let root = parse_tree(bytes).map_err(parse_error)?;
    if root.name != "databaseChangeLog" {
        return Err(parse_error(format!(
            "root element must be 'databaseChangeLog', found '{}'",
            root.name
        )));
    }

    let mut entries = Vec::with_capacity(root.children.len());
    for child in &root.children {
        if child.name == "changeSet" {
            entries.push(Entry::ChangeSet(change_set_from_element(child)));
        } else {
            entries.push(Entry::Directive {
                name: child.name.clone(),
                value: element_to_value(child),
            });
        }
    }
    Ok(Changelog { entries })
}

pub(super) fn serialize(changelog: &Changelog) -> Result<Vec<u8>, EngineError> {
    let serialize_error = |message: String| EngineError::Serialize {
        format: Format::Xml,
        message,
    };

    let mut writer = Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 4);
    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
        .map_err(|e| serialize_error(e.to_string()))?;

    let mut root = BytesStart::new("databaseChangeLog");
    root.push_attribute(("xmlns", XMLNS));
    root.push_attribute(("xmlns:xsi", XMLNS_XSI));
    root.push_attribute(("xsi:schemaLocation", SCHEMA_LOCATION));
    writer
        .write_event(Event::Start(root))
        .map_err(|e| serialize_error(e.to_string()))?;

    for entry in &changelog.entries {
        match entry {
            Entry::ChangeSet(change_set) => {
                write_change_set(&mut writer, change_set).map_err(&serialize_error)?
            }
            Entry::Directive { name, value } => {
                write_value_element(&mut writer, name, value).map_err(&serialize_error)?
            }
        }
    }

    writer
        .write_event(Event::End(BytesEnd::new("databaseChangeLog")))
        .map_err(|e| serialize_error(e.to_string()))?;

    let mut rendered = writer.into_inner().into_inner();
    rendered.push(b'\n');
    Ok(rendered)
}

/// A raw element tree, the intermediate step between XML events and the model.
struct XmlElement {
    name: String,
    attributes: Vec<(String, String)>,
    children: Vec<XmlElement>,
    text: String,
}

fn parse_tree(bytes: &[u8]) -> Result<XmlElement, String> {
    let text = std::str::from_utf8(bytes).map_err(|e| e.to_string())?;
    let mut reader = Reader::from_str(text);
    let mut stack: Vec<XmlElement> = Vec::new();
    let mut root: Option<XmlElement> = None;

    loop {
        match reader.read_event().map_err(|e| e.to_string())? {
            Event::Start(start) => stack.push(element_from_start(&start)?),
            Event::Empty(start) => {
                let element = element_from_start(&start)?;
                attach(&mut stack, &mut root, element)?;
            }
            Event::End(_) => {
                let element = stack.pop().ok_or_else(|| "unbalanced end tag".to_string())?;
                attach(&mut stack, &mut root, element)?;
            }
            Event::Text(text) => {
                if let Some(top) = stack.last_mut() {
                    top.text.push_str(&text.unescape().map_err(|e| e.to_string())?);
                }
            }
            Event::CData(data) => {
                if let Some(top) = stack.last_mut() {
                    top.text
                        .push_str(&String::from_utf8_lossy(&data.into_inner()));
                }
            }
            Event::Eof => break,
            // declaration, comments, processing instructions, doctype
            _ => {}
        }
    }

    if !stack.is_empty() {
        return Err("unclosed element".to_string());
    }
    root.ok_or_else(|| "no root element".to_string())
}

fn attach(
    stack: &mut [XmlElement],
    root: &mut Option<XmlElement>,
    element: XmlElement,
) -> Result<(), String> {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(element);
        Ok(())
    } else if root.is_none() {
        *root = Some(element);
        Ok(())
    } else {
        Err("multiple root elements".to_string())
    }
}

fn element_from_start(start: &BytesStart<'_>) -> Result<XmlElement, String> {
    // Namespace prefixes are dropped; the converter works on local names.
    let name = String::from_utf8_lossy(start.local_name().as_ref()).to_string();
    let mut attributes = Vec::new();
    for attribute in start.attributes() {
        let attribute = attribute.map_err(|e| e.to_string())?;
        let key = String::from_utf8_lossy(attribute.key.as_ref()).to_string();
        if key == "xmlns" || key.starts_with("xmlns:") || key.ends_with(":schemaLocation") {
            continue;
        }
        let value = attribute
            .unescape_value()
            .map_err(|e| e.to_string())?
            .to_string();
        attributes.push((key, value));
    }
    Ok(XmlElement {
        name,
        attributes,
        children: Vec::new(),
        text: String::new(),
    })
}

fn change_set_from_element(element: &XmlElement) -> ChangeSet {
    let mut change_set = ChangeSet::default();
    for (key, value) in &element.attributes {
        match key.as_str() {
            "id" => change_set.id = value.clone(),
            "author" => change_set.author = value.clone(),
            "logicalFilePath" => change_set.logical_file_path = Some(value.clone()),
            _ => {
                change_set
                    .attributes
                    .insert(key.clone(), Value::String(value.clone()));
            }
        }
    }
    for child in &element.children {
        change_set.changes.push(Change {
            kind: child.name.clone(),
            value: element_to_value(child),
        });
    }
    change_set
}

fn element_to_value(element: &XmlElement) -> Value {
    let text = element.text.trim();
    if element.attributes.is_empty() && element.children.is_empty() {
        return Value::String(text.to_string());
    }

    let mut object = Map::new();
    for (key, value) in &element.attributes {
        object.insert(key.clone(), Value::String(value.clone()));
    }
    for child in &element.children {
        let value = element_to_value(child);
        match object.get_mut(&child.name) {
            Some(Value::Array(items)) => items.push(value),
            Some(existing) => {
                let previous = existing.take();
                *existing = Value::Array(vec![previous, value]);
            }
            None => {
                object.insert(child.name.clone(), value);
            }
        }
    }
    if !text.is_empty() {
        object.insert("value".to_string(), Value::String(text.to_string()));
    }
    Value::Object(object)
}

fn write_change_set(
    writer: &mut Writer<Cursor<Vec<u8>>>,
    change_set: &ChangeSet,
) -> Result<(), String> {
    let mut start = BytesStart::new("changeSet");
    start.push_attribute(("id", change_set.id.as_str()));
    start.push_attribute(("author", change_set.author.as_str()));
    if let Some(path) = &change_set.logical_file_path {
        start.push_attribute(("logicalFilePath", path.as_str()));
    }

    let mut nested: Vec<(&String, &Value)> = Vec::new();
    for (key, value) in &change_set.attributes {
        match scalar_text(value) {
            Some(text) => start.push_attribute((key.as_str(), text.as_str())),
            None => nested.push((key, value)),
        }
    }

    if change_set.changes.is_empty() && nested.is_empty() {
        return writer
            .write_event(Event::Empty(start))
            .map_err(|e| e.to_string());
    }

    writer
        .write_event(Event::Start(start))
        .map_err(|e| e.to_string())?;
    for (key, value) in nested {
        write_value_element(writer, key, value)?;
    }
    for change in &change_set.changes {
        write_value_element(writer, &change.kind, &change.value)?;
    }
    writer
        .write_event(Event::End(BytesEnd::new("changeSet")))
        .map_err(|e| e.to_string())
}

fn write_value_element(
    writer: &mut Writer<Cursor<Vec<u8>>>,
    name: &str,
    value: &Value,
) -> Result<(), String> {
    match value {
        Value::Array(items) => {
            for item in items {
                write_value_element(writer, name, item)?;
            }
            Ok(())
        }
        Value::Object(object) => {
            let mut start = BytesStart::new(name);
            let mut text: Option<&str> = None;
            let mut children: Vec<(&String, &Value)> = Vec::new();
            for (key, value) in object {
                if key == "value" {
                    if let Value::String(body) = value {
                        text = Some(body.as_str());
                        continue;
                    }
                }
                match scalar_text(value) {
                    Some(scalar) => start.push_attribute((key.as_str(), scalar.as_str())),
                    None => children.push((key, value)),
                }
            }

            if text.is_none() && children.is_empty() {
                return writer
                    .write_event(Event::Empty(start))
                    .map_err(|e| e.to_string());
            }

            writer
                .write_event(Event::Start(start))
                .map_err(|e| e.to_string())?;
            if let Some(body) = text {
                writer
                    .write_event(Event::Text(BytesText::new(body)))
                    .map_err(|e| e.to_string())?;
            }
            for (key, value) in children {
                write_value_element(writer, key, value)?;
            }
            writer
                .write_event(Event::End(BytesEnd::new(name)))
                .map_err(|e| e.to_string())
        }
        Value::Null => writer
            .write_event(Event::Empty(BytesStart::new(name)))
            .map_err(|e| e.to_string()),
        scalar => {
            let body = scalar_text(scalar).unwrap_or_default();
            writer
                .write_event(Event::Start(BytesStart::new(name)))
                .map_err(|e| e.to_string())?;
            writer
                .write_event(Event::Text(BytesText::new(&body)))
                .map_err(|e| e.to_string())?;
            writer
                .write_event(Event::End(BytesEnd::new(name)))
                .map_err(|e| e.to_string())
        }
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
