//! Include rewriting for XML changelogs.
//!
//! Works on the event stream instead of a parsed tree so everything outside
//! the `include` tags (comments, whitespace, attribute order) survives
//! byte-for-byte.

use super::{remap_reference, xml_pattern, IncludeRewriter, RewriteError};
use crate::convert::RewriteLedger;
use quick_xml::events::{BytesStart, Event};
use quick_xml::{Reader, Writer};
use regex::Regex;
use std::io::Cursor;
use std::path::Path;

pub(super) struct XmlIncludeRewriter;

impl IncludeRewriter for XmlIncludeRewriter {
    fn pattern(&self) -> &'static Regex {
        xml_pattern()
    }

    fn rewrite(
        &self,
        ledger: &RewriteLedger,
        input_root: &Path,
        include_file: &Path,
        destination: &Path,
    ) -> Result<(), RewriteError> {
        let content = std::fs::read_to_string(include_file).map_err(|source| {
            RewriteError::Read {
                path: include_file.to_path_buf(),
                source,
            }
        })?;
        let malformed = |message: String| RewriteError::Malformed {
            syntax: "XML",
            path: include_file.to_path_buf(),
            message,
        };

        let mut reader = Reader::from_str(&content);
        let mut writer = Writer::new(Cursor::new(Vec::new()));
        loop {
            let event = reader.read_event().map_err(|e| malformed(e.to_string()))?;
            let written = match event {
                Event::Eof => break,
                Event::Start(start) if start.local_name().as_ref() == b"include" => {
                    let rewritten =
                        rewrite_include_tag(&start, ledger, input_root, include_file)
                            .map_err(&malformed)?;
                    writer.write_event(Event::Start(rewritten))
                }
                Event::Empty(start) if start.local_name().as_ref() == b"include" => {
                    let rewritten =
                        rewrite_include_tag(&start, ledger, input_root, include_file)
                            .map_err(&malformed)?;
                    writer.write_event(Event::Empty(rewritten))
                }
                other => writer.write_event(other),
            };
            written.map_err(|e| malformed(e.to_string()))?;
        }

        std::fs::write(destination, writer.into_inner().into_inner()).map_err(|source| {
            RewriteError::Write {
                path: destination.to_path_buf(),
                source,
            }
        })
    }
}

/// Rebuild an `include` tag with its `file` attribute mapped through the
/// ledger. All other attributes are carried over untouched.
fn rewrite_include_tag(
    start: &BytesStart<'_>,
    ledger: &RewriteLedger,
    input_root: &Path,
    include_file: &Path,
) -> Result<BytesStart<'static>, String> {
    let mut relative_to_changelog = false;
    for attribute in start.attributes() {
        let attribute = attribute.map_err(|e| e.to_string())?;
        if attribute.key.as_ref() == b"relativeToChangelogFile" {
            let value = attribute.unescape_value().map_err(|e| e.to_string())?;
            relative_to_changelog = value == "true";
        }
    }

    let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
    let mut rewritten = BytesStart::new(name);
    for attribute in start.attributes() {
        let attribute = attribute.map_err(|e| e.to_string())?;
        let key = String::from_utf8_lossy(attribute.key.as_ref()).into_owned();
        let value = attribute
            .unescape_value()
            .map_err(|e| e.to_string())?
            .into_owned();
        let value = if key == "file" {
            remap_reference(ledger, input_root, include_file, &value, relative_to_changelog)
                .unwrap_or(value)
        } else {
            value
        };
        rewritten.push_attribute((key.as_str(), value.as_str()));
    }
    Ok(rewritten)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const CHANGELOG: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<databaseChangeLog xmlns="http://www.liquibase.org/xml/ns/dbchangelog">
    <!-- keep me -->
    <include file="a.xml"/>
    <include file="sub/b.xml" relativeToChangelogFile="true"/>
    <include file="unknown.xml"/>
    <includeAll path="sub"/>
</databaseChangeLog>
"#;

    #[test]
    fn test_rewrites_matching_includes_and_keeps_the_rest() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("root.xml");
        std::fs::write(&root, CHANGELOG).unwrap();
        let destination = dir.path().join("root.out.xml");

        let mut ledger = RewriteLedger::default();
        ledger.record(dir.path().join("a.xml"), dir.path().join("a.yaml"));
        ledger.record(dir.path().join("sub/b.xml"), dir.path().join("sub/b.yaml"));

        XmlIncludeRewriter
            .rewrite(&ledger, dir.path(), &root, &destination)
            .unwrap();

        let rewritten = std::fs::read_to_string(&destination).unwrap();
        assert!(rewritten.contains(r#"<include file="a.yaml"/>"#));
        assert!(rewritten.contains(r#"<include file="sub/b.yaml" relativeToChangelogFile="true"/>"#));
        // unmatched references and includeAll directories pass through
        assert!(rewritten.contains(r#"<include file="unknown.xml"/>"#));
        assert!(rewritten.contains(r#"<includeAll path="sub"/>"#));
        assert!(rewritten.contains("<!-- keep me -->"));
    }

    #[test]
    fn test_malformed_xml_is_an_error() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("root.xml");
        std::fs::write(&root, "<databaseChangeLog><include file='a.xml'").unwrap();

        let result = XmlIncludeRewriter.rewrite(
            &RewriteLedger::default(),
            dir.path(),
            &root,
            &dir.path().join("out.xml"),
        );
        assert!(matches!(result, Err(RewriteError::Malformed { .. })));
    }

    #[test]
    fn test_has_includes_detection() {
        let dir = TempDir::new().unwrap();
        let with = dir.path().join("with.xml");
        std::fs::write(&with, CHANGELOG).unwrap();
        let without = dir.path().join("without.xml");
        std::fs::write(&without, "<databaseChangeLog/>").unwrap();

        assert!(XmlIncludeRewriter.has_includes(&with));
        assert!(!XmlIncludeRewriter.has_includes(&without));
        assert!(!XmlIncludeRewriter.has_includes(&dir.path().join("missing.xml")));
    }
}
