//! Rewriting include references inside deferred changelogs.
//!
//! Changelogs that reference other changelogs are written out after the rest
//! of the tree, so every rename is known. Each supported syntax has its own
//! rewriter; all of them share the reference-matching logic in
//! [`remap_reference`].

mod json;
mod xml;
mod yaml;

use crate::convert::RewriteLedger;
use regex::Regex;
use std::path::{Component, Path, PathBuf};
use std::sync::OnceLock;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RewriteError {
    #[error("failed to read '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to write '{}': {source}", path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("malformed {syntax} changelog '{}': {message}", path.display())]
    Malformed {
        syntax: &'static str,
        path: PathBuf,
        message: String,
    },
}

/// Detects and rewrites include references for one changelog syntax.
pub trait IncludeRewriter {
    /// The include-detection pattern applied to raw file content.
    fn pattern(&self) -> &'static Regex;

    /// Cheap raw-text scan deciding whether a file must be deferred. Files
    /// that cannot be read are treated as include-free; conversion will
    /// surface the IO error later.
    fn has_includes(&self, path: &Path) -> bool {
        match std::fs::read_to_string(path) {
            Ok(content) => self.pattern().is_match(&content),
            Err(e) => {
                tracing::warn!(
                    "error reading file for reading includes in file '{}': {e}",
                    path.display()
                );
                false
            }
        }
    }

    /// Rewrite every include reference of `include_file` against the ledger
    /// and write the result to `destination`. References that match no ledger
    /// entry are left untouched.
    fn rewrite(
        &self,
        ledger: &RewriteLedger,
        input_root: &Path,
        include_file: &Path,
        destination: &Path,
    ) -> Result<(), RewriteError>;
}

/// The rewriter responsible for the given file, by extension.
pub fn rewriter_for(path: &Path) -> Option<&'static dyn IncludeRewriter> {
    let extension = path.extension()?.to_str()?;
    if extension.eq_ignore_ascii_case("xml") {
        Some(&xml::XmlIncludeRewriter)
    } else if extension.eq_ignore_ascii_case("yaml") {
        Some(&yaml::YamlIncludeRewriter)
    } else if extension.eq_ignore_ascii_case("json") {
        Some(&json::JsonIncludeRewriter)
    } else {
        None
    }
}

pub(crate) fn xml_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<\s*(include|includeAll)").unwrap())
}

pub(crate) fn yaml_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"-\s*(include|includeAll)\s*:").unwrap())
}

pub(crate) fn json_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#""(include|includeAll)"\s*:\s*\{"#).unwrap())
}

/// Map one include literal through the ledger.
///
/// The literal is compared against every renamed path, relativized against the
/// lookup basis: the include file's own directory when
/// `relative_to_changelog` is set, the input root otherwise. On a match only
/// the file-name component of the literal is replaced, so directory segments
/// written by the author survive. `None` means the literal matched nothing
/// and must be passed through unchanged.
pub(crate) fn remap_reference(
    ledger: &RewriteLedger,
    input_root: &Path,
    include_file: &Path,
    literal: &str,
    relative_to_changelog: bool,
) -> Option<String> {
    let basis = if relative_to_changelog {
        include_file.parent()?
    } else {
        input_root
    };

    for (old_path, new_path) in ledger.entries() {
        if relative_slash_path(basis, old_path) != literal {
            continue;
        }
        let old_name = old_path.file_name()?.to_str()?;
        let new_name = new_path.file_name()?.to_str()?;
        return Some(literal.replace(old_name, new_name));
    }
    None
}

/// The path of `target` relative to `base`, slash-separated regardless of
/// platform. Both paths must be absolute or share the same anchor.
pub(crate) fn relative_slash_path(base: &Path, target: &Path) -> String {
    let base_parts: Vec<Component<'_>> = base.components().collect();
    let target_parts: Vec<Component<'_>> = target.components().collect();

    let mut shared = 0;
    while shared < base_parts.len()
        && shared < target_parts.len()
        && base_parts[shared] == target_parts[shared]
    {
        shared += 1;
    }

    let mut segments: Vec<String> = Vec::new();
    for _ in shared..base_parts.len() {
        segments.push("..".to_string());
    }
    for part in &target_parts[shared..] {
        segments.push(part.as_os_str().to_string_lossy().into_owned());
    }
    segments.join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relative_slash_path() {
        assert_eq!(
            relative_slash_path(Path::new("/in"), Path::new("/in/a.xml")),
            "a.xml"
        );
        assert_eq!(
            relative_slash_path(Path::new("/in"), Path::new("/in/sub/a.xml")),
            "sub/a.xml"
        );
        assert_eq!(
            relative_slash_path(Path::new("/in/sub"), Path::new("/in/a.xml")),
            "../a.xml"
        );
        assert_eq!(
            relative_slash_path(Path::new("/in/x/y"), Path::new("/in/z/a.xml")),
            "../../z/a.xml"
        );
    }

    #[test]
    fn test_remap_reference_against_input_root() {
        let mut ledger = RewriteLedger::default();
        ledger.record("/in/sub/a.xml".into(), "/out/sub/a.yaml".into());

        let remapped = remap_reference(
            &ledger,
            Path::new("/in"),
            Path::new("/in/root.xml"),
            "sub/a.xml",
            false,
        );
        assert_eq!(remapped.as_deref(), Some("sub/a.yaml"));
    }

    #[test]
    fn test_remap_reference_relative_to_changelog_file() {
        let mut ledger = RewriteLedger::default();
        ledger.record("/in/a.xml".into(), "/out/a.yaml".into());

        let remapped = remap_reference(
            &ledger,
            Path::new("/in"),
            Path::new("/in/sub/root.xml"),
            "../a.xml",
            true,
        );
        assert_eq!(remapped.as_deref(), Some("../a.yaml"));
    }

    #[test]
    fn test_remap_reference_passes_through_unknown_literals() {
        let mut ledger = RewriteLedger::default();
        ledger.record("/in/a.xml".into(), "/out/a.yaml".into());

        // wrong case and unrelated files match nothing
        for literal in ["A.xml", "other.xml", "sub/a.xml"] {
            let remapped = remap_reference(
                &ledger,
                Path::new("/in"),
                Path::new("/in/root.xml"),
                literal,
                false,
            );
            assert_eq!(remapped, None, "literal {literal:?} must pass through");
        }
    }

    #[test]
    fn test_remap_reference_first_ledger_entry_wins() {
        let mut ledger = RewriteLedger::default();
        ledger.record("/in/a.xml".into(), "/out/a.yaml".into());
        ledger.record("/in/a.xml".into(), "/out/a.json".into());

        let remapped = remap_reference(
            &ledger,
            Path::new("/in"),
            Path::new("/in/root.xml"),
            "a.xml",
            false,
        );
        assert_eq!(remapped.as_deref(), Some("a.yaml"));
    }

    #[test]
    fn test_rewriter_for_extension() {
        assert!(rewriter_for(Path::new("a.xml")).is_some());
        assert!(rewriter_for(Path::new("a.YAML")).is_some());
        assert!(rewriter_for(Path::new("a.json")).is_some());
        assert!(rewriter_for(Path::new("a.sql")).is_none());
        assert!(rewriter_for(Path::new("a")).is_none());
    }

    #[test]
    fn test_detection_patterns() {
        assert!(xml_pattern().is_match(r#"<include file="a.xml"/>"#));
        assert!(xml_pattern().is_match("< includeAll path=\"dir\"/>"));
        assert!(!xml_pattern().is_match("<changeSet id=\"1\"/>"));

        assert!(yaml_pattern().is_match("- include:\n    file: a.yaml"));
        assert!(yaml_pattern().is_match("-   includeAll :"));
        assert!(!yaml_pattern().is_match("include: a.yaml"));

        assert!(json_pattern().is_match(r#""include": {"file": "a.json"}"#));
        assert!(json_pattern().is_match(r#""includeAll":{"path": "dir"}"#));
        assert!(!json_pattern().is_match(r#""file": "include.json""#));
    }
}
