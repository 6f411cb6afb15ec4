//! The changelog formats supported for converting.

use clap::ValueEnum;
use std::ffi::OsStr;
use std::fmt;
use std::path::Path;

/// A changelog serialization format, identified by its file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum)]
pub enum Format {
    Xml,
    Yaml,
    Json,
    Sql,
}

impl Format {
    /// All supported formats.
    pub const ALL: [Format; 4] = [Format::Xml, Format::Yaml, Format::Json, Format::Sql];

    /// The file extension (without dot) that files of this format carry.
    pub fn extension(self) -> &'static str {
        match self {
            Format::Xml => "xml",
            Format::Yaml => "yaml",
            Format::Json => "json",
            Format::Sql => "sql",
        }
    }

    /// Look up a format by file extension, case-insensitively.
    pub fn from_extension(extension: &str) -> Option<Format> {
        Format::ALL
            .into_iter()
            .find(|format| format.extension().eq_ignore_ascii_case(extension))
    }

    /// Look up a format from a file path's extension.
    pub fn from_path(path: &Path) -> Option<Format> {
        path.extension()
            .and_then(OsStr::to_str)
            .and_then(Format::from_extension)
    }

    /// Whether the given extension already matches this format.
    pub fn matches_extension(self, extension: &str) -> bool {
        self.extension().eq_ignore_ascii_case(extension)
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.extension())
    }
}
