//! The structured-document engine: parsing and serializing changelog bodies.
//!
//! The conversion pipeline only depends on the [`ChangelogEngine`] trait, so
//! tests can substitute a failing or recording engine. [`SerdeEngine`] is the
//! built-in implementation with one codec per supported format.

mod json;
pub mod model;
mod sql;
mod xml;
mod yaml;

pub use model::{Change, ChangeSet, Changelog, Entry};

use crate::format::Format;
use thiserror::Error;

/// Errors produced while parsing or serializing a changelog body.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("failed to parse {format} changelog '{name}': {message}")]
    Parse {
        format: Format,
        name: String,
        message: String,
    },

    #[error("failed to serialize changelog to {format}: {message}")]
    Serialize { format: Format, message: String },
}

/// Parses a changelog body into the generic model and serializes the model
/// into any supported target format.
pub trait ChangelogEngine {
    fn parse(&self, format: Format, name: &str, bytes: &[u8]) -> Result<Changelog, EngineError>;

    fn serialize(&self, changelog: &Changelog, target: Format) -> Result<Vec<u8>, EngineError>;
}

/// The built-in engine backed by serde_json, serde_yaml and quick-xml.
#[derive(Debug, Default, Clone, Copy)]
pub struct SerdeEngine;

impl ChangelogEngine for SerdeEngine {
    fn parse(&self, format: Format, name: &str, bytes: &[u8]) -> Result<Changelog, EngineError> {
        match format {
            Format::Xml => xml::parse(name, bytes),
            Format::Yaml => yaml::parse(name, bytes),
            Format::Json => json::parse(name, bytes),
            Format::Sql => sql::parse(name, bytes),
        }
    }

    fn serialize(&self, changelog: &Changelog, target: Format) -> Result<Vec<u8>, EngineError> {
        match target {
            Format::Xml => xml::serialize(changelog),
            Format::Yaml => yaml::serialize(changelog),
            Format::Json => json::serialize(changelog),
            Format::Sql => sql::serialize(changelog),
        }
    }
}
