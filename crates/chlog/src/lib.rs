//! Changelog conversion toolkit.
//!
//! This library converts trees of database changelogs between the supported
//! textual formats (XML, YAML, JSON and formatted SQL) while keeping
//! cross-changelog include references consistent. The binary in this crate is
//! a thin CLI over [`convert::Converter`] and [`context::resolve_contexts`].

pub mod cli;
pub mod context;
pub mod convert;
pub mod engine;
pub mod format;
pub mod include;
pub mod output;

// Re-export commonly used types
pub use convert::{ConvertOptions, Converter, RunSummary};
pub use convert::{ErrorKind, ErrorReport, RewriteLedger, RunStatus};
pub use engine::{Change, ChangeSet, Changelog, ChangelogEngine, EngineError, Entry, SerdeEngine};
pub use format::Format;
pub use output::{ExitCode, OutputContext};
