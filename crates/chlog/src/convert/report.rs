//! Collecting per-file failures and rendering the end-of-run error report.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::output::ExitCode;

/// The failure bucket a file lands in. A single path can appear in more than
/// one bucket, e.g. when a conversion fails and the fallback copy fails too.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorKind {
    RewriteIncludes,
    ConvertFile,
    CopyFile,
}

impl ErrorKind {
    fn headline(self) -> &'static str {
        match self {
            ErrorKind::RewriteIncludes => "Error while transforming includes:",
            ErrorKind::ConvertFile => "Error while converting files:",
            ErrorKind::CopyFile => "Error while copying files:",
        }
    }

    fn copy_note(self) -> &'static str {
        match self {
            ErrorKind::RewriteIncludes | ErrorKind::ConvertFile => {
                "These file(s) were copied to the new location."
            }
            ErrorKind::CopyFile => "These file(s) were NOT copied to the new location.",
        }
    }
}

/// Outcome of a whole run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Success,
    Partial,
}

impl RunStatus {
    pub fn exit_code(self) -> ExitCode {
        match self {
            RunStatus::Success => ExitCode::Success,
            RunStatus::Partial => ExitCode::PartialSuccess,
        }
    }
}

/// Failures accumulated over a run, grouped per bucket with stable ordering.
#[derive(Debug, Default)]
pub struct ErrorReport {
    buckets: BTreeMap<ErrorKind, BTreeSet<PathBuf>>,
}

impl ErrorReport {
    pub fn record(&mut self, kind: ErrorKind, path: PathBuf) {
        self.buckets.entry(kind).or_default().insert(path);
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Total number of recorded entries. A path failing in two buckets counts
    /// twice.
    pub fn total(&self) -> usize {
        self.buckets.values().map(BTreeSet::len).sum()
    }

    pub fn contains(&self, kind: ErrorKind, path: &Path) -> bool {
        self.buckets
            .get(&kind)
            .is_some_and(|paths| paths.contains(path))
    }

    pub fn status(&self) -> RunStatus {
        if self.is_empty() {
            RunStatus::Success
        } else {
            RunStatus::Partial
        }
    }
}

impl fmt::Display for ErrorReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Error converting {} file(s):", self.total())?;
        for (kind, paths) in &self.buckets {
            writeln!(f, "{}", kind.headline())?;
            for path in paths {
                writeln!(f, " - {}", path.display())?;
            }
            writeln!(f, "{}", kind.copy_note())?;
        }
        Ok(())
    }
}
