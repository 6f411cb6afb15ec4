//! The rename ledger built during the first conversion pass.

use std::path::{Path, PathBuf};

/// Records which source file ended up at which destination, in the order the
/// files were processed. Include references are rewritten against this ledger
/// once the first pass has seen every file.
#[derive(Debug, Default)]
pub struct RewriteLedger {
    entries: Vec<(PathBuf, PathBuf)>,
}

impl RewriteLedger {
    pub fn record(&mut self, source: PathBuf, destination: PathBuf) {
        self.entries.push((source, destination));
    }

    /// All recorded renames, oldest first. Lookups must keep this order so the
    /// first matching entry wins when two sources relativize to the same
    /// reference.
    pub fn entries(&self) -> impl Iterator<Item = (&Path, &Path)> {
        self.entries
            .iter()
            .map(|(source, destination)| (source.as_path(), destination.as_path()))
    }

    pub fn get(&self, source: &Path) -> Option<&Path> {
        self.entries
            .iter()
            .find(|(recorded, _)| recorded == source)
            .map(|(_, destination)| destination.as_path())
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}
