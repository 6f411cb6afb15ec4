//! The batch conversion pipeline.
//!
//! Runs in two passes. The first pass walks the input tree and, per file,
//! either copies it verbatim (unconvertible extension or already in the
//! target format), defers it (it contains include references) or converts its
//! body, recording every resulting rename in the [`RewriteLedger`]. The
//! second pass runs after the walk has seen every file, so deferred
//! changelogs can have their references rewritten against a complete ledger.
//!
//! Per-file failures never abort the run. A failed conversion or rewrite
//! falls back to copying the original, the path is recorded in the matching
//! error bucket and the run ends with a partial-success status.

mod ledger;
mod report;

pub use ledger::RewriteLedger;
pub use report::{ErrorKind, ErrorReport, RunStatus};

use crate::engine::ChangelogEngine;
use crate::format::Format;
use crate::include::rewriter_for;
use crate::output::OutputContext;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// What to convert and where to put it.
#[derive(Debug, Clone)]
pub struct ConvertOptions {
    pub target: Format,
    /// Inserted (lowercased) into converted file names, e.g.
    /// `changelog.mariadb.sql`. Required for SQL output.
    pub database_type: Option<String>,
    /// A changelog file or a directory tree of changelogs.
    pub input: PathBuf,
    /// Existing directory receiving the converted tree.
    pub output: PathBuf,
}

/// Counters and failures of a finished run.
#[derive(Debug)]
pub struct RunSummary {
    pub converted: usize,
    pub copied: usize,
    pub deferred: usize,
    pub report: ErrorReport,
}

impl RunSummary {
    pub fn status(&self) -> RunStatus {
        self.report.status()
    }
}

/// The two-pass batch converter.
pub struct Converter {
    opts: ConvertOptions,
    engine: Box<dyn ChangelogEngine>,
    ledger: RewriteLedger,
    deferred: Vec<PathBuf>,
    report: ErrorReport,
    converted: usize,
    copied: usize,
}

impl Converter {
    pub fn new(opts: ConvertOptions, engine: Box<dyn ChangelogEngine>) -> Self {
        Self {
            opts,
            engine,
            ledger: RewriteLedger::default(),
            deferred: Vec::new(),
            report: ErrorReport::default(),
            converted: 0,
            copied: 0,
        }
    }

    pub fn run(mut self, out: &OutputContext) -> Result<RunSummary> {
        if self.opts.input.is_file() {
            self.process_file(&self.opts.input.clone(), out)?;
        } else {
            // Deterministic order, so ledger tie-breaks are reproducible.
            let walk = WalkDir::new(&self.opts.input).sort_by_file_name();
            for entry in walk {
                let entry = entry.with_context(|| {
                    format!("failed to walk input '{}'", self.opts.input.display())
                })?;
                if entry.file_type().is_file() {
                    self.process_file(entry.path(), out)?;
                }
            }
        }

        // Barrier: every rename is known, deferred files can be rewritten.
        self.rewrite_deferred(out)?;

        if !self.deferred.is_empty() {
            out.print_info(
                "The following files will not be converted, since they contain include/includeAll:",
            )?;
            for path in &self.deferred {
                out.print_info(format!(" - {}", path.display()))?;
            }
            out.print_info(
                "If possible, the paths of those includes were transformed to use the new file ending.",
            )?;
        }

        Ok(RunSummary {
            converted: self.converted,
            copied: self.copied,
            deferred: self.deferred.len(),
            report: self.report,
        })
    }

    /// First-pass classification of a single file.
    fn process_file(&mut self, path: &Path, out: &OutputContext) -> Result<()> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default();
        let convertible = Format::from_extension(extension).is_some();

        if !convertible || self.opts.target.matches_extension(extension) {
            return self.copy_verbatim(path, out);
        }

        if let Some(rewriter) = rewriter_for(path) {
            if rewriter.has_includes(path) {
                self.deferred.push(path.to_path_buf());
                return Ok(());
            }
        }

        self.convert_body(path, out)
    }

    /// Parse, restamp and serialize one changelog body. Falls back to a copy
    /// when anything goes wrong.
    fn convert_body(&mut self, path: &Path, out: &OutputContext) -> Result<()> {
        out.print_info(format!(
            "Converting changeset '{}'",
            self.display_path(path)
        ))?;

        match self.try_convert_body(path) {
            Ok(destination) => {
                self.ledger.record(path.to_path_buf(), destination);
                self.converted += 1;
            }
            Err(e) => {
                tracing::warn!(
                    "error converting file '{}' to format {}: {e:#}",
                    path.display(),
                    self.opts.target
                );
                self.report.record(ErrorKind::ConvertFile, path.to_path_buf());
                self.fallback_copy(path)?;
            }
        }
        Ok(())
    }

    fn try_convert_body(&self, path: &Path) -> Result<PathBuf> {
        let source_format = Format::from_path(path)
            .with_context(|| format!("unrecognized extension on '{}'", path.display()))?;
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default();
        let bytes =
            std::fs::read(path).with_context(|| format!("failed to read '{}'", path.display()))?;

        let mut changelog = self.engine.parse(source_format, file_name, &bytes)?;

        let destination = self.destination_for(path, true)?;
        if let Some(new_name) = destination.file_name().and_then(|n| n.to_str()) {
            changelog.stamp_file_path(new_name);
        }
        let rendered = self.engine.serialize(&changelog, self.opts.target)?;
        std::fs::write(&destination, rendered)
            .with_context(|| format!("failed to write '{}'", destination.display()))?;
        Ok(destination)
    }

    /// Copy a file that needs no conversion. Successful copies join the
    /// ledger so references to these files still resolve.
    fn copy_verbatim(&mut self, path: &Path, out: &OutputContext) -> Result<()> {
        out.print_info(format!(
            "Copying file '{}' to new location",
            self.display_path(path)
        ))?;

        match self.try_copy(path) {
            Ok(destination) => {
                self.ledger.record(path.to_path_buf(), destination);
                self.copied += 1;
            }
            Err(e) => {
                tracing::warn!("error copying file '{}' to new target dir: {e:#}", path.display());
                self.report.record(ErrorKind::CopyFile, path.to_path_buf());
            }
        }
        Ok(())
    }

    /// Copy the original after a failed conversion or rewrite, keeping the
    /// output tree complete. Deliberately never recorded in the ledger, so
    /// references to the failed file keep their original spelling.
    fn fallback_copy(&mut self, path: &Path) -> Result<()> {
        if let Err(e) = self.try_copy(path) {
            tracing::warn!("error copying file '{}' to new target dir: {e:#}", path.display());
            self.report.record(ErrorKind::CopyFile, path.to_path_buf());
        }
        Ok(())
    }

    fn try_copy(&self, path: &Path) -> Result<PathBuf> {
        let destination = self.destination_for(path, false)?;
        std::fs::copy(path, &destination).with_context(|| {
            format!(
                "failed to copy '{}' to '{}'",
                path.display(),
                destination.display()
            )
        })?;
        Ok(destination)
    }

    /// Second pass: rewrite include references of deferred files against the
    /// completed ledger. Deferred files keep their original extension.
    fn rewrite_deferred(&mut self, out: &OutputContext) -> Result<()> {
        let input_root = self.input_root().to_path_buf();
        for path in self.deferred.clone() {
            out.print_info(format!(
                "Transforming file '{}' with includes",
                self.display_path(&path)
            ))?;

            let rewriter = match rewriter_for(&path) {
                Some(rewriter) => rewriter,
                None => continue,
            };
            let outcome = self
                .destination_for(&path, false)
                .and_then(|destination| {
                    rewriter
                        .rewrite(&self.ledger, &input_root, &path, &destination)
                        .map_err(anyhow::Error::from)?;
                    Ok(destination)
                });
            match outcome {
                Ok(destination) => {
                    self.ledger.record(path.clone(), destination);
                }
                Err(e) => {
                    tracing::warn!(
                        "error while transforming file with includes '{}' to format {}: {e:#}",
                        path.display(),
                        self.opts.target
                    );
                    self.report.record(ErrorKind::RewriteIncludes, path.clone());
                    self.fallback_copy(&path)?;
                }
            }
        }
        Ok(())
    }

    /// The output path for `source`, mirroring its position under the input
    /// root. With `change_extension` the target extension is applied and the
    /// database-type qualifier inserted; otherwise the file name survives.
    fn destination_for(&self, source: &Path, change_extension: bool) -> Result<PathBuf> {
        let file_name = if change_extension {
            let stem = source
                .file_stem()
                .and_then(|s| s.to_str())
                .with_context(|| format!("invalid file name '{}'", source.display()))?;
            let mut name = stem.to_string();
            if let Some(qualifier) = &self.opts.database_type {
                name.push('.');
                name.push_str(&qualifier.to_lowercase());
            }
            name.push('.');
            name.push_str(self.opts.target.extension());
            name
        } else {
            source
                .file_name()
                .and_then(|n| n.to_str())
                .with_context(|| format!("invalid file name '{}'", source.display()))?
                .to_string()
        };

        let destination = if self.opts.input.is_file() {
            self.opts.output.join(file_name)
        } else {
            let relative = source.strip_prefix(&self.opts.input).with_context(|| {
                format!(
                    "'{}' is not under the input root '{}'",
                    source.display(),
                    self.opts.input.display()
                )
            })?;
            self.opts.output.join(relative).with_file_name(file_name)
        };

        if let Some(parent) = destination.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create '{}'", parent.display()))?;
        }
        Ok(destination)
    }

    /// The basis directory for include-reference lookups.
    fn input_root(&self) -> &Path {
        if self.opts.input.is_file() {
            self.opts.input.parent().unwrap_or(Path::new(""))
        } else {
            &self.opts.input
        }
    }

    /// Progress messages show paths relative to the input root's parent, so
    /// the root directory name stays visible.
    fn display_path(&self, path: &Path) -> String {
        let anchor = self.opts.input.parent().unwrap_or(Path::new(""));
        path.strip_prefix(anchor)
            .unwrap_or(path)
            .display()
            .to_string()
    }
}
