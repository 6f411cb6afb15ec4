//! Console output helpers and process exit codes.

use std::fmt::Display;
use std::io::{self, Write};

/// Exit codes returned by the CLI.
///
/// `InvalidArgument` is produced by clap itself for usage errors; it is listed
/// here so the mapping stays in one place.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    Success = 0,
    GenericError = 1,
    InvalidArgument = 2,
    PartialSuccess = 3,
}

impl ExitCode {
    pub fn code(self) -> i32 {
        self as i32
    }
}

/// Context for controlling output verbosity.
pub struct OutputContext {
    quiet: bool,
}

impl OutputContext {
    pub fn new(quiet: bool) -> Self {
        Self { quiet }
    }

    /// Print a progress message (suppressed by --quiet).
    pub fn print_info(&self, msg: impl Display) -> io::Result<()> {
        if !self.quiet {
            writeln_safe(&format!("{}", msg))
        } else {
            Ok(())
        }
    }

    /// Print a command result to stdout (always shown, even with --quiet).
    pub fn print_result(&self, msg: impl Display) -> io::Result<()> {
        writeln_safe(&format!("{}", msg))
    }

    /// Print to stderr (always shown).
    pub fn print_error(&self, msg: impl Display) -> io::Result<()> {
        writeln_safe_stderr(&format!("{}", msg))
    }

    pub fn is_quiet(&self) -> bool {
        self.quiet
    }
}

/// Safe println that handles broken pipes gracefully
fn writeln_safe(msg: &str) -> io::Result<()> {
    match writeln!(io::stdout(), "{}", msg) {
        Ok(_) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::BrokenPipe => {
            // Silently exit on broken pipe (expected when piping to head, etc.)
            std::process::exit(0);
        }
        Err(e) => Err(e),
    }
}

/// Safe eprintln that handles broken pipes gracefully
fn writeln_safe_stderr(msg: &str) -> io::Result<()> {
    match writeln!(io::stderr(), "{}", msg) {
        Ok(_) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::BrokenPipe => {
            std::process::exit(0);
        }
        Err(e) => Err(e),
    }
}
