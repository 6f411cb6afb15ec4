//! Command line interface definitions.

use crate::format::Format;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "chlog",
    about = "Convert changelog trees between XML, YAML, JSON and formatted SQL",
    version
)]
pub struct Cli {
    /// Suppress progress output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Convert a changelog file or directory tree to another format
    Convert(ConvertArgs),
    /// List the context expressions reachable from a changelog
    Context(ContextArgs),
}

#[derive(clap::Args, Debug)]
pub struct ConvertArgs {
    /// Target format
    #[arg(short, long, value_enum)]
    pub format: Format,

    /// Database type inserted into converted SQL file names
    #[arg(short, long, required_if_eq("format", "sql"))]
    pub database_type: Option<String>,

    /// Changelog file or directory to convert
    #[arg(value_parser = existing_path)]
    pub input: PathBuf,

    /// Existing directory receiving the converted tree
    #[arg(value_parser = existing_dir)]
    pub output: PathBuf,
}

#[derive(clap::Args, Debug)]
pub struct ContextArgs {
    /// Root changelog to resolve contexts from
    #[arg(value_parser = existing_path)]
    pub changelog: PathBuf,
}

fn existing_path(value: &str) -> Result<PathBuf, String> {
    let path = PathBuf::from(value);
    if path.exists() {
        Ok(path)
    } else {
        Err(format!("Specified file '{value}' does not exist."))
    }
}

fn existing_dir(value: &str) -> Result<PathBuf, String> {
    let path = PathBuf::from(value);
    if path.is_dir() {
        Ok(path)
    } else {
        Err(format!("Specified directory '{value}' is not a directory."))
    }
}
