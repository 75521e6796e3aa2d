//! CLI command definitions and mapping-file discovery

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use eyre::{Context, Result};

/// Glob applied under the root directory when no files are given explicitly
pub const DISCOVERY_GLOB: &str = "env/**/mappings/*.json";

/// mapfix - column mapping normalizer and validator
#[derive(Parser)]
#[command(
    name = "mapfix",
    about = "Normalize and validate column mapping JSON files",
    version
)]
pub struct Cli {
    /// Directory searched for env/**/mappings/*.json
    #[arg(short, long, global = true, default_value = ".")]
    pub root: PathBuf,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands
#[derive(Subcommand)]
pub enum Command {
    /// Rewrite mapping files into the canonical sanitized shape
    Fix {
        /// Specific files to fix (defaults to discovery under --root)
        files: Vec<PathBuf>,
    },

    /// Re-check sanitized files; exits 1 if any file needed fixing (CI gate)
    Check {
        /// Specific files to check (defaults to discovery under --root)
        files: Vec<PathBuf>,
    },
}

/// Resolve the set of files to operate on: explicit arguments win,
/// otherwise glob under the root. Sorted so runs are deterministic.
pub fn resolve_files(root: &Path, files: Vec<PathBuf>) -> Result<Vec<PathBuf>> {
    if !files.is_empty() {
        return Ok(files);
    }

    let pattern = root.join(DISCOVERY_GLOB);
    let pattern = pattern.to_string_lossy();
    let mut found: Vec<PathBuf> = glob::glob(&pattern)
        .context(format!("invalid discovery pattern {pattern}"))?
        .filter_map(|entry| entry.ok())
        .collect();
    found.sort();
    Ok(found)
}
