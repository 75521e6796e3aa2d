//! mapfix - CLI entry point
//!
//! `fix` rewrites mapping files into the canonical sanitized shape;
//! `check` re-verifies them and exits 1 when anything had to change,
//! so CI forces the fix to be committed.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use eyre::Result;
use tracing::{debug, info};

use mapfix::cli::{Cli, Command, resolve_files};
use mapfix::{normalize, validate};

fn setup_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .init();
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    match cli.command {
        Command::Fix { files } => {
            let files = resolve_files(&cli.root, files)?;
            Ok(cmd_fix(&files))
        }
        Command::Check { files } => {
            let files = resolve_files(&cli.root, files)?;
            Ok(cmd_check(&files))
        }
    }
}

/// Normalize every file. A malformed file does not abort the batch; it is
/// reported and counted, and the run exits 1 if any file failed.
fn cmd_fix(files: &[PathBuf]) -> ExitCode {
    debug!(count = files.len(), "cmd_fix: called");
    let mut failures = 0usize;

    for path in files {
        match normalize::normalize_file(path) {
            Ok(()) => info!(path = %path.display(), "normalized"),
            Err(e) => {
                eprintln!("ERROR: {e}");
                failures += 1;
            }
        }
    }

    println!("Processed {} of {} mapping file(s)", files.len() - failures, files.len());
    if failures > 0 {
        eprintln!("{failures} file(s) could not be processed");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

/// Validate every file independently; exit 1 if any file was rewritten or
/// failed to parse, 0 otherwise.
fn cmd_check(files: &[PathBuf]) -> ExitCode {
    debug!(count = files.len(), "cmd_check: called");
    let mut failures = 0usize;
    let mut rewritten = 0usize;

    for path in files {
        match validate::validate_file(path) {
            Ok(report) => {
                if report.fixed {
                    println!("{} was modified; commit the sanitized version", path.display());
                    rewritten += 1;
                }
                for name in &report.redundant {
                    println!(
                        "WARN: {} maps source column '{name}' to an identical sink name, mapping might not be needed",
                        path.display()
                    );
                }
            }
            Err(e) => {
                eprintln!("ERROR: {e}");
                failures += 1;
            }
        }
    }

    if rewritten > 0 || failures > 0 {
        eprintln!(
            "Validation failed: {rewritten} file(s) rewritten, {failures} file(s) unreadable"
        );
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
