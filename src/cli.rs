//! Command-line interface definitions for snapdiff.
//!
//! This module contains all CLI argument parsing structures using clap's derive macros.
//! The CLI definitions are shared between the main binary and build tools (like xtask)
//! for man page generation.
//!
//! Note: Field-level documentation is provided via clap attributes,
//! so we allow missing_docs for this module to avoid redundant documentation.

#![allow(missing_docs)]

use clap::{Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

/// Main CLI structure for snapdiff.
#[derive(Parser)]
#[command(
    name = "snapdiff",
    version = crate::VERSION,
    about = "Snapshot directory trees and report what changed",
    long_about = "Records the metadata of every entry under one or more roots and reports \
                  additions, removals, renames and modifications since the last run. \
                  Entries are matched by inode, so renames are detected as such."
)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Show verbose output and debug logs
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress informational messages
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// State directory (overrides config and SNAPDIFF_STATE_DIR)
    #[arg(long, global = true, value_name = "DIR")]
    pub state_dir: Option<PathBuf>,
}

/// All available commands.
#[derive(Subcommand)]
pub enum Commands {
    /// Snapshot roots and report changes since the previous run
    Track {
        /// Directories to track
        #[arg(required = true)]
        roots: Vec<String>,

        /// Store the snapshot pair in this directory (single root only)
        #[arg(short, long, value_name = "DIR")]
        output: Option<PathBuf>,

        /// Fail on the first unreadable entry instead of skipping it
        #[arg(long)]
        strict: bool,

        /// One line per change
        #[arg(short, long)]
        short: bool,

        /// Exit with status 1 when changes were detected
        #[arg(long)]
        exit_code: bool,
    },

    /// Flag suspicious files by content across several roots
    Scan {
        /// Directories to scan
        #[arg(required = true)]
        roots: Vec<String>,

        /// Move flagged files into this directory
        #[arg(long, value_name = "DIR")]
        quarantine: Option<PathBuf>,
    },

    /// Print the stored snapshot of a root
    Show {
        /// Root whose snapshot to print
        root: String,

        /// Show the previous snapshot instead of the current one
        #[arg(short, long)]
        previous: bool,
    },

    /// Generate shell completion scripts
    Completion {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}
