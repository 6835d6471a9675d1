use std::path::PathBuf;

use clap::{Parser, Subcommand};

use snapdiff::IgnoreRegion;
use snapdiff::config::DiffConfig;

#[derive(Parser)]
#[command(name = "snapdiff", about = "Screenshot comparison for visual regression review")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Create .snapdiff/config.toml with default settings
    Init {
        /// Overwrite existing config and gitignore
        #[arg(long, short = 'f')]
        force: bool,
    },

    /// Compare two images and report the difference (exit 1 when significant)
    Compare {
        /// Baseline image: path, file:// URL, http(s) URL or data URL
        baseline: String,
        /// Current image, same forms as the baseline
        current: String,
        /// Region excluded from comparison as x,y,width,height (repeatable)
        #[arg(long = "ignore", value_name = "X,Y,W,H")]
        ignore: Vec<IgnoreRegion>,
        /// Write the diff image to PATH instead of embedding it as a data URL
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
        /// Print the result as JSON
        #[arg(long)]
        json: bool,
        /// Per-image load timeout in milliseconds (overrides config)
        #[arg(long)]
        timeout_ms: Option<u64>,
        #[command(flatten)]
        diff: DiffConfig,
    },

    /// Register or refresh a stored snapshot
    Add {
        /// Snapshot identifier
        id: String,
        /// Image for the current capture
        #[arg(long)]
        current: String,
        /// Baseline image (keeps the stored baseline when omitted)
        #[arg(long)]
        baseline: Option<String>,
        /// Display name
        #[arg(long)]
        name: Option<String>,
        /// Region excluded from comparison as x,y,width,height (repeatable)
        #[arg(long = "ignore", value_name = "X,Y,W,H")]
        ignore: Vec<IgnoreRegion>,
    },

    /// Compare every stored snapshot against its baseline (exit 0/1)
    Run {
        /// Only run snapshots whose id or name contains PATTERN (case-insensitive)
        #[arg(long, short = 'f')]
        filter: Option<String>,
        /// Concurrent comparisons (overrides config)
        #[arg(long, short = 'p')]
        parallel: Option<usize>,
        /// Per-image load timeout in milliseconds (overrides config)
        #[arg(long)]
        timeout_ms: Option<u64>,
        #[command(flatten)]
        diff: DiffConfig,
    },

    /// Mark a snapshot as approved
    Approve { id: String },

    /// Mark a snapshot as rejected
    Reject { id: String },

    /// Promote a snapshot's current image to its baseline
    Baseline { id: String },

    /// Delete a snapshot and its diff artifact
    Remove { id: String },

    /// List stored snapshots with their status
    List,
}
