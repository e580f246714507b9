//! CLI argument parsing for mulch
//!
//! Global flags: --format, --quiet, --verbose, --log-level, --log-json

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Output format for mulch commands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable output (default)
    #[default]
    Human,
    /// JSON output for machine consumption
    Json,
}

/// Mulch - dependency-aware pruning for conversation logs
#[derive(Parser, Debug)]
#[command(name = "mulch")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output format
    #[arg(long, global = true, value_enum, default_value = "human")]
    pub format: OutputFormat,

    /// Suppress non-essential output
    #[arg(long, short, global = true)]
    pub quiet: bool,

    /// Verbose logging
    #[arg(long, short, global = true)]
    pub verbose: bool,

    /// Explicit log level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Prune log files under the given policy
    Prune(PruneArgs),

    /// Validate parent references in a log file
    Check {
        /// Log file to validate
        path: PathBuf,

        /// Remove orphans and rewrite the file
        #[arg(long)]
        fix: bool,
    },

    /// Export the dependency graph as JSON
    Graph {
        /// Log file to export
        path: PathBuf,

        /// Write to this file instead of stdout
        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// Report per-message decay and importance
    Score {
        /// Log file to score
        path: PathBuf,

        /// Show only the lowest-scoring N messages
        #[arg(long)]
        limit: Option<usize>,

        /// Decay preset (standard, conservative, aggressive)
        #[arg(long)]
        preset: Option<String>,
    },

    /// List built-in decay presets
    Presets,
}

#[derive(Args, Debug)]
pub struct PruneArgs {
    /// Log files or directories to prune
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,

    /// Age in days beyond which messages become deletion candidates
    #[arg(long)]
    pub max_age_days: Option<f64>,

    /// Importance score below which messages become deletion candidates
    #[arg(long)]
    pub min_importance: Option<f64>,

    /// Safety cap on deletions per file
    #[arg(long)]
    pub max_deletions: Option<usize>,

    /// Safety cap on files touched per run
    #[arg(long)]
    pub max_files: Option<usize>,

    /// Delete candidates without dependency resolution
    #[arg(long)]
    pub naive: bool,

    /// Skip the defensive orphan sweep
    #[arg(long)]
    pub no_orphan_cleanup: bool,

    /// Report what would be deleted without writing
    #[arg(long)]
    pub dry_run: bool,

    /// Use timestamped backup names to avoid collisions
    #[arg(long)]
    pub timestamped_backup: bool,

    /// Write the debug graph export to this path (single file only)
    #[arg(long)]
    pub export_graph: Option<PathBuf>,

    /// Decay preset (standard, conservative, aggressive)
    #[arg(long)]
    pub preset: Option<String>,

    /// Require id, kind, and payload on every record
    #[arg(long)]
    pub strict: bool,

    /// Worker threads for multi-file batches
    #[arg(long, default_value_t = 4)]
    pub threads: usize,
}
