use std::path::PathBuf;

use clap::{Args, Subcommand};

/// Options shared by every command.
#[derive(Args, Debug, Clone)]
pub struct CommonArgs {
    /// Data directory holding the database
    #[arg(long, default_value = "./data")]
    pub data_dir: PathBuf,

    /// Config file (defaults to <data-dir>/tearank.toml when present)
    #[arg(long)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create the database and register the known package managers
    Init {
        #[command(flatten)]
        common: CommonArgs,
    },

    /// Import packages, homepages and dependencies from a YAML snapshot
    Import {
        #[command(flatten)]
        common: CommonArgs,

        /// Snapshot file to import
        file: PathBuf,
    },

    /// Merge packages sharing a homepage into canons
    Dedupe {
        #[command(flatten)]
        common: CommonArgs,

        /// Compute and log changes without writing them
        #[arg(long)]
        dry_run: bool,
    },

    /// Rank canons over the current dependency graph and store a new run
    Rank {
        #[command(flatten)]
        common: CommonArgs,
    },

    /// Dedupe, then rank
    Run {
        #[command(flatten)]
        common: CommonArgs,

        /// Compute and log results without writing them
        #[arg(long)]
        dry_run: bool,
    },

    /// Show the ranks of a run
    Ranks {
        #[command(flatten)]
        common: CommonArgs,

        /// Run number (defaults to the latest run)
        #[arg(long)]
        run: Option<i64>,

        /// Maximum number of canons to show
        #[arg(long)]
        limit: Option<usize>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}
