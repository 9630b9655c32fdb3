//! Command-line interface.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "impactmap",
    about = "Static change-impact analyzer: call graphs and test-coverage gaps",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Analyze a project directory
    Analyze {
        /// Project root to analyze
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Write the JSON report here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "summary")]
        format: OutputFormat,

        /// Override the global resolution deadline in milliseconds
        #[arg(long, env = "IMPACTMAP_DEADLINE_MS")]
        deadline_ms: Option<u64>,

        /// Override the sampling threshold
        #[arg(long)]
        max_symbols: Option<usize>,

        /// Skip external Go tools and use only the built-in resolver
        #[arg(long)]
        no_external_tools: bool,

        /// Recently changed files, prioritized when sampling
        #[arg(long = "changed")]
        changed_files: Vec<PathBuf>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Summary,
}
