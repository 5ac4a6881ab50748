//! Command line argument parsing for the semsearch CLI using clap.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};

/// semsearch - semantic search over plain-text documents
#[derive(Parser, Debug, Clone)]
#[command(name = "semsearch")]
#[command(about = "Semantic search over plain-text documents")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(long_about = None)]
pub struct SemsearchArgs {
    /// Verbosity level (0=quiet, 1=normal, 2=verbose, 3=debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (overrides verbose)
    #[arg(short, long)]
    pub quiet: bool,

    /// Output format
    #[arg(short = 'f', long = "format", default_value = "human")]
    pub output_format: OutputFormat,

    /// Pretty-print JSON output
    #[arg(long)]
    pub pretty: bool,

    /// Configuration file (JSON)
    #[arg(short, long, value_name = "CONFIG", env = "SEMSEARCH_CONFIG")]
    pub config: Option<PathBuf>,

    /// Snapshot file, overriding `store_path` from the configuration
    #[arg(short, long, value_name = "STORE_PATH")]
    pub store: Option<PathBuf>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

impl SemsearchArgs {
    /// Get the effective verbosity level
    pub fn verbosity(&self) -> u8 {
        if self.quiet {
            0
        } else {
            match self.verbose {
                0 => 1, // Default to normal
                n => n,
            }
        }
    }
}

/// Available CLI commands
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Add the passages of text files to the index
    Add(AddArgs),

    /// Search the index
    Search(SearchArgs),

    /// Show index statistics
    Stats,
}

/// Arguments for adding documents
#[derive(Parser, Debug, Clone)]
pub struct AddArgs {
    /// Text files; each blank-line separated paragraph becomes one document
    #[arg(value_name = "FILES", required = true)]
    pub files: Vec<PathBuf>,

    /// Passages embedded per batch
    #[arg(short, long, default_value = "64")]
    pub batch_size: usize,
}

/// Arguments for searching
#[derive(Parser, Debug, Clone)]
pub struct SearchArgs {
    /// Query string
    #[arg(value_name = "QUERY")]
    pub query: String,

    /// Number of passages to return (defaults to `top_k` from the configuration)
    #[arg(short = 'k', long = "top-k")]
    pub top_k: Option<usize>,

    /// Web content to append to the retrieval context; enables web search
    #[arg(long, value_name = "TEXT")]
    pub web_text: Option<String>,

    /// Print the rendered retrieval context instead of a result listing
    #[arg(long)]
    pub context: bool,
}

/// Output formats for CLI
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable output
    Human,
    /// JSON output
    Json,
}
