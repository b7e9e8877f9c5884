//! Command-Line Interface

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// MarkWrite signal tools - smooth, differentiate and segment pen samples
#[derive(Parser, Debug)]
#[command(name = "markwrite-signal")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Config file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

/// Output format for processed trials
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Tab-delimited table with derived columns
    Tsv,
    /// JSON trial file
    Json,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Process one or more sample files and write derived channels
    Process {
        /// Input files (tab-delimited `time x y pressure`, or .json trial files)
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Output directory (defaults to stdout for a single TSV input)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "tsv")]
        format: OutputFormat,
    },

    /// Print pressed/hover runs, sample runs and strokes for a file
    Regions {
        /// Input file
        input: PathBuf,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Initialize configuration
    Init {
        /// Force overwrite existing config
        #[arg(short, long)]
        force: bool,
    },

    /// View or modify configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Set a configuration value
    Set {
        /// Configuration key (e.g., "filter.window", "velocity.source")
        key: String,

        /// Value to set
        value: String,
    },

    /// Get a specific configuration value
    Get {
        /// Configuration key
        key: String,
    },

    /// Reset configuration to defaults
    Reset {
        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Config file the command acts on: `--config` if given, else the default location
    pub fn config_path(&self) -> PathBuf {
        self.config.clone().unwrap_or_else(crate::app::config::Config::default_path)
    }
}
