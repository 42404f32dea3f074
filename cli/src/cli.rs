//! Command-line interface for rowdelta

use clap::{Parser, Subcommand};
use rowdelta_core::HashAlgorithm;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "rowdelta")]
#[command(about = "Keyless reconciliation of two snapshots of a tabular dataset")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Use this config file instead of rowdelta.toml / the global config
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Classify the rows of NEW against OLD and write the changes
    Compare {
        /// Previous snapshot (CSV with header)
        old: PathBuf,

        /// Current snapshot (CSV with header)
        new: PathBuf,

        /// Column holding the measured value
        #[arg(long, short = 'o')]
        observation_column: Option<String>,

        /// Output file name prefix (defaults to the NEW file's stem)
        #[arg(long)]
        prefix: Option<String>,

        /// Output directory (overrides config)
        #[arg(long)]
        output_dir: Option<PathBuf>,

        /// Write into the test output directory
        #[arg(long, conflicts_with = "output_dir")]
        test: bool,

        /// Row digest algorithm
        #[arg(long, value_enum)]
        hash: Option<HashChoice>,

        /// Treat letter case as significant
        #[arg(long)]
        case_sensitive: bool,

        /// Also write unchanged rows
        #[arg(long)]
        include_unchanged: bool,

        /// Refuse to replace existing output files
        #[arg(long)]
        no_overwrite: bool,

        /// Report what would be written without creating files
        #[arg(long)]
        dry_run: bool,

        /// Output as JSON
        #[arg(long, conflicts_with = "quiet")]
        json: bool,

        /// Quiet output (machine-readable)
        #[arg(long)]
        quiet: bool,
    },

    /// Find rows that repeat a dimension key within one file
    Duplicates {
        /// Input file (CSV with header)
        file: PathBuf,

        /// Column holding the measured value
        #[arg(long, short = 'o')]
        observation_column: Option<String>,

        /// Write the de-duplicated rows to <stem>-filtered.csv next to the input
        #[arg(long)]
        write: bool,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Configure rowdelta settings
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show,

    /// Write a default config file
    Init {
        /// Write the global config instead of ./rowdelta.toml
        #[arg(long)]
        global: bool,

        /// Replace an existing file
        #[arg(long)]
        force: bool,
    },
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
pub enum HashChoice {
    Fast,
    Cryptographic,
}

impl From<HashChoice> for HashAlgorithm {
    fn from(choice: HashChoice) -> Self {
        match choice {
            HashChoice::Fast => HashAlgorithm::Fast,
            HashChoice::Cryptographic => HashAlgorithm::Cryptographic,
        }
    }
}
