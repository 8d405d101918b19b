//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Harvest: join agricultural emissions with crop production
#[derive(Parser)]
#[command(name = "harvest")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the whole pipeline: load, transform, merge and store
    Run {
        /// Pipeline configuration file (JSON)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Directory holding the dataset CSV files
        #[arg(short, long, default_value = "datasets")]
        data_dir: PathBuf,

        /// Download the datasets from Kaggle before loading
        #[arg(long, requires = "credentials")]
        download: bool,

        /// Kaggle token file (kaggle.json, or a file with a JSON token line)
        #[arg(long)]
        credentials: Option<PathBuf>,

        /// Database for the merged table
        #[arg(long)]
        database: Option<String>,

        /// Name of the merged table
        #[arg(long)]
        table: Option<String>,

        /// Also store the tidy emissions and crop tables
        #[arg(long)]
        keep_intermediate: bool,

        /// Print the run report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Download and extract both datasets
    Fetch {
        /// Kaggle token file
        #[arg(long)]
        credentials: PathBuf,

        /// Directory the archives are extracted into
        #[arg(short, long, default_value = "datasets")]
        data_dir: PathBuf,

        /// Pipeline configuration file naming the datasets (JSON)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Run one transformer on a local CSV file
    Transform {
        /// Which source the file holds
        #[arg(value_enum)]
        kind: SourceKind,

        /// Path to the CSV file
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Store the result in this database
        #[arg(long, requires = "table")]
        database: Option<String>,

        /// Table name for the stored result
        #[arg(long, requires = "database")]
        table: Option<String>,

        /// Pipeline configuration file (JSON)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Print a stored table
    Show {
        /// Database file
        #[arg(long)]
        database: String,

        /// Table name
        #[arg(long)]
        table: String,

        /// Maximum rows to print
        #[arg(short = 'n', long, default_value = "20")]
        limit: usize,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

/// The two supported sources.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum SourceKind {
    Emissions,
    Crop,
}
