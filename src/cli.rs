use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "remuxer")]
#[command(author, version, about = "Lossless container remuxer with timestamp repair")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Remux a single file into a new container
    Remux {
        /// Input file to remux
        #[arg(required = true)]
        input: PathBuf,

        /// Output file (defaults to the input name with the configured extension)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Print the operation report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Remux every video file under a directory
    Batch {
        /// Directory to scan recursively
        #[arg(required = true)]
        dir: PathBuf,

        /// Maximum concurrent operations (capped at available cores)
        #[arg(short, long)]
        jobs: Option<usize>,
    },

    /// Validate configuration file
    Validate {
        /// Config file to validate (uses default if not specified)
        config: Option<PathBuf>,
    },

    /// Display version information
    Version,
}
