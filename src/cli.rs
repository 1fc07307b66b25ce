use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "transforged")]
#[command(author, version, about = "Multi-output media transcoding on top of ffmpeg")]
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
    /// Probe a media file and display its tracks
    Probe {
        /// File to probe
        #[arg(required = true)]
        file: PathBuf,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the job a file would produce without running it
    Plan {
        /// Source file
        #[arg(required = true)]
        file: PathBuf,

        /// Directory outputs would be written to
        #[arg(short, long, default_value = ".")]
        output_dir: PathBuf,

        /// Print the full ffmpeg command line
        #[arg(long)]
        args: bool,
    },

    /// Transcode a file into every producible preset
    Run {
        /// Source file
        #[arg(required = true)]
        file: PathBuf,

        /// Directory to write outputs to
        #[arg(short, long, default_value = ".")]
        output_dir: PathBuf,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check that required external tools are available
    CheckTools,

    /// Validate configuration file
    Validate {
        /// Config file to validate (falls back to --config)
        file: Option<PathBuf>,
    },

    /// Display version information
    Version,
}
