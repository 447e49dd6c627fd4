//! Spinoff CLI: turn one source video into platform-ready spin-offs.
//!
//! Usage:
//!   spinoff transform <SOURCE> -p <TAG>...   Produce spin-offs for platforms
//!   spinoff profiles                         List the platform recipes
//!   spinoff probe <SOURCE>                   Show source media information
//!   spinoff check                            Check ffmpeg and run a smoke encode

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use spinoff_common::config::AppConfig;

mod commands;

#[derive(Parser)]
#[command(
    name = "spinoff",
    about = "Platform-optimized spin-offs from a single video",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file (defaults to $XDG_CONFIG_HOME/spinoff/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Produce one spin-off per platform
    Transform {
        /// Source video file
        source: PathBuf,

        /// Platform tag (twitter, instagram, youtube, pinterest, facebook); repeatable
        #[arg(short, long = "platform", required = true)]
        platforms: Vec<String>,

        /// Write outputs here instead of next to the source
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Print results as JSON
        #[arg(long)]
        json: bool,
    },

    /// List every platform recipe
    Profiles {
        /// Print profiles as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show probed information about a source
    Probe {
        /// Source video file
        source: PathBuf,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check codec tooling and run a synthetic encode
    Check,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => AppConfig::try_load_from(path)?,
        None => AppConfig::load(),
    };
    if cli.verbose {
        config.logging.level = "debug".to_string();
    }
    spinoff_common::logging::init_logging(&config.logging);

    match cli.command {
        Commands::Transform {
            source,
            platforms,
            output_dir,
            json,
        } => commands::transform::run(&config, source, platforms, output_dir, json).await,
        Commands::Profiles { json } => commands::profiles::run(json),
        Commands::Probe { source, json } => commands::probe::run(&config, source, json),
        Commands::Check => commands::check::run(&config).await,
    }
}
