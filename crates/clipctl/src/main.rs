//! clipctl - inspect clip recorder configuration and the clip index
//!
//! Subcommands:
//! - `clipctl config` - Print the effective configuration and where it came from
//! - `clipctl codec` - Print the encoder profile from `output_config.toml`
//! - `clipctl clips` - List clips committed to the index

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use clipconf::ClipConfig;

mod commands;

#[derive(Parser)]
#[command(name = "clipctl")]
#[command(about = "Inspect clip recorder configuration and storage")]
#[command(version)]
struct Cli {
    /// Config file to use in place of ./cliprec.toml
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the effective configuration as TOML
    Config,

    /// Print the codec profile
    Codec,

    /// List committed clips
    Clips {
        /// Only clips from this location
        #[arg(short, long)]
        location: Option<String>,

        /// Emit JSON instead of a table
        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let (config, sources) = ClipConfig::load_with_sources_from(cli.config.as_deref())
        .context("Failed to load configuration")?;

    if let Err(e) = cliprec::telemetry::init(&config.telemetry) {
        eprintln!("logging disabled: {e:#}");
    }
    tracing::debug!(files = ?sources.files, "configuration loaded");

    match cli.command {
        Commands::Config => commands::show_config(&config, &sources),
        Commands::Codec => commands::show_codec(&config),
        Commands::Clips { location, json } => {
            commands::list_clips(&config, location.as_deref(), json)
        }
    }
}
