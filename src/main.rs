//! circler
//!
//! Command-line front end for the circle-clip pipeline: crop a video to a
//! centred square, scale it to a quality preset and mask it to a circle.
//!
//! # Usage
//!
//! ```bash
//! circler convert -i holiday.mov --preset quality
//! circler chat --out-dir circles
//! circler presets --format json
//! circler probe -i holiday.mov
//! ```

use anyhow::Result;
use clap::Parser;
use tracing::info;

use circle_clip::adapters::init_logging;
use circle_clip::cli::commands::{chat_command, convert_command, presets_command, probe_command};
use circle_clip::cli::{Cli, Commands};
use circle_clip::config_initialization::initialize_configuration_hierarchy;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let resolved = initialize_configuration_hierarchy(&cli.overrides())?;
    let config = resolved.config;
    init_logging(&config.log_level, config.json_logs);

    info!("Starting circler {}", env!("CARGO_PKG_VERSION"));
    match &resolved.file {
        Some(path) => info!("Configuration file: {}", path.display()),
        None => info!("No configuration file found, using defaults"),
    }
    if !resolved.env_overrides.is_empty() {
        info!("Environment overrides: {}", resolved.env_overrides.join(", "));
    }
    if !resolved.cli_overrides.is_empty() {
        info!("Command-line overrides: {}", resolved.cli_overrides.join(", "));
    }

    match cli.command {
        Commands::Convert(args) => {
            info!("Executing convert command");
            convert_command(&config, args).await?;
        }
        Commands::Chat(args) => {
            info!("Executing chat command");
            chat_command(&config, args).await?;
        }
        Commands::Presets(args) => presets_command(args)?,
        Commands::Probe(args) => {
            info!("Executing probe command");
            probe_command(&config, args).await?;
        }
    }

    Ok(())
}
