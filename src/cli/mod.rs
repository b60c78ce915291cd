//! CLI module for circler
//!
//! This module handles command-line argument parsing and command execution.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config_initialization::ConfigOverrides;

pub mod args;
pub mod commands;

/// Round video note maker
///
/// Crops a video to a centred square, scales it to a preset size and masks it
/// to a circle.
#[derive(Parser, Debug)]
#[command(name = "circler")]
#[command(about = "Turn rectangular videos into round video notes")]
#[command(version)]
pub struct Cli {
    /// Configuration file (TOML or YAML)
    #[arg(long, global = true, env = "CIRCLE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Logging level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    pub json_logs: bool,

    /// ffmpeg executable
    #[arg(long, global = true)]
    pub ffmpeg: Option<PathBuf>,

    /// ffprobe executable
    #[arg(long, global = true)]
    pub ffprobe: Option<PathBuf>,

    /// Directory for per-job scratch space
    #[arg(long, global = true)]
    pub temp_root: Option<PathBuf>,

    /// Upload ceiling in MiB
    #[arg(long, global = true, value_parser = args::upload_limit_mb)]
    pub max_upload_mb: Option<u64>,

    /// Encodes allowed to run at once
    #[arg(long, global = true, value_parser = args::job_slots)]
    pub jobs: Option<usize>,

    /// The command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Convert one video file into a circle clip
    Convert(args::ConvertArgs),
    /// Line-based chat session on stdin
    Chat(args::ChatArgs),
    /// List the quality presets
    Presets(args::PresetsArgs),
    /// Probe a video file and show the planned crop
    Probe(args::ProbeArgs),
}

impl Cli {
    /// Configuration overrides carried by the command line
    pub fn overrides(&self) -> ConfigOverrides {
        let mut overrides = ConfigOverrides {
            config_path: self.config.clone(),
            log_level: self.log_level.clone(),
            json_logs: self.json_logs,
            ffmpeg_path: self.ffmpeg.clone(),
            ffprobe_path: self.ffprobe.clone(),
            temp_root: self.temp_root.clone(),
            max_upload_mb: self.max_upload_mb,
            max_concurrent_jobs: self.jobs,
            ..ConfigOverrides::default()
        };

        match &self.command {
            Commands::Convert(args) => {
                overrides.interactive = Some(false);
                overrides.default_preset = args.preset.clone();
                overrides.mask_strategy = args.mask;
                overrides.background = args.background;
            }
            Commands::Chat(args) if args.no_choice => overrides.interactive = Some(false),
            _ => {}
        }
        overrides
    }
}
