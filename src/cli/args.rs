//! Command-line argument definitions

use std::path::PathBuf;

use clap::{Args, ValueEnum};
use clap_num::number_range;

use crate::engine::{MaskStrategy, Rgb};

/// Rendering of listings and probe reports
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
    Yaml,
}

pub(crate) fn upload_limit_mb(s: &str) -> Result<u64, String> {
    number_range(s, 1, 2048)
}

pub(crate) fn job_slots(s: &str) -> Result<usize, String> {
    number_range(s, 1, 256)
}

fn mask_strategy(s: &str) -> Result<MaskStrategy, String> {
    s.parse()
}

fn colour(s: &str) -> Result<Rgb, String> {
    s.parse()
}

/// Arguments for the convert command
#[derive(Args, Debug)]
pub struct ConvertArgs {
    /// Input video file path
    #[arg(short, long)]
    pub input: PathBuf,

    /// Output file path (default: <input>_circle.mp4 next to the input)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Quality preset key
    #[arg(short, long)]
    pub preset: Option<String>,

    /// Mask strategy: procedural or bitmap
    #[arg(long, value_parser = mask_strategy)]
    pub mask: Option<MaskStrategy>,

    /// Colour outside the circle, e.g. #000000
    #[arg(long, value_parser = colour)]
    pub background: Option<Rgb>,
}

/// Arguments for the chat command
#[derive(Args, Debug)]
pub struct ChatArgs {
    /// Requester identity for the session
    #[arg(short, long, default_value = "local")]
    pub user: String,

    /// Directory finished circles are written to
    #[arg(long, default_value = ".")]
    pub out_dir: PathBuf,

    /// Skip the preset choice and use the default preset for every upload
    #[arg(long)]
    pub no_choice: bool,
}

/// Arguments for the presets command
#[derive(Args, Debug)]
pub struct PresetsArgs {
    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

/// Arguments for the probe command
#[derive(Args, Debug)]
pub struct ProbeArgs {
    /// Input video file path
    #[arg(short, long)]
    pub input: PathBuf,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}
