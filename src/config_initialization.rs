//! Configuration initialization and hierarchy management
//!
//! Precedence: CLI > Env > File > Defaults.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::config::AppConfig;
use crate::engine::{MaskStrategy, Rgb};
use crate::error::{CircleError, CircleResult};

/// Files tried, in order, when no explicit config path is given
pub const DEFAULT_CONFIG_PATHS: [&str; 2] = ["circle.toml", "config/circle.toml"];

/// Prefix of every environment override
pub const ENV_PREFIX: &str = "CIRCLE_";

/// Values given on the command line; `None` leaves the lower layers alone
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub config_path: Option<PathBuf>,
    pub log_level: Option<String>,
    pub json_logs: bool,
    pub ffmpeg_path: Option<PathBuf>,
    pub ffprobe_path: Option<PathBuf>,
    pub temp_root: Option<PathBuf>,
    pub max_upload_mb: Option<u64>,
    pub default_preset: Option<String>,
    pub interactive: Option<bool>,
    pub mask_strategy: Option<MaskStrategy>,
    pub background: Option<Rgb>,
    pub max_concurrent_jobs: Option<usize>,
}

/// Final configuration plus where its values came from
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub config: AppConfig,
    pub file: Option<PathBuf>,
    pub env_overrides: Vec<String>,
    pub cli_overrides: Vec<&'static str>,
}

/// Resolve the configuration hierarchy from the process environment
pub fn initialize_configuration_hierarchy(
    overrides: &ConfigOverrides,
) -> CircleResult<ResolvedConfig> {
    resolve_with_env(overrides, |key| std::env::var(key).ok())
}

/// Resolve the hierarchy with an explicit environment lookup
pub fn resolve_with_env<F>(overrides: &ConfigOverrides, env: F) -> CircleResult<ResolvedConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let (mut config, file) = load_config_file(overrides.config_path.as_deref())?;
    let env_overrides = apply_environment(&mut config, env)?;
    let cli_overrides = apply_cli_overrides(&mut config, overrides);
    config.validate()?;
    Ok(ResolvedConfig {
        config,
        file,
        env_overrides,
        cli_overrides,
    })
}

/// Load the first config file found; an explicit path must exist
fn load_config_file(explicit: Option<&Path>) -> CircleResult<(AppConfig, Option<PathBuf>)> {
    if let Some(path) = explicit {
        return parse_config_file(path).map(|config| (config, Some(path.to_path_buf())));
    }
    for candidate in DEFAULT_CONFIG_PATHS {
        let path = Path::new(candidate);
        if path.is_file() {
            return parse_config_file(path).map(|config| (config, Some(path.to_path_buf())));
        }
    }
    Ok((AppConfig::default(), None))
}

/// Parse TOML or YAML, chosen by extension
pub fn parse_config_file(path: &Path) -> CircleResult<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| CircleError::Config {
        message: format!("Cannot read config file {}: {}", path.display(), e),
    })?;
    let extension = path
        .extension()
        .map(|ext| ext.to_string_lossy().to_ascii_lowercase());
    match extension.as_deref() {
        Some("yaml") | Some("yml") => {
            serde_yaml::from_str(&content).map_err(|e| CircleError::Config {
                message: format!("Failed to parse YAML config {}: {}", path.display(), e),
            })
        }
        _ => toml::from_str(&content).map_err(|e| CircleError::Config {
            message: format!("Failed to parse TOML config {}: {}", path.display(), e),
        }),
    }
}

fn parse_env<T>(key: &str, value: &str) -> CircleResult<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e: T::Err| CircleError::Config {
        message: format!("Invalid value '{}' for {}: {}", value, key, e),
    })
}

fn parse_env_bool(key: &str, value: &str) -> CircleResult<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(CircleError::Config {
            message: format!("Invalid boolean '{}' for {}", value, key),
        }),
    }
}

/// Apply `CIRCLE_*` variables, returning the names that were set
fn apply_environment<F>(config: &mut AppConfig, env: F) -> CircleResult<Vec<String>>
where
    F: Fn(&str) -> Option<String>,
{
    let mut applied = Vec::new();
    let mut lookup = |suffix: &str| {
        let key = format!("{}{}", ENV_PREFIX, suffix);
        let value = env(&key)?;
        applied.push(key.clone());
        Some((key, value))
    };

    if let Some((_, v)) = lookup("FFMPEG") {
        config.ffmpeg_path = PathBuf::from(v);
    }
    if let Some((_, v)) = lookup("FFPROBE") {
        config.ffprobe_path = PathBuf::from(v);
    }
    if let Some((_, v)) = lookup("TEMP_ROOT") {
        config.temp_root = PathBuf::from(v);
    }
    if let Some((k, v)) = lookup("MAX_UPLOAD_MB") {
        config.max_upload_mb = parse_env(&k, &v)?;
    }
    if let Some((k, v)) = lookup("MAX_DURATION_SECS") {
        config.max_duration_secs = parse_env(&k, &v)?;
    }
    if let Some((_, v)) = lookup("DEFAULT_PRESET") {
        config.default_preset = v.trim().to_string();
    }
    if let Some((k, v)) = lookup("INTERACTIVE") {
        config.interactive = parse_env_bool(&k, &v)?;
    }
    if let Some((k, v)) = lookup("SELECTION_TTL_SECS") {
        config.selection_ttl_secs = parse_env(&k, &v)?;
    }
    if let Some((k, v)) = lookup("MASK_STRATEGY") {
        config.mask_strategy = parse_env(&k, &v)?;
    }
    if let Some((k, v)) = lookup("BACKGROUND") {
        config.background = parse_env(&k, &v)?;
    }
    if let Some((k, v)) = lookup("MAX_CONCURRENT_JOBS") {
        config.max_concurrent_jobs = parse_env(&k, &v)?;
    }
    if let Some((k, v)) = lookup("TIMEOUT_SCALE") {
        config.timeout_scale = parse_env(&k, &v)?;
    }
    if let Some((k, v)) = lookup("PROBE_TIMEOUT_SECS") {
        config.probe_timeout_secs = parse_env(&k, &v)?;
    }
    if let Some((_, v)) = lookup("LOG_LEVEL") {
        config.log_level = v.trim().to_ascii_lowercase();
    }
    if let Some((k, v)) = lookup("JSON_LOGS") {
        config.json_logs = parse_env_bool(&k, &v)?;
    }

    Ok(applied)
}

/// Apply CLI arguments, returning the config keys they touched
fn apply_cli_overrides(config: &mut AppConfig, cli: &ConfigOverrides) -> Vec<&'static str> {
    let mut applied = Vec::new();

    if let Some(level) = &cli.log_level {
        config.log_level = level.to_ascii_lowercase();
        applied.push("log_level");
    }
    if cli.json_logs {
        config.json_logs = true;
        applied.push("json_logs");
    }
    if let Some(path) = &cli.ffmpeg_path {
        config.ffmpeg_path = path.clone();
        applied.push("ffmpeg_path");
    }
    if let Some(path) = &cli.ffprobe_path {
        config.ffprobe_path = path.clone();
        applied.push("ffprobe_path");
    }
    if let Some(root) = &cli.temp_root {
        config.temp_root = root.clone();
        applied.push("temp_root");
    }
    if let Some(mb) = cli.max_upload_mb {
        config.max_upload_mb = mb;
        applied.push("max_upload_mb");
    }
    if let Some(preset) = &cli.default_preset {
        config.default_preset = preset.clone();
        applied.push("default_preset");
    }
    if let Some(interactive) = cli.interactive {
        config.interactive = interactive;
        applied.push("interactive");
    }
    if let Some(mask) = cli.mask_strategy {
        config.mask_strategy = mask;
        applied.push("mask_strategy");
    }
    if let Some(background) = cli.background {
        config.background = background;
        applied.push("background");
    }
    if let Some(jobs) = cli.max_concurrent_jobs {
        config.max_concurrent_jobs = jobs;
        applied.push("max_concurrent_jobs");
    }

    applied
}
