//! Application configuration

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::engine::{MaskStrategy, Rgb, TranscoderSettings};
use crate::error::{CircleError, CircleResult};
use crate::presets::{QualityPresetRegistry, DEFAULT_PRESET_KEY};

/// Hard ceiling of the messaging platform for round video notes
pub const PLATFORM_MAX_DURATION_SECS: u64 = 60;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Resolved settings for the whole application
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// ffmpeg executable, looked up on PATH when relative
    pub ffmpeg_path: PathBuf,
    /// ffprobe executable, looked up on PATH when relative
    pub ffprobe_path: PathBuf,
    /// Directory holding per-job workspaces
    pub temp_root: PathBuf,
    /// Upload ceiling in MiB
    pub max_upload_mb: u64,
    /// Global output length cap in seconds
    pub max_duration_secs: u64,
    /// Preset used when no choice is offered
    pub default_preset: String,
    /// Offer a preset choice after each upload
    pub interactive: bool,
    /// Lifetime of an unanswered preset choice in seconds
    pub selection_ttl_secs: u64,
    pub mask_strategy: MaskStrategy,
    /// Colour outside the circle
    pub background: Rgb,
    /// Encodes allowed to run at once
    pub max_concurrent_jobs: usize,
    /// Multiplier applied to every preset's timeout budget
    pub timeout_scale: f64,
    /// Deadline for one ffprobe run in seconds
    pub probe_timeout_secs: u64,
    /// Leftover job directories older than this are swept at startup
    pub stale_workspace_secs: u64,
    pub log_level: String,
    pub json_logs: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: PathBuf::from("ffmpeg"),
            ffprobe_path: PathBuf::from("ffprobe"),
            temp_root: std::env::temp_dir().join("circle-clip"),
            max_upload_mb: 50,
            max_duration_secs: PLATFORM_MAX_DURATION_SECS,
            default_preset: DEFAULT_PRESET_KEY.to_string(),
            interactive: true,
            selection_ttl_secs: 15 * 60,
            mask_strategy: MaskStrategy::Procedural,
            background: Rgb::BLACK,
            max_concurrent_jobs: num_cpus::get().max(1),
            timeout_scale: 1.0,
            probe_timeout_secs: 15,
            stale_workspace_secs: 60 * 60,
            log_level: "info".to_string(),
            json_logs: false,
        }
    }
}

impl AppConfig {
    /// Check cross-field constraints after every layer is applied
    pub fn validate(&self) -> CircleResult<()> {
        let invalid = |message: String| Err(CircleError::Config { message });

        if QualityPresetRegistry::global()
            .lookup(&self.default_preset)
            .is_err()
        {
            return invalid(format!(
                "default_preset '{}' is not one of: {}",
                self.default_preset,
                QualityPresetRegistry::global().keys().join(", ")
            ));
        }
        if self.max_upload_mb == 0 {
            return invalid("max_upload_mb must be positive".to_string());
        }
        if self.max_duration_secs == 0 || self.max_duration_secs > PLATFORM_MAX_DURATION_SECS {
            return invalid(format!(
                "max_duration_secs must be between 1 and {}",
                PLATFORM_MAX_DURATION_SECS
            ));
        }
        if self.max_concurrent_jobs == 0 {
            return invalid("max_concurrent_jobs must be at least 1".to_string());
        }
        if !self.timeout_scale.is_finite() || self.timeout_scale <= 0.0 {
            return invalid(format!(
                "timeout_scale must be a positive number, got {}",
                self.timeout_scale
            ));
        }
        if self.probe_timeout_secs == 0 {
            return invalid("probe_timeout_secs must be positive".to_string());
        }
        if !LOG_LEVELS.contains(&self.log_level.to_ascii_lowercase().as_str()) {
            return invalid(format!(
                "log_level '{}' is not one of: {}",
                self.log_level,
                LOG_LEVELS.join(", ")
            ));
        }
        Ok(())
    }

    pub fn max_upload_bytes(&self) -> u64 {
        self.max_upload_mb.saturating_mul(1024 * 1024)
    }

    pub fn max_duration(&self) -> Duration {
        Duration::from_secs(self.max_duration_secs)
    }

    pub fn selection_ttl(&self) -> Duration {
        Duration::from_secs(self.selection_ttl_secs)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }

    pub fn stale_workspace_age(&self) -> Duration {
        Duration::from_secs(self.stale_workspace_secs)
    }

    pub fn transcoder_settings(&self) -> TranscoderSettings {
        TranscoderSettings {
            mask: self.mask_strategy,
            background: self.background,
        }
    }
}
