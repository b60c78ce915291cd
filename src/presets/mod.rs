//! Quality preset registry
//!
//! A fixed table of named encoding bundles. The table is built once per
//! process and never mutated; every lookup returns the same preset for the
//! same key.

use std::sync::OnceLock;
use std::time::Duration;

use serde::Serialize;

use crate::error::{CircleError, CircleResult};

/// Key substituted when no interactive choice is offered
pub const DEFAULT_PRESET_KEY: &str = "balanced";

/// Callback data prefix used for preset choice buttons
pub const CHOICE_PREFIX: &str = "q_";

/// Named bundle of output size and encoding parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QualityPreset {
    /// Registry key
    pub key: &'static str,
    /// Human-readable label shown on selection surfaces
    pub label: &'static str,
    /// Output frame edge in pixels (frames are square)
    pub output_size: u32,
    /// x264 constant rate factor
    pub crf: u8,
    /// x264 speed preset name
    pub speed: &'static str,
    /// Video bitrate ceiling in kbit/s
    pub max_bitrate_kbps: u32,
    /// AAC bitrate in kbit/s
    pub audio_bitrate_kbps: u32,
    /// Audio sample rate in Hz
    pub audio_sample_rate: u32,
    /// Audio channel count
    pub audio_channels: u8,
    /// Longest output this preset will produce
    #[serde(serialize_with = "serialize_secs")]
    pub duration_allowance: Duration,
    /// Wall-clock budget for one encode
    #[serde(serialize_with = "serialize_secs")]
    pub timeout_budget: Duration,
}

impl QualityPreset {
    /// Rate-control buffer, twice the bitrate ceiling
    pub fn buffer_size_kbps(&self) -> u32 {
        self.max_bitrate_kbps * 2
    }

    /// Callback data identifying this preset on a selection surface
    pub fn choice_data(&self) -> String {
        format!("{}{}", CHOICE_PREFIX, self.key)
    }
}

fn serialize_secs<S: serde::Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u64(value.as_secs())
}

/// One selectable option derived from a preset
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PresetOption {
    pub key: &'static str,
    pub label: String,
    pub data: String,
}

/// Extract the preset key from choice callback data (`q_<key>`)
pub fn parse_choice_data(data: &str) -> Option<&str> {
    data.strip_prefix(CHOICE_PREFIX).filter(|key| !key.is_empty())
}

/// Read-only preset table
#[derive(Debug)]
pub struct QualityPresetRegistry {
    presets: Vec<QualityPreset>,
}

static REGISTRY: OnceLock<QualityPresetRegistry> = OnceLock::new();

impl QualityPresetRegistry {
    /// Process-wide registry, built on first use
    pub fn global() -> &'static QualityPresetRegistry {
        REGISTRY.get_or_init(|| QualityPresetRegistry {
            presets: builtin_presets(),
        })
    }

    /// Look up a preset by key
    pub fn lookup(&self, key: &str) -> CircleResult<&QualityPreset> {
        self.presets
            .iter()
            .find(|preset| preset.key == key)
            .ok_or_else(|| CircleError::UnknownPreset {
                key: key.to_string(),
            })
    }

    /// The preset used when no choice is offered
    pub fn default_preset(&self) -> &QualityPreset {
        self.presets
            .iter()
            .find(|preset| preset.key == DEFAULT_PRESET_KEY)
            .unwrap_or(&self.presets[0])
    }

    /// Presets in ascending size order
    pub fn iter(&self) -> impl Iterator<Item = &QualityPreset> {
        self.presets.iter()
    }

    /// All registry keys
    pub fn keys(&self) -> Vec<&'static str> {
        self.presets.iter().map(|preset| preset.key).collect()
    }

    /// Options for an interactive selection surface
    pub fn options(&self) -> Vec<PresetOption> {
        self.presets
            .iter()
            .map(|preset| PresetOption {
                key: preset.key,
                label: format!(
                    "{} ({}x{}, up to {}s)",
                    preset.label,
                    preset.output_size,
                    preset.output_size,
                    preset.timeout_budget.as_secs()
                ),
                data: preset.choice_data(),
            })
            .collect()
    }
}

fn builtin_presets() -> Vec<QualityPreset> {
    vec![
        QualityPreset {
            key: "fast",
            label: "240p fast",
            output_size: 240,
            crf: 25,
            speed: "ultrafast",
            max_bitrate_kbps: 300,
            audio_bitrate_kbps: 96,
            audio_sample_rate: 44_100,
            audio_channels: 2,
            duration_allowance: Duration::from_secs(30),
            timeout_budget: Duration::from_secs(30),
        },
        QualityPreset {
            key: "balanced",
            label: "320p balanced",
            output_size: 320,
            crf: 23,
            speed: "fast",
            max_bitrate_kbps: 500,
            audio_bitrate_kbps: 128,
            audio_sample_rate: 48_000,
            audio_channels: 2,
            duration_allowance: Duration::from_secs(60),
            timeout_budget: Duration::from_secs(40),
        },
        QualityPreset {
            key: "quality",
            label: "480p quality",
            output_size: 480,
            crf: 20,
            speed: "medium",
            max_bitrate_kbps: 800,
            audio_bitrate_kbps: 160,
            audio_sample_rate: 48_000,
            audio_channels: 2,
            duration_allowance: Duration::from_secs(60),
            timeout_budget: Duration::from_secs(50),
        },
        QualityPreset {
            key: "best",
            label: "512p best",
            output_size: 512,
            crf: 18,
            speed: "medium",
            max_bitrate_kbps: 1000,
            audio_bitrate_kbps: 192,
            audio_sample_rate: 48_000,
            audio_channels: 2,
            duration_allowance: Duration::from_secs(60),
            timeout_budget: Duration::from_secs(60),
        },
        QualityPreset {
            key: "ultra",
            label: "640p ultra",
            output_size: 640,
            crf: 16,
            speed: "medium",
            max_bitrate_kbps: 1500,
            audio_bitrate_kbps: 192,
            audio_sample_rate: 48_000,
            audio_channels: 2,
            duration_allowance: Duration::from_secs(60),
            timeout_budget: Duration::from_secs(90),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_is_total_for_known_keys() {
        let registry = QualityPresetRegistry::global();
        for key in registry.keys() {
            let preset = registry.lookup(key).unwrap();
            assert_eq!(preset.key, key);
        }
    }

    #[test]
    fn test_lookup_is_deterministic() {
        let registry = QualityPresetRegistry::global();
        let first = registry.lookup("quality").unwrap().clone();
        let second = registry.lookup("quality").unwrap().clone();
        assert_eq!(first, second);
    }

    #[test]
    fn test_unknown_key_is_an_error() {
        let registry = QualityPresetRegistry::global();
        match registry.lookup("8k") {
            Err(CircleError::UnknownPreset { key }) => assert_eq!(key, "8k"),
            other => panic!("unexpected lookup result: {:?}", other),
        }
        assert!(registry.lookup("").is_err());
        assert!(registry.lookup("Balanced").is_err());
    }

    #[test]
    fn test_table_is_internally_consistent() {
        let presets: Vec<_> = QualityPresetRegistry::global().iter().cloned().collect();
        for pair in presets.windows(2) {
            let (smaller, larger) = (&pair[0], &pair[1]);
            assert!(smaller.output_size < larger.output_size);
            assert!(smaller.max_bitrate_kbps <= larger.max_bitrate_kbps);
            assert!(smaller.timeout_budget <= larger.timeout_budget);
        }
        for preset in &presets {
            assert_eq!(preset.output_size % 2, 0, "{} must be even for yuv420p", preset.key);
            assert!(preset.crf <= 51);
        }
    }

    #[test]
    fn test_default_preset_is_balanced_320() {
        let preset = QualityPresetRegistry::global().default_preset();
        assert_eq!(preset.key, DEFAULT_PRESET_KEY);
        assert_eq!(preset.output_size, 320);
    }

    #[test]
    fn test_options_round_trip_through_choice_data() {
        let registry = QualityPresetRegistry::global();
        for option in registry.options() {
            let key = parse_choice_data(&option.data).unwrap();
            assert_eq!(registry.lookup(key).unwrap().key, option.key);
        }
    }

    #[test]
    fn test_parse_choice_data_rejects_foreign_data() {
        assert_eq!(parse_choice_data("q_fast"), Some("fast"));
        assert_eq!(parse_choice_data("q_"), None);
        assert_eq!(parse_choice_data("fast"), None);
    }

    #[test]
    fn test_buffer_size_is_twice_bitrate() {
        let preset = QualityPresetRegistry::global().lookup("ultra").unwrap();
        assert_eq!(preset.buffer_size_kbps(), 3000);
    }
}
