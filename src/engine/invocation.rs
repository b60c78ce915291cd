//! Declarative description of one codec engine run

use std::path::PathBuf;
use std::time::Duration;

use crate::presets::QualityPreset;

/// One input file of an invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputSpec {
    pub path: PathBuf,
}

impl InputSpec {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

/// Video encoder parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoParams {
    pub codec: String,
    pub crf: u8,
    pub speed: String,
    pub max_bitrate_kbps: u32,
    pub buffer_size_kbps: u32,
    pub pixel_format: String,
    pub profile: String,
    pub level: String,
}

impl VideoParams {
    /// H.264 parameters for a preset
    pub fn from_preset(preset: &QualityPreset) -> Self {
        Self {
            codec: "libx264".to_string(),
            crf: preset.crf,
            speed: preset.speed.to_string(),
            max_bitrate_kbps: preset.max_bitrate_kbps,
            buffer_size_kbps: preset.buffer_size_kbps(),
            pixel_format: "yuv420p".to_string(),
            profile: "high".to_string(),
            level: "4.0".to_string(),
        }
    }
}

/// Audio encoder parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioParams {
    pub codec: String,
    pub bitrate_kbps: u32,
    pub sample_rate: u32,
    pub channels: u8,
}

impl AudioParams {
    /// AAC parameters for a preset
    pub fn from_preset(preset: &QualityPreset) -> Self {
        Self {
            codec: "aac".to_string(),
            bitrate_kbps: preset.audio_bitrate_kbps,
            sample_rate: preset.audio_sample_rate,
            channels: preset.audio_channels,
        }
    }
}

/// What happens to the audio track
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AudioPlan {
    /// Re-encode the given input stream
    Encode { stream: String, params: AudioParams },
    /// Pass the given input stream through untouched
    Copy { stream: String },
    /// Produce no audio track
    Omit,
}

/// A single encode: inputs, one filter graph, codec parameters and one output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodeInvocation {
    pub inputs: Vec<InputSpec>,
    /// Complex filter graph producing the labelled video stream
    pub filter_graph: String,
    /// Output label of the filter graph, without brackets
    pub video_label: String,
    pub video: VideoParams,
    pub audio: AudioPlan,
    /// Container flags, e.g. `+faststart`
    pub movflags: Option<String>,
    pub max_duration: Duration,
    pub output: PathBuf,
}

impl EncodeInvocation {
    /// Mapping spec for the filtered video stream
    pub fn video_map(&self) -> String {
        format!("[{}]", self.video_label)
    }
}
