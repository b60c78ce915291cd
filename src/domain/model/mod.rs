// Domain models - Core types and data structures

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::presets::QualityPreset;

/// Frame geometry of a probed video stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    /// Create dimensions, rejecting zero-sized frames
    pub fn new(width: u32, height: u32) -> Option<Self> {
        if width == 0 || height == 0 {
            return None;
        }
        Some(Self { width, height })
    }

    /// Whether the frame is already square
    pub fn is_square(&self) -> bool {
        self.width == self.height
    }
}

impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Everything the pipeline learns from probing a source file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaFacts {
    /// Upright geometry of the first video stream, after display rotation
    pub dimensions: Dimensions,
    /// At least one audio stream is present
    pub has_audio: bool,
    /// Container duration, when the container reports one
    pub duration: Option<Duration>,
}

/// Centred square region cut out of the source frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CropPlan {
    pub size: u32,
    pub x_offset: u32,
    pub y_offset: u32,
}

impl CropPlan {
    /// Whether the square lies entirely inside the given frame
    pub fn fits_within(&self, dimensions: &Dimensions) -> bool {
        self.x_offset as u64 + self.size as u64 <= dimensions.width as u64
            && self.y_offset as u64 + self.size as u64 <= dimensions.height as u64
    }
}

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

string_id!(
    /// Identity of the person sending commands
    RequesterId
);
string_id!(
    /// Conversation the replies go to
    ChatId
);
string_id!(
    /// Channel-specific handle of a sent or received message
    MessageRef
);
string_id!(
    /// Channel-specific handle of a downloadable file
    FileRef
);

/// Video attached to an upload command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub file: FileRef,
    pub size_bytes: u64,
    pub file_name: Option<String>,
}

impl Attachment {
    /// File extension to keep for the downloaded input, if any
    pub fn extension(&self) -> Option<String> {
        self.file_name.as_deref().and_then(sanitized_extension)
    }
}

/// Lowercase alphanumeric extension of an uploaded file name
fn sanitized_extension(name: &str) -> Option<String> {
    std::path::Path::new(name)
        .extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()))
}

/// Upload waiting for its requester to pick a preset
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingSelection {
    pub requester: RequesterId,
    pub chat: ChatId,
    pub source: FileRef,
    /// Name the upload arrived with, kept for the input file extension
    pub file_name: Option<String>,
    pub original_message: MessageRef,
    pub created_at: DateTime<Utc>,
}

impl PendingSelection {
    pub fn extension(&self) -> Option<String> {
        self.file_name.as_deref().and_then(sanitized_extension)
    }
}

/// Metadata delivered with a finished circle clip
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CircleMeta {
    /// Clip length in whole seconds, rounded up
    pub duration_secs: u32,
    /// Frame edge in pixels
    pub length: u32,
}

impl CircleMeta {
    /// Derive delivery metadata from the probed source and the duration cap
    pub fn for_output(source_duration: Option<Duration>, cap: Duration, length: u32) -> Self {
        let effective = source_duration.map_or(cap, |duration| duration.min(cap));
        let secs = effective.as_secs_f64().ceil().max(1.0) as u32;
        Self {
            duration_secs: secs,
            length,
        }
    }
}

/// Role-named files of one job
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobPaths {
    pub input: PathBuf,
    pub intermediate: PathBuf,
    pub mask: PathBuf,
    pub output: PathBuf,
}

/// One transcode request, owned by the execution that runs it
#[derive(Debug, Clone)]
pub struct TranscodeJob {
    pub paths: JobPaths,
    pub preset: QualityPreset,
    pub crop: CropPlan,
    pub has_audio: bool,
    /// Output length cap: the lesser of the preset allowance and the global maximum
    pub max_duration: Duration,
    pub deadline: Duration,
}

impl TranscodeJob {
    /// Create a job whose deadline is the preset's timeout budget
    pub fn new(
        paths: JobPaths,
        preset: QualityPreset,
        crop: CropPlan,
        has_audio: bool,
        global_max_duration: Duration,
    ) -> Self {
        let max_duration = preset.duration_allowance.min(global_max_duration);
        let deadline = preset.timeout_budget;
        Self {
            paths,
            preset,
            crop,
            has_audio,
            max_duration,
            deadline,
        }
    }

    /// Override the deadline
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    pub fn input_path(&self) -> &PathBuf {
        &self.paths.input
    }

    pub fn output_path(&self) -> &PathBuf {
        &self.paths.output
    }
}
