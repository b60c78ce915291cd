//! Circle transcoding engine
//!
//! Turns a [`TranscodeJob`](crate::domain::model::TranscodeJob) into one or two
//! codec engine invocations and runs them under a deadline.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub mod executor;
pub mod filter_graph;
pub mod invocation;
pub mod mask;
pub mod transcoder;

pub use executor::{JobExecutor, JobOutcome};
pub use filter_graph::Rgb;
pub use invocation::{AudioParams, AudioPlan, EncodeInvocation, InputSpec, VideoParams};
pub use transcoder::{CircleTranscoder, EncodePlan, TranscodeReport};

/// How the circular mask is applied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MaskStrategy {
    /// Per-pixel expression in the same pass as crop and scale
    #[default]
    Procedural,
    /// Square intermediate first, then composite against a rendered mask image
    Bitmap,
}

impl FromStr for MaskStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "procedural" => Ok(MaskStrategy::Procedural),
            "bitmap" => Ok(MaskStrategy::Bitmap),
            other => Err(format!(
                "Unknown mask strategy '{}'. Expected procedural or bitmap",
                other
            )),
        }
    }
}

impl fmt::Display for MaskStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MaskStrategy::Procedural => f.write_str("procedural"),
            MaskStrategy::Bitmap => f.write_str("bitmap"),
        }
    }
}

/// Settings shared by every job a transcoder runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TranscoderSettings {
    pub mask: MaskStrategy,
    pub background: Rgb,
}
