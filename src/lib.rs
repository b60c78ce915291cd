//! circle-clip library
//!
//! Turns rectangular video clips into round video notes. An upload is
//! admitted against a size ceiling, probed, cropped to a centred square,
//! scaled to a quality preset, masked to a circle and delivered back over a
//! message channel. Encodes run under a concurrency limit and a per-job
//! deadline, each inside its own scratch directory.

pub mod adapters;
pub mod app;
pub mod cli;
pub mod config;
pub mod config_initialization;
pub mod domain;
pub mod engine;
pub mod error;
pub mod ports;
pub mod presets;
pub mod session;
pub mod workspace;

// Re-export commonly used types
pub use config::AppConfig;
pub use domain::model::{Attachment, CircleMeta, CropPlan, Dimensions, MediaFacts, TranscodeJob};
pub use engine::{CircleTranscoder, JobExecutor, JobOutcome, MaskStrategy};
pub use error::{CircleError, CircleResult};
pub use presets::{QualityPreset, QualityPresetRegistry};
