// Adapters - External system implementations

pub mod console_channel;
pub mod exec_ffmpeg;
pub mod probe_ffprobe;
pub mod tracing_log;

// Re-export adapters
pub use console_channel::{ConsoleChannel, DeliveredClip, Delivery};
pub use exec_ffmpeg::FfmpegEngine;
pub use probe_ffprobe::FfprobeAdapter;
pub use tracing_log::init_logging;
