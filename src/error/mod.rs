//! Error handling module for circle-clip

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Main error type for circle-clip operations
#[derive(Error, Debug)]
pub enum CircleError {
    /// Upload larger than the configured ceiling
    #[error("Upload of {size} bytes exceeds the limit of {limit} bytes")]
    UploadTooLarge { size: u64, limit: u64 },

    /// Preset key not present in the registry
    #[error("Unknown quality preset: {key}")]
    UnknownPreset { key: String },

    /// Upload command without a video attachment
    #[error("No video attachment in the message")]
    MissingAttachment,

    /// Media probe error
    #[error("Failed to probe {}: {message}", path.display())]
    Probe { path: PathBuf, message: String },

    /// Codec engine failure; `diagnostics` holds the engine's own output
    #[error("Encoding failed: {message}")]
    Encode { message: String, diagnostics: String },

    /// Deadline expired before the encode finished
    #[error("Encoding did not finish within {budget:?}")]
    TimedOut { budget: Duration },

    /// Preset chosen without a pending upload
    #[error("No pending upload for requester {requester}")]
    SelectionNotFound { requester: String },

    /// Invalid or unreadable configuration
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Message channel failure
    #[error("Message channel error: {message}")]
    Channel { message: String },

    /// Worker task failed outside the encoder
    #[error("Worker failure: {message}")]
    Worker { message: String },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Coarse classification driving how a failure is reported
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Probe,
    Encode,
    TimedOut,
    NotFound,
    Internal,
}

impl CircleError {
    /// Classify the error
    pub fn kind(&self) -> ErrorKind {
        match self {
            CircleError::UploadTooLarge { .. }
            | CircleError::UnknownPreset { .. }
            | CircleError::MissingAttachment => ErrorKind::Validation,
            CircleError::Probe { .. } => ErrorKind::Probe,
            CircleError::Encode { .. } => ErrorKind::Encode,
            CircleError::TimedOut { .. } => ErrorKind::TimedOut,
            CircleError::SelectionNotFound { .. } => ErrorKind::NotFound,
            CircleError::Config { .. }
            | CircleError::Channel { .. }
            | CircleError::Worker { .. }
            | CircleError::Io(_) => ErrorKind::Internal,
        }
    }

    /// Whether the requester can fix this by changing their input
    pub fn is_user_correctable(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::Validation | ErrorKind::NotFound | ErrorKind::TimedOut
        )
    }

    pub(crate) fn probe(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        CircleError::Probe {
            path: path.into(),
            message: message.into(),
        }
    }

    pub(crate) fn encode(message: impl Into<String>, diagnostics: impl Into<String>) -> Self {
        CircleError::Encode {
            message: message.into(),
            diagnostics: diagnostics.into(),
        }
    }
}

/// Result type alias for circle-clip operations
pub type CircleResult<T> = std::result::Result<T, CircleError>;
