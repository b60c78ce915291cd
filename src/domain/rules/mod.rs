// Domain rules - Business logic and policies

use crate::domain::model::*;
use crate::error::{CircleError, CircleResult};

/// Computes the centred square crop for a source frame
pub struct TransformPlanner;

impl TransformPlanner {
    /// Largest square centred in the frame. Odd leftovers go to the right/bottom edge.
    pub fn plan(dimensions: Dimensions) -> CropPlan {
        let size = dimensions.width.min(dimensions.height);
        CropPlan {
            size,
            x_offset: (dimensions.width - size) / 2,
            y_offset: (dimensions.height - size) / 2,
        }
    }
}

/// Admission rules applied to uploads before anything is downloaded
#[derive(Debug, Clone, Copy)]
pub struct UploadPolicy {
    pub max_upload_bytes: u64,
}

impl UploadPolicy {
    pub fn new(max_upload_bytes: u64) -> Self {
        Self { max_upload_bytes }
    }

    /// Check an attachment against the size ceiling
    pub fn admit<'a>(&self, attachment: Option<&'a Attachment>) -> CircleResult<&'a Attachment> {
        let attachment = attachment.ok_or(CircleError::MissingAttachment)?;
        if attachment.size_bytes > self.max_upload_bytes {
            return Err(CircleError::UploadTooLarge {
                size: attachment.size_bytes,
                limit: self.max_upload_bytes,
            });
        }
        Ok(attachment)
    }
}
