//! Grayscale mask image for the bitmap strategy

use std::path::Path;

use image::{GrayImage, ImageFormat, Luma};
use tracing::debug;

use crate::engine::filter_graph::MaskGeometry;
use crate::error::{CircleError, CircleResult};

const KEEP: Luma<u8> = Luma([255]);
const DROP: Luma<u8> = Luma([0]);

/// White disc on black, `size` pixels square
pub fn render_mask(size: u32) -> GrayImage {
    let geometry = MaskGeometry::for_size(size);
    GrayImage::from_fn(size, size, |x, y| {
        if geometry.contains(x, y) {
            KEEP
        } else {
            DROP
        }
    })
}

/// Render the mask and write it as PNG, off the async runtime
pub async fn write_mask(size: u32, destination: &Path) -> CircleResult<()> {
    let path = destination.to_path_buf();
    tokio::task::spawn_blocking(move || {
        render_mask(size)
            .save_with_format(&path, ImageFormat::Png)
            .map_err(|e| CircleError::Worker {
                message: format!("Failed to write mask image {}: {}", path.display(), e),
            })
    })
    .await
    .map_err(|e| CircleError::Worker {
        message: format!("Mask rendering task failed: {}", e),
    })??;
    debug!("Wrote {}x{} mask to {}", size, size, destination.display());
    Ok(())
}
