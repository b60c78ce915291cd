// User-facing texts

use crate::error::{CircleError, ErrorKind};
use crate::presets::{QualityPreset, QualityPresetRegistry};

pub const WELCOME: &str = "Hi! Send me a video and I will turn it into a round video note.\n\
Use /help for details.";

pub const SEND_VIDEO: &str = "Please send a video file.";

pub const CHOOSE_PRESET: &str = "Choose the quality of your circle:";

pub const PROBING: &str = "Inspecting the video...";
pub const ENCODING: &str = "Creating the circle...";
pub const SENDING: &str = "Sending the circle...";
pub const DONE: &str = "Done!";

pub fn queued(preset: &QualityPreset) -> String {
    format!(
        "Got it. Making a {}x{} circle ({}).",
        preset.output_size, preset.output_size, preset.label
    )
}

/// Help text listing every preset
pub fn help(max_upload_mb: u64, max_duration_secs: u64) -> String {
    let mut text = String::from(
        "How to use:\n\
         1. Send a video file of any common format\n\
         2. Pick a quality when asked\n\
         3. Wait for the round video note\n\nQualities:\n",
    );
    for preset in QualityPresetRegistry::global().iter() {
        text.push_str(&format!(
            "  {} - {}x{}, up to {}s of processing\n",
            preset.key,
            preset.output_size,
            preset.output_size,
            preset.timeout_budget.as_secs()
        ));
    }
    text.push_str(&format!(
        "\nHigher quality takes longer. Uploads up to {} MB; circles are cut to {} seconds.",
        max_upload_mb, max_duration_secs
    ));
    text
}

/// What the requester is told when a request fails
pub fn failure(err: &CircleError) -> String {
    match err {
        CircleError::UploadTooLarge { limit, .. } => format!(
            "The file is too large. Maximum size is {} MB.",
            limit / (1024 * 1024)
        ),
        CircleError::MissingAttachment => "I could not find a video in that message.".to_string(),
        CircleError::UnknownPreset { key } => {
            format!("Unknown quality '{}'. Please pick one of the offered options.", key)
        }
        _ => match err.kind() {
            ErrorKind::Probe => {
                "I could not read that video. Please check the file format.".to_string()
            }
            ErrorKind::TimedOut => "Processing took too long. Try a lower quality or a shorter clip."
                .to_string(),
            ErrorKind::NotFound => {
                "I no longer have your video. Please upload it again.".to_string()
            }
            ErrorKind::Encode => "Something went wrong while creating the circle.".to_string(),
            _ => "An internal error occurred. Please try again later.".to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn test_help_lists_every_preset() {
        let text = help(50, 60);
        for key in QualityPresetRegistry::global().keys() {
            assert!(text.contains(key), "help is missing {}", key);
        }
        assert!(text.contains("50 MB"));
    }

    #[test]
    fn test_failure_texts_hide_internals() {
        let encode = CircleError::encode("ffmpeg exited with 1", "[libx264] secret detail");
        assert!(!failure(&encode).contains("libx264"));

        let too_large = CircleError::UploadTooLarge {
            size: 60 * 1024 * 1024,
            limit: 50 * 1024 * 1024,
        };
        assert!(failure(&too_large).contains("50 MB"));

        let timed_out = CircleError::TimedOut {
            budget: Duration::from_secs(40),
        };
        assert!(failure(&timed_out).contains("lower quality"));

        let gone = CircleError::SelectionNotFound {
            requester: "alice".to_string(),
        };
        assert!(failure(&gone).contains("upload it again"));
    }
}
