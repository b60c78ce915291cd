//! FFprobe adapter for media file probing
//!
//! Runs `ffprobe -print_format json -show_format -show_streams` and maps the
//! first real video stream, audio presence and container duration. Reported
//! dimensions are the upright ones: ffmpeg autorotates before the filter
//! graph, so quarter-turn sources have width and height swapped.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::process::Command;
use tracing::debug;

use crate::domain::model::{Dimensions, MediaFacts};
use crate::error::{CircleError, CircleResult};
use crate::ports::ProbePort;

/// FFprobe-based probe adapter
#[derive(Debug, Clone)]
pub struct FfprobeAdapter {
    program: PathBuf,
    timeout: Duration,
}

impl FfprobeAdapter {
    pub fn new(program: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            timeout,
        }
    }

    fn args(path: &Path) -> Vec<String> {
        vec![
            "-v".to_string(),
            "error".to_string(),
            "-print_format".to_string(),
            "json".to_string(),
            "-show_format".to_string(),
            "-show_streams".to_string(),
            path.to_string_lossy().into_owned(),
        ]
    }
}

#[async_trait]
impl ProbePort for FfprobeAdapter {
    async fn probe(&self, path: &Path) -> CircleResult<MediaFacts> {
        debug!("Probing {} with {}", path.display(), self.program.display());

        let mut cmd = Command::new(&self.program);
        cmd.args(Self::args(path))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let child = cmd.spawn().map_err(|e| {
            CircleError::probe(
                path,
                format!("failed to spawn {}: {}", self.program.display(), e),
            )
        })?;

        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                return Err(CircleError::probe(
                    path,
                    format!("I/O error waiting for ffprobe: {}", e),
                ))
            }
            Err(_) => {
                return Err(CircleError::probe(
                    path,
                    format!("ffprobe timed out after {:?}", self.timeout),
                ))
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(CircleError::probe(
                path,
                format!("ffprobe exited with {}: {}", output.status, stderr.trim()),
            ));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        parse_ffprobe_json(path, &stdout)
    }
}

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    #[serde(default)]
    streams: Vec<FfprobeStream>,
    format: Option<FfprobeFormat>,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    codec_type: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    #[serde(default)]
    disposition: FfprobeDisposition,
    #[serde(default)]
    tags: FfprobeTags,
    #[serde(default)]
    side_data_list: Vec<FfprobeSideData>,
}

#[derive(Debug, Default, Deserialize)]
struct FfprobeDisposition {
    #[serde(default)]
    attached_pic: u8,
}

#[derive(Debug, Default, Deserialize)]
struct FfprobeTags {
    rotate: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeSideData {
    rotation: Option<f64>,
}

impl FfprobeStream {
    fn is_type(&self, kind: &str) -> bool {
        self.codec_type.as_deref() == Some(kind)
    }

    /// Display rotation in degrees, normalised to 0..360.
    ///
    /// The display matrix side data wins over the legacy `rotate` tag.
    fn rotation(&self) -> u32 {
        let degrees = self
            .side_data_list
            .iter()
            .find_map(|side| side.rotation)
            .or_else(|| {
                self.tags
                    .rotate
                    .as_deref()
                    .and_then(|raw| raw.trim().parse::<f64>().ok())
            })
            .filter(|deg| deg.is_finite())
            .unwrap_or(0.0);
        (degrees.round() as i64).rem_euclid(360) as u32
    }

    /// Frame size after ffmpeg applies the display rotation
    fn display_size(&self) -> Option<(u32, u32)> {
        let (width, height) = (self.width?, self.height?);
        match self.rotation() {
            90 | 270 => Some((height, width)),
            _ => Some((width, height)),
        }
    }
}

/// Map ffprobe's JSON report to [`MediaFacts`]
pub fn parse_ffprobe_json(path: &Path, json: &str) -> CircleResult<MediaFacts> {
    let report: FfprobeOutput = serde_json::from_str(json)
        .map_err(|e| CircleError::probe(path, format!("unreadable ffprobe output: {}", e)))?;

    let video = report
        .streams
        .iter()
        .find(|s| s.is_type("video") && s.disposition.attached_pic == 0)
        .ok_or_else(|| CircleError::probe(path, "no video stream"))?;

    let dimensions = video
        .display_size()
        .and_then(|(width, height)| Dimensions::new(width, height))
        .ok_or_else(|| CircleError::probe(path, "video stream has no usable dimensions"))?;

    let has_audio = report.streams.iter().any(|s| s.is_type("audio"));

    let duration = report
        .format
        .and_then(|format| format.duration)
        .and_then(|raw| raw.trim().parse::<f64>().ok())
        .filter(|secs| secs.is_finite() && *secs > 0.0)
        .map(Duration::from_secs_f64);

    Ok(MediaFacts {
        dimensions,
        has_audio,
        duration,
    })
}
