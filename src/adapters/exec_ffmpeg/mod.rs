//! FFmpeg execution adapter
//!
//! Renders an [`EncodeInvocation`] to ffmpeg arguments and runs it as a child
//! process. Cancellation kills the child and waits for it to exit.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Instant;

use async_trait::async_trait;
use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::engine::invocation::{AudioPlan, EncodeInvocation};
use crate::error::{CircleError, CircleResult};
use crate::ports::{CodecEngine, EngineReport};

/// Diagnostics kept from the end of stderr
const MAX_DIAGNOSTIC_BYTES: usize = 8 * 1024;

/// FFmpeg-based codec engine
#[derive(Debug, Clone)]
pub struct FfmpegEngine {
    program: PathBuf,
}

impl FfmpegEngine {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Full ffmpeg argument list for an invocation
    pub fn command_args(invocation: &EncodeInvocation) -> Vec<String> {
        let mut args: Vec<String> = ["-hide_banner", "-nostdin", "-loglevel", "error", "-y"]
            .iter()
            .map(|s| s.to_string())
            .collect();

        for input in &invocation.inputs {
            args.push("-i".to_string());
            args.push(input.path.to_string_lossy().into_owned());
        }

        args.push("-filter_complex".to_string());
        args.push(invocation.filter_graph.clone());
        args.push("-map".to_string());
        args.push(invocation.video_map());

        match &invocation.audio {
            AudioPlan::Encode { stream, params } => {
                args.extend([
                    "-map".to_string(),
                    stream.clone(),
                    "-c:a".to_string(),
                    params.codec.clone(),
                    "-b:a".to_string(),
                    format!("{}k", params.bitrate_kbps),
                    "-ar".to_string(),
                    params.sample_rate.to_string(),
                    "-ac".to_string(),
                    params.channels.to_string(),
                ]);
            }
            AudioPlan::Copy { stream } => {
                args.extend([
                    "-map".to_string(),
                    stream.clone(),
                    "-c:a".to_string(),
                    "copy".to_string(),
                ]);
            }
            AudioPlan::Omit => args.push("-an".to_string()),
        }

        let video = &invocation.video;
        args.extend([
            "-c:v".to_string(),
            video.codec.clone(),
            "-preset".to_string(),
            video.speed.clone(),
            "-crf".to_string(),
            video.crf.to_string(),
            "-maxrate".to_string(),
            format!("{}k", video.max_bitrate_kbps),
            "-bufsize".to_string(),
            format!("{}k", video.buffer_size_kbps),
            "-pix_fmt".to_string(),
            video.pixel_format.clone(),
            "-profile:v".to_string(),
            video.profile.clone(),
            "-level".to_string(),
            video.level.clone(),
        ]);

        if let Some(flags) = &invocation.movflags {
            args.push("-movflags".to_string());
            args.push(flags.clone());
        }

        args.push("-t".to_string());
        args.push(format!("{:.3}", invocation.max_duration.as_secs_f64()));
        args.push(invocation.output.to_string_lossy().into_owned());
        args
    }
}

fn tail(text: &str, max_bytes: usize) -> String {
    if text.len() <= max_bytes {
        return text.to_string();
    }
    let mut start = text.len() - max_bytes;
    while !text.is_char_boundary(start) {
        start += 1;
    }
    text[start..].to_string()
}

#[async_trait]
impl CodecEngine for FfmpegEngine {
    async fn run(
        &self,
        invocation: &EncodeInvocation,
        cancel: CancellationToken,
    ) -> CircleResult<EngineReport> {
        let started = Instant::now();
        let args = Self::command_args(invocation);
        debug!("{} {}", self.program.display(), args.join(" "));

        let mut cmd = Command::new(&self.program);
        cmd.args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd.spawn().map_err(|e| {
            CircleError::encode(
                format!("failed to spawn {}: {}", self.program.display(), e),
                String::new(),
            )
        })?;

        // Drain stderr while the child runs
        let stderr = child.stderr.take();
        let reader = tokio::spawn(async move {
            let mut buf = Vec::new();
            if let Some(mut stderr) = stderr {
                let _ = stderr.read_to_end(&mut buf).await;
            }
            String::from_utf8_lossy(&buf).into_owned()
        });

        let waited = tokio::select! {
            status = child.wait() => Some(status),
            _ = cancel.cancelled() => None,
        };

        let status = match waited {
            Some(status) => status.map_err(|e| {
                CircleError::encode(format!("I/O error waiting for ffmpeg: {}", e), String::new())
            })?,
            None => {
                warn!("Killing ffmpeg (pid {:?}) on cancellation", child.id());
                if let Err(e) = child.kill().await {
                    warn!("Failed to kill ffmpeg: {}", e);
                }
                reader.abort();
                return Err(CircleError::Worker {
                    message: "Encode cancelled".to_string(),
                });
            }
        };

        let diagnostics = tail(&reader.await.unwrap_or_default(), MAX_DIAGNOSTIC_BYTES);
        if !status.success() {
            return Err(CircleError::encode(
                format!("ffmpeg exited with {}", status),
                diagnostics,
            ));
        }

        Ok(EngineReport {
            diagnostics,
            elapsed: started.elapsed(),
        })
    }
}
