//! Circle transcoder: plans and runs the encode stages of one job

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::domain::model::TranscodeJob;
use crate::engine::filter_graph::{self, VIDEO_LABEL};
use crate::engine::invocation::*;
use crate::engine::mask;
use crate::engine::{MaskStrategy, TranscoderSettings};
use crate::error::{CircleError, CircleResult};
use crate::ports::CodecEngine;

const FASTSTART: &str = "+faststart";
const FIRST_AUDIO: &str = "0:a:0";

/// Ordered engine invocations for one job
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodePlan {
    pub stages: Vec<EncodeInvocation>,
    /// Mask image the stages read, rendered before the first stage runs
    pub mask_image: Option<PathBuf>,
}

/// Result of a completed transcode
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscodeReport {
    pub output: PathBuf,
    pub bytes: u64,
    pub stages: usize,
    pub elapsed: Duration,
}

/// Produces circular clips through a [`CodecEngine`]
pub struct CircleTranscoder {
    engine: Arc<dyn CodecEngine>,
    settings: TranscoderSettings,
}

impl CircleTranscoder {
    /// Create a transcoder with the procedural mask and a black background
    pub fn new(engine: Arc<dyn CodecEngine>) -> Self {
        Self {
            engine,
            settings: TranscoderSettings::default(),
        }
    }

    pub fn with_settings(mut self, settings: TranscoderSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Build the invocations for a job without running anything
    pub fn plan(&self, job: &TranscodeJob) -> EncodePlan {
        match self.settings.mask {
            MaskStrategy::Procedural => EncodePlan {
                stages: vec![self.single_pass(job)],
                mask_image: None,
            },
            MaskStrategy::Bitmap => EncodePlan {
                stages: vec![self.square_stage(job), self.composite_stage(job)],
                mask_image: Some(job.paths.mask.clone()),
            },
        }
    }

    fn encoded_audio(job: &TranscodeJob) -> AudioPlan {
        if job.has_audio {
            AudioPlan::Encode {
                stream: FIRST_AUDIO.to_string(),
                params: AudioParams::from_preset(&job.preset),
            }
        } else {
            AudioPlan::Omit
        }
    }

    fn single_pass(&self, job: &TranscodeJob) -> EncodeInvocation {
        let size = job.preset.output_size;
        EncodeInvocation {
            inputs: vec![InputSpec::new(&job.paths.input)],
            filter_graph: filter_graph::single_pass_graph(&job.crop, size, self.settings.background),
            video_label: VIDEO_LABEL.to_string(),
            video: VideoParams::from_preset(&job.preset),
            audio: Self::encoded_audio(job),
            movflags: Some(FASTSTART.to_string()),
            max_duration: job.max_duration,
            output: job.paths.output.clone(),
        }
    }

    fn square_stage(&self, job: &TranscodeJob) -> EncodeInvocation {
        EncodeInvocation {
            inputs: vec![InputSpec::new(&job.paths.input)],
            filter_graph: filter_graph::square_graph(&job.crop, job.preset.output_size),
            video_label: VIDEO_LABEL.to_string(),
            video: VideoParams::from_preset(&job.preset),
            audio: Self::encoded_audio(job),
            movflags: None,
            max_duration: job.max_duration,
            output: job.paths.intermediate.clone(),
        }
    }

    fn composite_stage(&self, job: &TranscodeJob) -> EncodeInvocation {
        let audio = if job.has_audio {
            AudioPlan::Copy {
                stream: FIRST_AUDIO.to_string(),
            }
        } else {
            AudioPlan::Omit
        };
        EncodeInvocation {
            inputs: vec![
                InputSpec::new(&job.paths.intermediate),
                InputSpec::new(&job.paths.mask),
            ],
            filter_graph: filter_graph::bitmap_composite_graph(
                job.preset.output_size,
                self.settings.background,
            ),
            video_label: VIDEO_LABEL.to_string(),
            video: VideoParams::from_preset(&job.preset),
            audio,
            movflags: Some(FASTSTART.to_string()),
            max_duration: job.max_duration,
            output: job.paths.output.clone(),
        }
    }

    /// Run every stage of the job's plan, then check the output.
    ///
    /// Stops before the next stage once `cancel` fires.
    pub async fn transcode(
        &self,
        job: &TranscodeJob,
        cancel: CancellationToken,
    ) -> CircleResult<TranscodeReport> {
        let started = Instant::now();
        let plan = self.plan(job);
        info!(
            "Transcoding {} -> {} (preset {}, {} mask, {} stage(s))",
            job.input_path().display(),
            job.output_path().display(),
            job.preset.key,
            self.settings.mask,
            plan.stages.len()
        );

        if let Some(mask_path) = &plan.mask_image {
            mask::write_mask(job.preset.output_size, mask_path).await?;
        }

        for (index, stage) in plan.stages.iter().enumerate() {
            if cancel.is_cancelled() {
                return Err(CircleError::Worker {
                    message: "Transcode cancelled".to_string(),
                });
            }
            debug!("Stage {}/{} -> {}", index + 1, plan.stages.len(), stage.output.display());
            let report = self.engine.run(stage, cancel.clone()).await?;
            debug!(
                "Stage {} finished in {:.2}s",
                index + 1,
                report.elapsed.as_secs_f64()
            );
        }

        let bytes = verify_output(job.output_path()).await?;
        let elapsed = started.elapsed();
        info!(
            "Circle clip ready: {} ({} bytes) in {:.2}s",
            job.output_path().display(),
            bytes,
            elapsed.as_secs_f64()
        );
        Ok(TranscodeReport {
            output: job.output_path().clone(),
            bytes,
            stages: plan.stages.len(),
            elapsed,
        })
    }
}

/// The output must exist and be non-empty
async fn verify_output(path: &Path) -> CircleResult<u64> {
    let metadata = tokio::fs::metadata(path).await.map_err(|e| {
        CircleError::encode(
            format!("Encoder produced no output at {}", path.display()),
            e.to_string(),
        )
    })?;
    if metadata.len() == 0 {
        return Err(CircleError::encode(
            format!("Encoder produced an empty file at {}", path.display()),
            String::new(),
        ));
    }
    Ok(metadata.len())
}
