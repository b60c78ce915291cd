// Circle interactor - Orchestrates the upload -> circle clip use case

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{error, info, warn};

use crate::app::messages;
use crate::config::AppConfig;
use crate::domain::model::*;
use crate::domain::rules::*;
use crate::engine::JobExecutor;
use crate::error::{CircleError, CircleResult};
use crate::ports::*;
use crate::presets::{parse_choice_data, QualityPreset, QualityPresetRegistry};
use crate::session::PendingSelectionStore;
use crate::workspace::JobWorkspace;

/// Request-flow settings taken from the resolved configuration
#[derive(Debug, Clone)]
pub struct InteractorSettings {
    pub policy: UploadPolicy,
    pub interactive: bool,
    pub default_preset: String,
    pub temp_root: PathBuf,
    pub max_duration: Duration,
    pub timeout_scale: f64,
    pub max_upload_mb: u64,
}

impl InteractorSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            policy: UploadPolicy::new(config.max_upload_bytes()),
            interactive: config.interactive,
            default_preset: config.default_preset.clone(),
            temp_root: config.temp_root.clone(),
            max_duration: config.max_duration(),
            timeout_scale: config.timeout_scale,
            max_upload_mb: config.max_upload_mb,
        }
    }

    /// Deadline of one job run with `preset`
    pub fn job_deadline(&self, preset: &QualityPreset) -> Duration {
        preset.timeout_budget.mul_f64(self.timeout_scale)
    }
}

/// Interactor for the circle clip use case
pub struct CircleInteractor {
    channel: Arc<dyn MessageChannel>,
    probe_port: Arc<dyn ProbePort>,
    executor: Arc<JobExecutor>,
    store: Arc<PendingSelectionStore>,
    settings: InteractorSettings,
}

impl CircleInteractor {
    /// Create new circle interactor with injected ports
    pub fn new(
        channel: Arc<dyn MessageChannel>,
        probe_port: Arc<dyn ProbePort>,
        executor: Arc<JobExecutor>,
        store: Arc<PendingSelectionStore>,
        settings: InteractorSettings,
    ) -> Self {
        Self {
            channel,
            probe_port,
            executor,
            store,
            settings,
        }
    }

    /// Handle one inbound message.
    ///
    /// Failures are reported to the requester once through the channel and
    /// then returned to the caller.
    pub async fn handle(&self, envelope: Envelope) -> CircleResult<()> {
        let Envelope {
            requester,
            chat,
            message,
            command,
        } = envelope;

        match command {
            InboundCommand::Start => {
                self.channel.send_text(&chat, messages::WELCOME).await?;
                Ok(())
            }
            InboundCommand::Help => {
                let text = messages::help(
                    self.settings.max_upload_mb,
                    self.settings.max_duration.as_secs(),
                );
                self.channel.send_text(&chat, &text).await?;
                Ok(())
            }
            InboundCommand::Text(_) => {
                self.channel.send_text(&chat, messages::SEND_VIDEO).await?;
                Ok(())
            }
            InboundCommand::Upload(attachment) => {
                self.on_upload(requester, chat, message, attachment).await
            }
            InboundCommand::PresetChoice(data) => self.on_choice(&requester, &chat, &data).await,
        }
    }

    async fn on_upload(
        &self,
        requester: RequesterId,
        chat: ChatId,
        message: MessageRef,
        attachment: Option<Attachment>,
    ) -> CircleResult<()> {
        let attachment = match self.settings.policy.admit(attachment.as_ref()) {
            Ok(attachment) => attachment.clone(),
            Err(e) => {
                info!("Rejected upload from {}: {}", requester, e);
                self.report_failure(&chat, None, &e).await;
                return Err(e);
            }
        };
        info!(
            "Upload from {}: {} ({} bytes)",
            requester, attachment.file, attachment.size_bytes
        );

        if self.settings.interactive {
            let selection = PendingSelection {
                requester: requester.clone(),
                chat: chat.clone(),
                source: attachment.file.clone(),
                file_name: attachment.file_name.clone(),
                original_message: message,
                created_at: Utc::now(),
            };
            self.store.put(requester, selection);
            let options = QualityPresetRegistry::global().options();
            self.channel
                .offer_presets(&chat, messages::CHOOSE_PRESET, &options)
                .await?;
            return Ok(());
        }

        let preset = match QualityPresetRegistry::global().lookup(&self.settings.default_preset) {
            Ok(preset) => preset.clone(),
            Err(e) => {
                self.report_failure(&chat, None, &e).await;
                return Err(e);
            }
        };
        self.run_job(
            &chat,
            &attachment.file,
            attachment.extension(),
            preset,
            Some(&message),
        )
        .await
    }

    async fn on_choice(&self, requester: &RequesterId, chat: &ChatId, data: &str) -> CircleResult<()> {
        let key = parse_choice_data(data).unwrap_or(data);

        // An unknown key leaves the pending upload in place for a retry
        let preset = match QualityPresetRegistry::global().lookup(key) {
            Ok(preset) => preset.clone(),
            Err(e) => {
                self.report_failure(chat, None, &e).await;
                return Err(e);
            }
        };

        let selection = match self.store.take_and_remove(requester) {
            Ok(selection) => selection,
            Err(e) => {
                self.report_failure(chat, None, &e).await;
                return Err(e);
            }
        };
        info!("{} chose preset {}", requester, preset.key);

        self.run_job(
            &selection.chat,
            &selection.source,
            selection.extension(),
            preset,
            Some(&selection.original_message),
        )
        .await
    }

    /// Download, probe, transcode and deliver one clip inside a fresh workspace
    async fn run_job(
        &self,
        chat: &ChatId,
        source: &FileRef,
        extension: Option<String>,
        preset: QualityPreset,
        reply_to: Option<&MessageRef>,
    ) -> CircleResult<()> {
        let status = self.channel.send_text(chat, &messages::queued(&preset)).await?;

        let workspace = match JobWorkspace::create(&self.settings.temp_root, extension.as_deref()) {
            Ok(workspace) => workspace,
            Err(e) => {
                self.report_failure(chat, Some(&status), &e).await;
                return Err(e);
            }
        };

        let result = self
            .process(&workspace, chat, &status, source, preset, reply_to)
            .await;
        workspace.cleanup();

        if let Err(e) = &result {
            self.report_failure(chat, Some(&status), e).await;
        }
        result
    }

    async fn process(
        &self,
        workspace: &JobWorkspace,
        chat: &ChatId,
        status: &MessageRef,
        source: &FileRef,
        preset: QualityPreset,
        reply_to: Option<&MessageRef>,
    ) -> CircleResult<()> {
        let paths = workspace.paths().clone();
        self.channel.download(source, &paths.input).await?;

        self.set_status(chat, status, messages::PROBING).await;
        let facts = self.probe_port.probe(&paths.input).await?;
        let crop = TransformPlanner::plan(facts.dimensions);
        info!(
            "Source {} (audio: {}), cropping {}x{} at ({}, {})",
            facts.dimensions, facts.has_audio, crop.size, crop.size, crop.x_offset, crop.y_offset
        );

        let deadline = self.settings.job_deadline(&preset);
        let output_size = preset.output_size;
        let job = TranscodeJob::new(
            paths,
            preset,
            crop,
            facts.has_audio,
            self.settings.max_duration,
        )
        .with_deadline(deadline);
        let meta = CircleMeta::for_output(facts.duration, job.max_duration, output_size);

        self.set_status(chat, status, messages::ENCODING).await;
        let report = self.executor.run(job).await.into_result()?;

        self.set_status(chat, status, messages::SENDING).await;
        self.channel
            .send_circle(chat, &report.output, meta, reply_to)
            .await?;
        self.set_status(chat, status, messages::DONE).await;
        Ok(())
    }

    async fn set_status(&self, chat: &ChatId, status: &MessageRef, text: &str) {
        if let Err(e) = self.channel.update_status(chat, status, text).await {
            warn!("Failed to update status message: {}", e);
        }
    }

    async fn report_failure(&self, chat: &ChatId, status: Option<&MessageRef>, err: &CircleError) {
        match err {
            CircleError::Encode {
                message,
                diagnostics,
            } => error!("Encode failed: {}\n{}", message, diagnostics.trim_end()),
            _ if err.is_user_correctable() => info!("Request failed: {}", err),
            _ => error!("Request failed: {}", err),
        }

        let text = messages::failure(err);
        let sent = match status {
            Some(status) => self.channel.update_status(chat, status, &text).await,
            None => self.channel.send_text(chat, &text).await.map(|_| ()),
        };
        if let Err(e) = sent {
            warn!("Failed to report error to {}: {}", chat, e);
        }
    }
}
