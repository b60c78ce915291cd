// Ports - Interface definitions (contracts)

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::domain::model::*;
use crate::engine::invocation::EncodeInvocation;
use crate::error::CircleResult;
use crate::presets::PresetOption;

/// Port for media file probing
#[async_trait]
pub trait ProbePort: Send + Sync {
    /// Report geometry of the first video stream, audio presence and duration
    async fn probe(&self, path: &Path) -> CircleResult<MediaFacts>;
}

/// Outcome of a successful codec engine run
#[derive(Debug, Clone, Default)]
pub struct EngineReport {
    /// Diagnostic text the engine printed
    pub diagnostics: String,
    pub elapsed: Duration,
}

/// Port for the external codec engine
#[async_trait]
pub trait CodecEngine: Send + Sync {
    /// Run one invocation to completion.
    ///
    /// Fails with `CircleError::Encode` on a non-zero exit. When `cancel` fires
    /// the engine process is terminated and reaped before this returns.
    async fn run(
        &self,
        invocation: &EncodeInvocation,
        cancel: CancellationToken,
    ) -> CircleResult<EngineReport>;
}

/// What an inbound message asks for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundCommand {
    Start,
    Help,
    /// A video upload; `None` when the message carried no usable video
    Upload(Option<Attachment>),
    /// A preset key, or choice callback data `q_<key>`
    PresetChoice(String),
    Text(String),
}

/// One inbound message from the transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub requester: RequesterId,
    pub chat: ChatId,
    pub message: MessageRef,
    pub command: InboundCommand,
}

/// Port for the messaging transport
#[async_trait]
pub trait MessageChannel: Send + Sync {
    /// Send a plain text message
    async fn send_text(&self, chat: &ChatId, text: &str) -> CircleResult<MessageRef>;

    /// Replace the text of a previously sent status message
    async fn update_status(&self, chat: &ChatId, message: &MessageRef, text: &str)
        -> CircleResult<()>;

    /// Offer the preset options for an upload
    async fn offer_presets(
        &self,
        chat: &ChatId,
        prompt: &str,
        options: &[PresetOption],
    ) -> CircleResult<MessageRef>;

    /// Fetch an uploaded file into `destination`
    async fn download(&self, file: &FileRef, destination: &Path) -> CircleResult<()>;

    /// Deliver a finished circle clip
    async fn send_circle(
        &self,
        chat: &ChatId,
        clip: &Path,
        meta: CircleMeta,
        reply_to: Option<&MessageRef>,
    ) -> CircleResult<()>;
}
