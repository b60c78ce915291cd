use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::adapters::{FfmpegEngine, FfprobeAdapter};
use crate::app::circle_interactor::{CircleInteractor, InteractorSettings};
use crate::config::AppConfig;
use crate::engine::{CircleTranscoder, JobExecutor};
use crate::ports::{CodecEngine, MessageChannel, ProbePort};
use crate::session::PendingSelectionStore;
use crate::workspace;

/// How often expired pending selections are evicted
const EVICTION_INTERVAL: Duration = Duration::from_secs(60);

pub trait AppContainer: Send + Sync {
    fn circle_interactor(&self) -> Arc<CircleInteractor>;
    fn probe_port(&self) -> Arc<dyn ProbePort>;
    fn selection_store(&self) -> Arc<PendingSelectionStore>;
}

pub struct DefaultAppContainer {
    circle_interactor: Arc<CircleInteractor>,
    probe_port: Arc<dyn ProbePort>,
    store: Arc<PendingSelectionStore>,
    config: AppConfig,
}

impl DefaultAppContainer {
    /// Wire the ffprobe/ffmpeg adapters named in `config` to `channel`
    pub fn new(config: &AppConfig, channel: Arc<dyn MessageChannel>) -> Self {
        let probe_port = Arc::new(FfprobeAdapter::new(
            config.ffprobe_path.clone(),
            config.probe_timeout(),
        ));
        let engine = Arc::new(FfmpegEngine::new(config.ffmpeg_path.clone()));
        Self::with_ports(
            config,
            channel,
            probe_port as Arc<dyn ProbePort>,
            engine as Arc<dyn CodecEngine>,
        )
    }

    /// Wire explicit ports
    pub fn with_ports(
        config: &AppConfig,
        channel: Arc<dyn MessageChannel>,
        probe_port: Arc<dyn ProbePort>,
        engine: Arc<dyn CodecEngine>,
    ) -> Self {
        let transcoder =
            Arc::new(CircleTranscoder::new(engine).with_settings(config.transcoder_settings()));
        let executor = Arc::new(JobExecutor::new(transcoder, config.max_concurrent_jobs));
        let store = Arc::new(PendingSelectionStore::new(config.selection_ttl()));

        let circle_interactor = Arc::new(CircleInteractor::new(
            channel,
            Arc::clone(&probe_port),
            executor,
            Arc::clone(&store),
            InteractorSettings::from_config(config),
        ));

        Self {
            circle_interactor,
            probe_port,
            store,
            config: config.clone(),
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Sweep stale job directories and start periodic selection eviction
    pub fn start_maintenance(&self, cancel: CancellationToken) -> JoinHandle<()> {
        let removed =
            workspace::sweep_stale(&self.config.temp_root, self.config.stale_workspace_age());
        info!(
            "Workspace root {} ready ({} stale removed)",
            self.config.temp_root.display(),
            removed
        );
        Arc::clone(&self.store).spawn_eviction(EVICTION_INTERVAL, cancel)
    }
}

impl AppContainer for DefaultAppContainer {
    fn circle_interactor(&self) -> Arc<CircleInteractor> {
        Arc::clone(&self.circle_interactor)
    }

    fn probe_port(&self) -> Arc<dyn ProbePort> {
        Arc::clone(&self.probe_port)
    }

    fn selection_store(&self) -> Arc<PendingSelectionStore> {
        Arc::clone(&self.store)
    }
}
