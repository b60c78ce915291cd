//! Bounded, deadline-enforcing job execution

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::domain::model::TranscodeJob;
use crate::engine::transcoder::{CircleTranscoder, TranscodeReport};
use crate::error::{CircleError, CircleResult};

/// Time a cancelled job gets to reap its engine process before it is aborted
pub const DEFAULT_KILL_GRACE: Duration = Duration::from_secs(5);

/// Terminal state of one job
#[derive(Debug)]
pub enum JobOutcome {
    Completed(TranscodeReport),
    /// The deadline expired; the engine was stopped and partial output removed
    TimedOut { budget: Duration },
    Failed(CircleError),
}

impl JobOutcome {
    pub fn into_result(self) -> CircleResult<TranscodeReport> {
        match self {
            JobOutcome::Completed(report) => Ok(report),
            JobOutcome::TimedOut { budget } => Err(CircleError::TimedOut { budget }),
            JobOutcome::Failed(err) => Err(err),
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, JobOutcome::Completed(_))
    }
}

/// Runs transcodes on worker tasks, at most `max_concurrent` at a time
pub struct JobExecutor {
    transcoder: Arc<CircleTranscoder>,
    slots: Arc<Semaphore>,
    kill_grace: Duration,
}

impl JobExecutor {
    pub fn new(transcoder: Arc<CircleTranscoder>, max_concurrent: usize) -> Self {
        Self {
            transcoder,
            slots: Arc::new(Semaphore::new(max_concurrent.max(1))),
            kill_grace: DEFAULT_KILL_GRACE,
        }
    }

    pub fn with_kill_grace(mut self, grace: Duration) -> Self {
        self.kill_grace = grace;
        self
    }

    /// Slots not currently held by a running job
    pub fn available_slots(&self) -> usize {
        self.slots.available_permits()
    }

    /// Run a job to a terminal outcome.
    ///
    /// Waits for a free slot first; the job's deadline starts once it holds one.
    pub async fn run(&self, job: TranscodeJob) -> JobOutcome {
        let permit = match self.slots.clone().acquire_owned().await {
            Ok(permit) => permit,
            Err(_) => {
                return JobOutcome::Failed(CircleError::Worker {
                    message: "Executor is shut down".to_string(),
                })
            }
        };

        let budget = job.deadline;
        let output = job.paths.output.clone();
        let cancel = CancellationToken::new();
        let transcoder = self.transcoder.clone();
        let worker_cancel = cancel.clone();

        debug!("Starting job for {} with a {:?} budget", output.display(), budget);
        let mut handle = tokio::spawn(async move {
            let _permit = permit;
            transcoder.transcode(&job, worker_cancel).await
        });

        match tokio::time::timeout(budget, &mut handle).await {
            Ok(Ok(Ok(report))) => JobOutcome::Completed(report),
            Ok(Ok(Err(err))) => {
                remove_partial(&output).await;
                JobOutcome::Failed(err)
            }
            Ok(Err(join_err)) => {
                remove_partial(&output).await;
                JobOutcome::Failed(CircleError::Worker {
                    message: format!("Transcode task failed: {}", join_err),
                })
            }
            Err(_) => {
                warn!("Job for {} exceeded {:?}, cancelling", output.display(), budget);
                cancel.cancel();
                if tokio::time::timeout(self.kill_grace, &mut handle).await.is_err() {
                    warn!("Job did not stop within {:?}, aborting", self.kill_grace);
                    handle.abort();
                    let _ = handle.await;
                }
                remove_partial(&output).await;
                JobOutcome::TimedOut { budget }
            }
        }
    }
}

async fn remove_partial(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => debug!("Removed partial output {}", path.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!("Failed to remove partial output {}: {}", path.display(), e),
    }
}
