//! Pending preset selections, keyed by requester

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::domain::model::{PendingSelection, RequesterId};
use crate::error::{CircleError, CircleResult};

/// Default lifetime of an unanswered selection
pub const DEFAULT_SELECTION_TTL: Duration = Duration::from_secs(15 * 60);

/// Concurrent requester -> pending upload map with expiry.
///
/// At most one entry per requester; a newer upload replaces the older one.
pub struct PendingSelectionStore {
    entries: DashMap<RequesterId, PendingSelection>,
    ttl: chrono::Duration,
}

impl PendingSelectionStore {
    pub fn new(ttl: Duration) -> Self {
        let ttl = chrono::Duration::from_std(ttl)
            .unwrap_or_else(|_| chrono::Duration::days(365));
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    fn is_expired(&self, selection: &PendingSelection, now: DateTime<Utc>) -> bool {
        selection.created_at + self.ttl <= now
    }

    /// Store a selection, returning the one it replaced
    pub fn put(
        &self,
        requester: RequesterId,
        selection: PendingSelection,
    ) -> Option<PendingSelection> {
        let replaced = self.entries.insert(requester.clone(), selection);
        if let Some(previous) = &replaced {
            info!(
                "Pending upload {} of {} replaced by a newer upload",
                previous.source, requester
            );
        }
        replaced
    }

    /// Remove and return the requester's selection
    pub fn take_and_remove(&self, requester: &RequesterId) -> CircleResult<PendingSelection> {
        self.take_and_remove_at(requester, Utc::now())
    }

    /// Same as [`take_and_remove`](Self::take_and_remove) with an explicit clock
    pub fn take_and_remove_at(
        &self,
        requester: &RequesterId,
        now: DateTime<Utc>,
    ) -> CircleResult<PendingSelection> {
        match self.entries.remove(requester) {
            Some((_, selection)) if !self.is_expired(&selection, now) => Ok(selection),
            Some((_, selection)) => {
                debug!(
                    "Pending upload of {} expired (created {})",
                    requester, selection.created_at
                );
                Err(CircleError::SelectionNotFound {
                    requester: requester.to_string(),
                })
            }
            None => Err(CircleError::SelectionNotFound {
                requester: requester.to_string(),
            }),
        }
    }

    /// Drop every expired entry, returning how many were removed
    pub fn evict_expired(&self) -> usize {
        self.evict_expired_at(Utc::now())
    }

    pub fn evict_expired_at(&self, now: DateTime<Utc>) -> usize {
        let mut evicted = 0;
        self.entries.retain(|_, selection| {
            let keep = !self.is_expired(selection, now);
            if !keep {
                evicted += 1;
            }
            keep
        });
        if evicted > 0 {
            debug!("Evicted {} expired pending upload(s)", evicted);
        }
        evicted
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Evict on a fixed interval until `cancel` fires
    pub fn spawn_eviction(
        self: Arc<Self>,
        interval: Duration,
        cancel: CancellationToken,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => {
                        self.evict_expired();
                    }
                }
            }
            debug!("Pending selection eviction stopped");
        })
    }
}

impl Default for PendingSelectionStore {
    fn default() -> Self {
        Self::new(DEFAULT_SELECTION_TTL)
    }
}
