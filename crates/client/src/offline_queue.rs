//! Offline-first report queue persisted in a [`KeyValueStore`].
//!
//! Reports are appended here before every submission attempt and removed once
//! the remote service has accepted them. Whatever is left is retried by
//! [`OfflineQueue::reconcile`] on the next load.
//!
//! Storage failures never reach the caller: reads degrade to an empty queue
//! and failed writes are logged.

use std::collections::HashSet;
use std::fmt::Display;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use serde::Deserialize;
use shiftreport_core::{LocalReportId, Report};

use crate::storage::KeyValueStore;

// Re-export from shared types module
pub use crate::types::{QueuedReport, ReconcileSummary};

/// Storage key holding the JSON array of queued reports.
pub const QUEUE_KEY: &str = "conductores_pendientes";

/// Where an unreadable queue document is copied before it gets overwritten.
pub const CORRUPT_QUEUE_KEY: &str = "conductores_pendientes_corrupt";

/// Entry as found on disk; older clients wrote neither `localId` nor, in some
/// cases, a parsable `timestamp`.
#[derive(Debug, Deserialize)]
struct StoredEntry {
    #[serde(rename = "localId", default)]
    local_id: Option<LocalReportId>,
    #[serde(flatten)]
    report: Report,
    #[serde(default)]
    timestamp: Option<DateTime<Utc>>,
}

/// Outcome of one reconciliation pass, keeping the sender's errors.
#[derive(Debug)]
pub struct Reconciliation<E> {
    pub sent: Vec<LocalReportId>,
    pub failed: Vec<(LocalReportId, E)>,
    pub remaining: usize,
}

impl<E> Reconciliation<E> {
    pub fn summary(&self) -> ReconcileSummary {
        ReconcileSummary {
            attempted: self.sent.len() + self.failed.len(),
            sent: self.sent.len(),
            remaining: self.remaining,
        }
    }
}

/// Durable queue of reports not yet accepted by the remote service.
///
/// Cheap to clone; clones share the store and the write lock, so
/// read-modify-write cycles from any clone never interleave.
#[derive(Debug, Clone)]
pub struct OfflineQueue {
    store: Arc<dyn KeyValueStore>,
    write_lock: Arc<Mutex<()>>,
}

impl OfflineQueue {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ()> {
        // The guarded unit value cannot be left inconsistent by a panic.
        self.write_lock.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append `report` with a fresh local id and the current time.
    ///
    /// The queued record is returned even if it could not be persisted.
    pub fn enqueue(&self, report: Report) -> QueuedReport {
        let queued = QueuedReport {
            local_id: LocalReportId::new(),
            report,
            timestamp: Utc::now(),
        };

        let _guard = self.lock();
        let mut entries = self.load();
        entries.push(queued.clone());

        match self.persist(&entries) {
            Ok(()) => tracing::debug!(
                local_id = %queued.local_id,
                queued = entries.len(),
                "report saved to offline queue"
            ),
            Err(err) => tracing::error!(
                local_id = %queued.local_id,
                "failed to save report to offline queue: {err}"
            ),
        }

        queued
    }

    /// Every queued report, in enqueue order. Never fails.
    pub fn list_all(&self) -> Vec<QueuedReport> {
        let _guard = self.lock();
        self.load()
    }

    pub fn len(&self) -> usize {
        self.list_all().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop the entry with `local_id`; returns whether one was removed.
    pub fn remove(&self, local_id: LocalReportId) -> bool {
        self.remove_many(&[local_id]) > 0
    }

    /// Drop every entry whose id is in `ids`; returns how many were removed.
    pub fn remove_many(&self, ids: &[LocalReportId]) -> usize {
        if ids.is_empty() {
            return 0;
        }
        let ids: HashSet<LocalReportId> = ids.iter().copied().collect();

        let _guard = self.lock();
        let mut entries = self.load();
        let before = entries.len();
        entries.retain(|e| !ids.contains(&e.local_id));
        let removed = before - entries.len();

        if removed == 0 {
            return 0;
        }
        if let Err(err) = self.persist(&entries) {
            tracing::error!("failed to remove {removed} report(s) from offline queue: {err}");
            return 0;
        }
        removed
    }

    /// Try to send every queued report, in stored order.
    ///
    /// `send` receives the bare report (no queue metadata). A failure does not
    /// stop the pass. Afterwards exactly the successfully sent entries are
    /// removed from a fresh read of the queue, so anything enqueued while the
    /// pass was running is kept.
    pub async fn reconcile<F, Fut, E>(&self, mut send: F) -> Reconciliation<E>
    where
        F: FnMut(Report) -> Fut,
        Fut: Future<Output = Result<(), E>>,
        E: Display,
    {
        let pending = self.list_all();
        let mut outcome = Reconciliation {
            sent: Vec::new(),
            failed: Vec::new(),
            remaining: pending.len(),
        };
        if pending.is_empty() {
            return outcome;
        }

        tracing::info!("trying to send {} pending report(s)", pending.len());

        for entry in pending {
            match send(entry.report).await {
                Ok(()) => {
                    tracing::debug!(local_id = %entry.local_id, "pending report sent");
                    outcome.sent.push(entry.local_id);
                }
                Err(err) => {
                    tracing::warn!(local_id = %entry.local_id, "pending report not sent: {err}");
                    outcome.failed.push((entry.local_id, err));
                }
            }
        }

        if !outcome.sent.is_empty() {
            self.remove_many(&outcome.sent);
            tracing::info!("{} pending report(s) sent", outcome.sent.len());
        }
        outcome.remaining = self.len();
        outcome
    }

    /// Read the queue. Caller must hold the write lock.
    fn load(&self) -> Vec<QueuedReport> {
        let raw = match self.store.get(QUEUE_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(err) => {
                tracing::error!("failed to read offline queue: {err}");
                return Vec::new();
            }
        };

        let stored: Vec<StoredEntry> = match serde_json::from_str(&raw) {
            Ok(stored) => stored,
            Err(err) => {
                tracing::warn!("offline queue is unreadable, treating it as empty: {err}");
                if let Err(err) = self.store.set(CORRUPT_QUEUE_KEY, &raw) {
                    tracing::error!("failed to back up unreadable offline queue: {err}");
                }
                return Vec::new();
            }
        };

        let mut upgraded = false;
        let entries: Vec<QueuedReport> = stored
            .into_iter()
            .map(|entry| {
                upgraded |= entry.local_id.is_none() || entry.timestamp.is_none();
                QueuedReport {
                    local_id: entry.local_id.unwrap_or_default(),
                    report: entry.report,
                    timestamp: entry.timestamp.unwrap_or_else(Utc::now),
                }
            })
            .collect();

        // Give legacy entries stable identities before anyone refers to them.
        if upgraded {
            match self.persist(&entries) {
                Ok(()) => tracing::info!("assigned local ids to legacy offline queue entries"),
                Err(err) => tracing::error!("failed to upgrade offline queue entries: {err}"),
            }
        }

        entries
    }

    /// Write the queue. Caller must hold the write lock.
    fn persist(&self, entries: &[QueuedReport]) -> anyhow::Result<()> {
        let json = serde_json::to_string(entries)?;
        self.store.set(QUEUE_KEY, &json)?;
        Ok(())
    }
}
