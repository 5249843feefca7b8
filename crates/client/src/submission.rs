//! Submission flow: validate, queue locally, then send.
//!
//! Every valid report is written to the offline queue before the remote call
//! is made, and only leaves the queue once the service has accepted it.

use std::sync::Arc;

use shiftreport_core::{LocalReportId, ReportForm, ValidationErrors};

use crate::api::{ApiError, ReportsApi};
use crate::notice::{NoticeBoard, NoticeLevel};
use crate::offline::Connectivity;
use crate::offline_queue::OfflineQueue;
use crate::types::{QueuedReport, ReconcileSummary, StoredReport};

pub const MSG_INVALID: &str = "Por favor, complete todos los campos obligatorios";
pub const MSG_SENT: &str = "Datos enviados correctamente";
pub const MSG_REJECTED: &str = "Error al guardar los datos. Los datos se guardaron localmente.";
pub const MSG_UNREACHABLE: &str =
    "Error al conectar con el servidor. Los datos se guardaron localmente.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionState {
    Idle,
    Validating,
    Invalid,
    Submitting,
    Confirmed,
    QueuedOffline,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionOutcome {
    /// Nothing was queued or sent.
    Invalid(ValidationErrors),
    Confirmed {
        local_id: LocalReportId,
        /// The service's copy, when its reply could be read.
        stored: Option<StoredReport>,
    },
    /// Kept in the offline queue for the next reconciliation.
    QueuedOffline { queued: QueuedReport, error: ApiError },
}

pub struct SubmissionFlow {
    api: Arc<dyn ReportsApi>,
    queue: OfflineQueue,
    state: SubmissionState,
    notices: NoticeBoard,
    connectivity: Connectivity,
}

impl SubmissionFlow {
    pub fn new(api: Arc<dyn ReportsApi>, queue: OfflineQueue, notices: NoticeBoard) -> Self {
        Self {
            api,
            queue,
            state: SubmissionState::Idle,
            notices,
            connectivity: Connectivity::new(),
        }
    }

    pub fn state(&self) -> SubmissionState {
        self.state
    }

    pub fn notices(&self) -> &NoticeBoard {
        &self.notices
    }

    pub fn connectivity(&self) -> &Connectivity {
        &self.connectivity
    }

    /// Reports still waiting to be sent.
    pub fn pending(&self) -> Vec<QueuedReport> {
        self.queue.list_all()
    }

    /// Retry everything in the offline queue. Run once at startup.
    pub async fn on_load(&mut self) -> ReconcileSummary {
        let api = Arc::clone(&self.api);
        let outcome = self
            .queue
            .reconcile(|report| {
                let api = Arc::clone(&api);
                async move { api.create(&report).await.map(|_| ()) }
            })
            .await;

        match outcome.failed.last() {
            Some((_, err)) => self.connectivity.record_failure(err),
            None if !outcome.sent.is_empty() => self.connectivity.record_success(),
            None => {}
        }

        outcome.summary()
    }

    /// Validate `form` and submit it. The form is cleared only on confirmation.
    pub async fn submit(&mut self, form: &mut ReportForm) -> SubmissionOutcome {
        self.state = SubmissionState::Validating;
        let report = match form.validate() {
            Ok(report) => report,
            Err(err) => {
                tracing::info!("submission rejected: {err}");
                self.state = SubmissionState::Invalid;
                self.notices.post(NoticeLevel::Error, MSG_INVALID);
                let errors = err.validation_errors().cloned().unwrap_or_default();
                return SubmissionOutcome::Invalid(errors);
            }
        };

        self.state = SubmissionState::Submitting;
        let queued = self.queue.enqueue(report);

        match self.api.create(&queued.report).await {
            Ok(stored) => {
                self.connectivity.record_success();
                self.queue.remove(queued.local_id);
                form.clear();
                self.state = SubmissionState::Confirmed;
                self.notices.post(NoticeLevel::Success, MSG_SENT);
                tracing::info!(
                    local_id = %queued.local_id,
                    id = ?stored.as_ref().map(|s| s.id.as_str()),
                    "report submitted"
                );
                SubmissionOutcome::Confirmed {
                    local_id: queued.local_id,
                    stored,
                }
            }
            Err(error) => {
                self.connectivity.record_failure(&error);
                self.state = SubmissionState::QueuedOffline;
                let message = if error.is_network() {
                    MSG_UNREACHABLE
                } else {
                    MSG_REJECTED
                };
                self.notices.post(NoticeLevel::Error, message);
                tracing::warn!(local_id = %queued.local_id, "report kept offline: {error}");
                SubmissionOutcome::QueuedOffline { queued, error }
            }
        }
    }
}
