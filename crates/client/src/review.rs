//! Review flow: list, filter by day, delete and export stored reports.
//!
//! Always reads from the remote service; nothing here touches the offline
//! queue. Operations take `&mut self`, so a slow response can never land
//! after a newer one.

use std::sync::Arc;

use chrono::{FixedOffset, NaiveDate};
use shiftreport_core::ReportId;

use crate::api::{ApiError, ReportsApi};
use crate::export::{self, ExportFile, ExportFormat};
use crate::notice::{NoticeBoard, NoticeLevel};
use crate::types::{DayWindow, StoredReport};

pub const MSG_NOTHING_TO_EXPORT: &str = "No hay datos para exportar";
pub const MSG_EXPORT_FAILED: &str = "Error al exportar el archivo";
const FALLBACK_SUBJECT: &str = "este registro";

#[derive(Debug, thiserror::Error)]
pub enum ReviewError {
    #[error("failed to load reports: {0}")]
    Load(#[source] ApiError),
    #[error("failed to filter reports for {date}: {source}")]
    Filter {
        date: NaiveDate,
        #[source]
        source: ApiError,
    },
    #[error("failed to delete report {id}: {source}")]
    Delete {
        id: ReportId,
        #[source]
        source: ApiError,
    },
    #[error("failed to export reports: {0}")]
    Export(#[source] ApiError),
}

impl ReviewError {
    pub fn api_error(&self) -> &ApiError {
        match self {
            ReviewError::Load(e) | ReviewError::Export(e) => e,
            ReviewError::Filter { source, .. } | ReviewError::Delete { source, .. } => source,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    /// The confirmation was declined; nothing was sent.
    Cancelled,
}

/// Confirmation text shown before deleting a report by `driver`.
pub fn delete_prompt(driver: Option<&str>) -> String {
    let subject = driver
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .unwrap_or(FALLBACK_SUBJECT);
    format!("¿Está seguro de que desea eliminar el registro de {subject}?")
}

pub struct ReviewFlow {
    api: Arc<dyn ReportsApi>,
    offset: FixedOffset,
    displayed: Vec<StoredReport>,
    total: usize,
    active_filter: Option<NaiveDate>,
    notices: NoticeBoard,
}

impl ReviewFlow {
    pub fn new(api: Arc<dyn ReportsApi>, offset: FixedOffset, notices: NoticeBoard) -> Self {
        Self {
            api,
            offset,
            displayed: Vec::new(),
            total: 0,
            active_filter: None,
            notices,
        }
    }

    pub fn displayed(&self) -> &[StoredReport] {
        &self.displayed
    }

    pub fn displayed_count(&self) -> usize {
        self.displayed.len()
    }

    /// Number of reports on the service at the last full load.
    pub fn total(&self) -> usize {
        self.total
    }

    pub fn active_filter(&self) -> Option<NaiveDate> {
        self.active_filter
    }

    pub fn notices(&self) -> &NoticeBoard {
        &self.notices
    }

    /// Fetch every report. With a day filter active the filter is applied
    /// again; otherwise everything is displayed.
    pub async fn load_all(&mut self) -> Result<&[StoredReport], ReviewError> {
        let reports = match self.api.list(None).await {
            Ok(reports) => reports,
            Err(err) => {
                self.post_load_error(&err);
                return Err(ReviewError::Load(err));
            }
        };

        self.total = reports.len();
        tracing::info!(total = self.total, "reports loaded");

        match self.active_filter {
            Some(date) => self.filter_by_date(date).await,
            None => {
                self.displayed = reports;
                Ok(&self.displayed)
            }
        }
    }

    /// Display only the reports created on `date` in the configured offset.
    ///
    /// The filter only becomes active once the service has answered.
    pub async fn filter_by_date(&mut self, date: NaiveDate) -> Result<&[StoredReport], ReviewError> {
        let reports = match self.api.list(Some(date)).await {
            Ok(reports) => reports,
            Err(err) => {
                self.post_load_error(&err);
                return Err(ReviewError::Filter { date, source: err });
            }
        };

        self.active_filter = Some(date);
        let window = DayWindow::for_date(date, self.offset);
        let received = reports.len();
        self.displayed = reports
            .into_iter()
            .filter(|r| r.timestamp().is_some_and(|ts| window.contains(ts)))
            .collect();

        tracing::info!(
            %date,
            received,
            displayed = self.displayed.len(),
            "reports filtered by day"
        );
        Ok(&self.displayed)
    }

    /// Drop the day filter and reload everything.
    pub async fn clear_filter(&mut self) -> Result<&[StoredReport], ReviewError> {
        self.active_filter = None;
        self.load_all().await
    }

    /// Delete report `id` after `confirm` accepts the prompt.
    ///
    /// On success the listing is reloaded; a failed reload only posts a notice.
    /// On failure the displayed listing is left as it was.
    pub async fn delete(
        &mut self,
        id: &ReportId,
        confirm: impl FnOnce(&str) -> bool,
    ) -> Result<DeleteOutcome, ReviewError> {
        let driver = self
            .displayed
            .iter()
            .find(|r| &r.id == id)
            .map(|r| r.report.driver_name.as_str());
        let prompt = delete_prompt(driver);

        if !confirm(&prompt) {
            tracing::debug!(%id, "delete cancelled");
            return Ok(DeleteOutcome::Cancelled);
        }

        if let Err(err) = self.api.delete(id).await {
            let text = if err.is_network() {
                err.user_message()
            } else {
                format!("Error al eliminar el registro: {}", err.user_message())
            };
            tracing::warn!(%id, "delete failed: {err}");
            self.notices.post(NoticeLevel::Error, text);
            return Err(ReviewError::Delete {
                id: id.clone(),
                source: err,
            });
        }

        tracing::info!(%id, "report deleted");
        if let Err(err) = self.load_all().await {
            tracing::warn!("reload after delete failed: {err}");
        }
        Ok(DeleteOutcome::Deleted)
    }

    /// Render the displayed reports as `format`.
    ///
    /// With nothing displayed and no filter active, everything is fetched
    /// first. Returns `Ok(None)` when there is nothing to export. The file is
    /// named after the active filter date, else `today`.
    pub async fn export(
        &mut self,
        format: ExportFormat,
        today: NaiveDate,
    ) -> Result<Option<ExportFile>, ReviewError> {
        let fetched;
        let reports: &[StoredReport] = if self.displayed.is_empty() && self.active_filter.is_none() {
            fetched = match self.api.list(None).await {
                Ok(reports) => reports,
                Err(err) => {
                    tracing::warn!("export fetch failed: {err}");
                    self.notices.post(NoticeLevel::Error, MSG_EXPORT_FAILED);
                    return Err(ReviewError::Export(err));
                }
            };
            &fetched
        } else {
            &self.displayed
        };

        if reports.is_empty() {
            self.notices.post(NoticeLevel::Info, MSG_NOTHING_TO_EXPORT);
            return Ok(None);
        }

        let date = self.active_filter.unwrap_or(today);
        Ok(Some(export::export_reports(reports, format, self.offset, date)))
    }

    fn post_load_error(&mut self, err: &ApiError) {
        tracing::error!("failed to load reports: {err}");
        self.notices.post(
            NoticeLevel::Error,
            format!("Error al cargar los datos: {}", err.user_message()),
        );
    }
}
