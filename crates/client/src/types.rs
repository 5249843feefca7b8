//! Shared record shapes: what the remote service returns, what the offline
//! queue persists, and the calendar-day window used for date filtering.

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use shiftreport_core::{LocalReportId, Report, ReportId};

/// A report accepted by the remote service (matches the API response shape).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawStoredReport")]
pub struct StoredReport {
    #[serde(rename = "_id")]
    pub id: ReportId,
    #[serde(flatten)]
    pub report: Report,
    #[serde(rename = "createdAt", default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    /// Creation time under the service's older field name.
    #[serde(rename = "fechaCreacion", default, skip_serializing_if = "Option::is_none")]
    pub fecha_creacion: Option<DateTime<Utc>>,
}

/// Wire shape of [`StoredReport`]. The service may send `_id`, `id` or both.
#[derive(Deserialize)]
struct RawStoredReport {
    #[serde(rename = "_id", default)]
    mongo_id: Option<ReportId>,
    #[serde(default)]
    id: Option<ReportId>,
    #[serde(flatten)]
    report: Report,
    #[serde(rename = "createdAt", default)]
    created_at: Option<DateTime<Utc>>,
    #[serde(rename = "fechaCreacion", default)]
    fecha_creacion: Option<DateTime<Utc>>,
}

impl TryFrom<RawStoredReport> for StoredReport {
    type Error = String;

    fn try_from(raw: RawStoredReport) -> Result<Self, Self::Error> {
        let id = raw
            .mongo_id
            .or(raw.id)
            .ok_or_else(|| "stored report has neither `_id` nor `id`".to_string())?;
        Ok(Self {
            id,
            report: raw.report,
            created_at: raw.created_at,
            fecha_creacion: raw.fecha_creacion,
        })
    }
}

impl StoredReport {
    /// Effective creation time: `createdAt`, else `fechaCreacion`.
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        self.created_at.or(self.fecha_creacion)
    }
}

/// A report waiting in the offline queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueuedReport {
    #[serde(rename = "localId")]
    pub local_id: LocalReportId,
    #[serde(flatten)]
    pub report: Report,
    /// Client clock at enqueue time.
    pub timestamp: DateTime<Utc>,
}

/// Counts from one reconciliation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileSummary {
    pub attempted: usize,
    pub sent: usize,
    pub remaining: usize,
}

impl ReconcileSummary {
    pub fn failed(&self) -> usize {
        self.attempted - self.sent
    }
}

/// Connectivity state of the client, as last observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectivityState {
    /// The remote service answered the last request.
    Online,
    /// The last request never reached the service.
    Offline,
}

/// One calendar day in a fixed offset, as an inclusive UTC range
/// `[00:00:00.000, 23:59:59.999]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayWindow {
    pub date: NaiveDate,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl DayWindow {
    pub fn for_date(date: NaiveDate, offset: FixedOffset) -> Self {
        let local_midnight = date.and_time(NaiveTime::default());
        // Fixed offsets have no gaps or folds, so the mapping is always single.
        let start = offset
            .from_local_datetime(&local_midnight)
            .single()
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|| Utc.from_utc_datetime(&local_midnight));
        let end = start + Duration::days(1) - Duration::milliseconds(1);

        Self { date, start, end }
    }

    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        ts >= self.start && ts <= self.end
    }
}
