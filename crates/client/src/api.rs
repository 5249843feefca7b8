//! Remote reports service.
//!
//! [`ReportsApi`] is the seam the flows talk through. [`HttpReportsApi`] is the
//! real client; [`InMemoryReportsApi`] reproduces the service's observable
//! behaviour in-process for tests.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, NaiveDate, Offset, Utc};
use serde_json::Value;
use shiftreport_core::{Report, ReportId};

use crate::config::ClientConfig;
use crate::types::{DayWindow, StoredReport};

/// Failure of a call to the reports service.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    /// The request never got a response.
    #[error("network error: {0}")]
    Network(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },
    #[error("parse error: {0}")]
    Parse(String),
}

impl ApiError {
    pub fn is_network(&self) -> bool {
        matches!(self, ApiError::Network(_))
    }

    /// Text shown to the user for this failure.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Network(_) => "Error al conectar con el servidor".to_string(),
            ApiError::NotFound(message) | ApiError::Api { message, .. } if !message.is_empty() => {
                message.clone()
            }
            _ => "Error desconocido".to_string(),
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

/// Operations offered by the reports service.
#[async_trait]
pub trait ReportsApi: Send + Sync {
    /// All reports, or only those the service files under `date`.
    async fn list(&self, date: Option<NaiveDate>) -> ApiResult<Vec<StoredReport>>;

    /// Store a new report. `Ok(None)` means the service accepted it but its
    /// reply could not be read.
    async fn create(&self, report: &Report) -> ApiResult<Option<StoredReport>>;

    async fn delete(&self, id: &ReportId) -> ApiResult<()>;
}

/// `reqwest`-backed client for `{base}/drivers`.
#[derive(Debug, Clone)]
pub struct HttpReportsApi {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpReportsApi {
    pub fn new(config: &ClientConfig) -> Self {
        Self::with_endpoint(config.collection_endpoint())
    }

    pub fn with_endpoint(endpoint: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl ReportsApi for HttpReportsApi {
    async fn list(&self, date: Option<NaiveDate>) -> ApiResult<Vec<StoredReport>> {
        let mut req = self.client.get(&self.endpoint);
        if let Some(date) = date {
            req = req.query(&[("fecha", date.format("%Y-%m-%d").to_string())]);
        }

        let resp = req.send().await.map_err(network)?;
        let resp = check_status(resp).await?;
        let reports: Vec<StoredReport> = resp.json().await.map_err(|e| {
            ApiError::Parse(format!("failed to parse report list: {e}"))
        })?;

        tracing::debug!(count = reports.len(), date = ?date, "reports fetched");
        Ok(reports)
    }

    async fn create(&self, report: &Report) -> ApiResult<Option<StoredReport>> {
        let resp = self
            .client
            .post(&self.endpoint)
            .json(report)
            .send()
            .await
            .map_err(network)?;
        let resp = check_status(resp).await?;

        let body = resp.text().await.unwrap_or_default();
        match serde_json::from_str::<StoredReport>(&body) {
            Ok(stored) => Ok(Some(stored)),
            Err(e) => {
                tracing::warn!("report accepted but reply could not be parsed: {e}");
                Ok(None)
            }
        }
    }

    async fn delete(&self, id: &ReportId) -> ApiResult<()> {
        let url = format!("{}/{}", self.endpoint, id);
        let resp = self.client.delete(&url).send().await.map_err(network)?;
        check_status(resp).await?;
        Ok(())
    }
}

fn network(err: reqwest::Error) -> ApiError {
    ApiError::Network(err.to_string())
}

async fn check_status(resp: reqwest::Response) -> ApiResult<reqwest::Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }

    let body = resp.text().await.unwrap_or_default();
    Err(status_error(status, &body))
}

/// An empty body leaves the message empty so `user_message` falls back.
fn status_error(status: reqwest::StatusCode, body: &str) -> ApiError {
    let message = error_message(body).unwrap_or_default();
    if status == reqwest::StatusCode::NOT_FOUND {
        ApiError::NotFound(message)
    } else {
        ApiError::Api {
            status: status.as_u16(),
            message,
        }
    }
}

/// `message` (or `error`) from a JSON error body, else the trimmed body text.
fn error_message(body: &str) -> Option<String> {
    if let Ok(json) = serde_json::from_str::<Value>(body) {
        for key in ["message", "error"] {
            if let Some(text) = json.get(key).and_then(Value::as_str) {
                if !text.trim().is_empty() {
                    return Some(text.trim().to_string());
                }
            }
        }
    }
    Some(body.trim()).filter(|b| !b.is_empty()).map(str::to_string)
}

#[derive(Debug)]
struct InMemoryState {
    reports: Vec<StoredReport>,
    next_id: u64,
    available: bool,
}

/// In-process stand-in for the reports service.
///
/// Ids are 24 hex digits assigned in sequence. The `fecha` filter matches
/// calendar days in `offset`. Clones share state.
#[derive(Debug, Clone)]
pub struct InMemoryReportsApi {
    state: Arc<Mutex<InMemoryState>>,
    offset: FixedOffset,
}

impl Default for InMemoryReportsApi {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryReportsApi {
    pub fn new() -> Self {
        Self::with_offset(Utc.fix())
    }

    pub fn with_offset(offset: FixedOffset) -> Self {
        Self {
            state: Arc::new(Mutex::new(InMemoryState {
                reports: Vec::new(),
                next_id: 1,
                available: true,
            })),
            offset,
        }
    }

    fn lock(&self) -> MutexGuard<'_, InMemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// While unavailable every call fails with [`ApiError::Network`].
    pub fn set_available(&self, available: bool) {
        self.lock().available = available;
    }

    /// Insert a report as if it had been created at `created_at`.
    pub fn seed(&self, report: Report, created_at: DateTime<Utc>) -> ApiResult<StoredReport> {
        let mut state = self.lock();
        Self::insert(&mut state, report, Some(created_at))
    }

    /// Everything stored, in creation order.
    pub fn records(&self) -> Vec<StoredReport> {
        self.lock().reports.clone()
    }

    fn insert(
        state: &mut InMemoryState,
        report: Report,
        created_at: Option<DateTime<Utc>>,
    ) -> ApiResult<StoredReport> {
        let id = format!("{:024x}", state.next_id)
            .parse::<ReportId>()
            .map_err(|e| ApiError::Parse(e.to_string()))?;
        let stored = StoredReport {
            id,
            report,
            created_at,
            fecha_creacion: None,
        };
        state.next_id += 1;
        state.reports.push(stored.clone());
        Ok(stored)
    }

    fn ensure_available(state: &InMemoryState) -> ApiResult<()> {
        if state.available {
            Ok(())
        } else {
            Err(ApiError::Network("service unavailable".to_string()))
        }
    }
}

#[async_trait]
impl ReportsApi for InMemoryReportsApi {
    async fn list(&self, date: Option<NaiveDate>) -> ApiResult<Vec<StoredReport>> {
        let state = self.lock();
        Self::ensure_available(&state)?;

        let reports = match date {
            None => state.reports.clone(),
            Some(date) => {
                let window = DayWindow::for_date(date, self.offset);
                state
                    .reports
                    .iter()
                    .filter(|r| r.timestamp().is_some_and(|ts| window.contains(ts)))
                    .cloned()
                    .collect()
            }
        };
        Ok(reports)
    }

    async fn create(&self, report: &Report) -> ApiResult<Option<StoredReport>> {
        let mut state = self.lock();
        Self::ensure_available(&state)?;
        Self::insert(&mut state, report.clone(), Some(Utc::now())).map(Some)
    }

    async fn delete(&self, id: &ReportId) -> ApiResult<()> {
        let mut state = self.lock();
        Self::ensure_available(&state)?;

        let before = state.reports.len();
        state.reports.retain(|r| &r.id != id);
        if state.reports.len() == before {
            return Err(ApiError::NotFound("Registro no encontrado".to_string()));
        }
        Ok(())
    }
}
