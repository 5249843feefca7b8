//! `shiftreport-client`
//!
//! **Responsibility:** Data-entry and review client for driver shift reports.
//!
//! This crate provides:
//! - Environment resolution (local vs production backend)
//! - An offline-first submission flow backed by a persistent queue
//! - A remote-backed review flow (list, filter by day, delete, export)
//!
//! The remote service is the authority; the local queue only holds reports
//! it has not accepted yet.

pub mod api;
pub mod config;
pub mod export;
pub mod notice;
pub mod offline;
pub mod offline_queue;
pub mod review;
pub mod storage;
pub mod submission;
pub mod types;

pub use api::{ApiError, HttpReportsApi, InMemoryReportsApi, ReportsApi};
pub use config::{ClientConfig, Environment};
pub use export::{ExportFile, ExportFormat};
pub use notice::{Notice, NoticeBoard, NoticeLevel};
pub use offline::{Connectivity, ConnectivityState};
pub use offline_queue::OfflineQueue;
pub use review::{DeleteOutcome, ReviewError, ReviewFlow};
pub use storage::{FileStore, InMemoryStore, KeyValueStore, StorageError};
pub use submission::{SubmissionFlow, SubmissionOutcome, SubmissionState};
pub use types::{DayWindow, QueuedReport, ReconcileSummary, StoredReport};
