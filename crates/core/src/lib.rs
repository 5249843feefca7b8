//! `shiftreport-core`: domain model for driver shift reports.
//!
//! This crate contains **pure domain** types (no I/O, no network):
//! the report itself, the raw entry form and its validation rules, and the
//! identifiers used by the remote service and the offline queue.

pub mod error;
pub mod form;
pub mod id;
pub mod report;

pub use error::{DomainError, DomainResult, FieldError, ValidationErrors};
pub use form::ReportForm;
pub use id::{LocalReportId, ReportId};
pub use report::{Report, ReportField};
