//! Strongly-typed identifiers used across the domain.

use core::str::FromStr;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DomainError;

/// Identifier assigned by the remote service when it accepts a report.
///
/// The value is opaque to the client; it only ever travels back to the
/// service as a path segment, so it must not contain URL delimiters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReportId(String);

impl ReportId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for ReportId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ReportId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(DomainError::invalid_id("ReportId: empty"));
        }
        if s.contains(['/', '?', '#']) || s.chars().any(char::is_whitespace) {
            return Err(DomainError::invalid_id(format!(
                "ReportId: '{s}' contains URL delimiters or whitespace"
            )));
        }
        Ok(Self(s.to_string()))
    }
}

/// Client-generated identity of a report waiting in the offline queue.
///
/// Two queued reports with identical field values are still distinct entries;
/// removal from the queue always goes through this id.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LocalReportId(Uuid);

impl LocalReportId {
    /// Uses UUIDv7 so ids sort by creation time.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for LocalReportId {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Display for LocalReportId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

impl From<Uuid> for LocalReportId {
    fn from(value: Uuid) -> Self {
        Self(value)
    }
}

impl FromStr for LocalReportId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let uuid = Uuid::from_str(s)
            .map_err(|e| DomainError::invalid_id(format!("LocalReportId: {e}")))?;
        Ok(Self(uuid))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_id_accepts_opaque_service_ids() {
        let id: ReportId = " 65f1c0ffee0123456789abcd ".parse().unwrap();
        assert_eq!(id.as_str(), "65f1c0ffee0123456789abcd");
    }

    #[test]
    fn report_id_rejects_empty_and_path_breaking_values() {
        assert!("".parse::<ReportId>().is_err());
        assert!("   ".parse::<ReportId>().is_err());
        assert!("a/b".parse::<ReportId>().is_err());
        assert!("a?b=1".parse::<ReportId>().is_err());
        assert!("a b".parse::<ReportId>().is_err());
    }

    #[test]
    fn local_ids_are_unique_and_round_trip_through_strings() {
        let a = LocalReportId::new();
        let b = LocalReportId::new();
        assert_ne!(a, b);

        let parsed: LocalReportId = a.to_string().parse().unwrap();
        assert_eq!(parsed, a);
        assert!("not-a-uuid".parse::<LocalReportId>().is_err());
    }
}
