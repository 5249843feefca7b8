//! Domain error model.

use core::fmt;

use thiserror::Error;

use crate::report::ReportField;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Keep this focused on deterministic input failures. Network and storage
/// concerns belong to the client crate.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// The entry form failed validation; carries one entry per offending field.
    #[error("validation failed: {0}")]
    Validation(ValidationErrors),

    /// An identifier was invalid (e.g. parse failure).
    #[error("invalid identifier: {0}")]
    InvalidId(String),
}

impl DomainError {
    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    /// Field-level detail when this is a validation failure.
    pub fn validation_errors(&self) -> Option<&ValidationErrors> {
        match self {
            Self::Validation(errors) => Some(errors),
            Self::InvalidId(_) => None,
        }
    }
}

/// A single rejected form field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: ReportField,
    pub message: String,
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field.wire_name(), self.message)
    }
}

/// Every field that failed validation, in form order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors(Vec<FieldError>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn push(&mut self, field: ReportField, message: impl Into<String>) {
        self.0.push(FieldError {
            field,
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldError> {
        self.0.iter()
    }

    /// Whether `field` is among the rejected fields.
    pub fn contains(&self, field: ReportField) -> bool {
        self.0.iter().any(|e| e.field == field)
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, err) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            fmt::Display::fmt(err, f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_joins_field_errors_in_order() {
        let mut errors = ValidationErrors::new();
        errors.push(ReportField::DriverName, "is required");
        errors.push(ReportField::StopCount, "must be a whole number");

        assert_eq!(
            errors.to_string(),
            "nombreApellido: is required; cantidadParadas: must be a whole number"
        );
        assert!(errors.contains(ReportField::StopCount));
        assert!(!errors.contains(ReportField::Route));
    }

    #[test]
    fn validation_errors_accessor_only_matches_validation() {
        let err = DomainError::Validation(ValidationErrors::new());
        assert!(err.validation_errors().is_some());
        assert!(DomainError::invalid_id("x").validation_errors().is_none());
    }
}
