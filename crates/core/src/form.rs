//! Raw entry form and the validation that turns it into a [`Report`].
//!
//! Numeric input that does not parse as a non-negative whole number is
//! rejected, never coerced to zero. Every failing field is reported, not just
//! the first one.

use std::num::IntErrorKind;

use crate::error::{DomainError, DomainResult, ValidationErrors};
use crate::report::{Report, ReportField};

/// The entry form exactly as typed by the user.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportForm {
    pub driver_name: String,
    pub vehicle_plate: String,
    pub route: String,
    pub package_count: String,
    pub packages_received: String,
    pub stop_count: String,
    pub packages_delivered: String,
    pub packages_returned: String,
    pub notes: String,
}

impl ReportForm {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset every input to empty (after a confirmed submission).
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn is_blank(&self) -> bool {
        *self == Self::default()
    }

    /// Validate the form and build the report it describes.
    pub fn validate(&self) -> DomainResult<Report> {
        let mut errors = ValidationErrors::new();

        let driver_name = required_text(&self.driver_name, ReportField::DriverName, &mut errors);
        let vehicle_plate =
            required_text(&self.vehicle_plate, ReportField::VehiclePlate, &mut errors);
        let route = required_text(&self.route, ReportField::Route, &mut errors);

        let package_count = count(&self.package_count, ReportField::PackageCount, &mut errors);
        let packages_received =
            count(&self.packages_received, ReportField::PackagesReceived, &mut errors);
        let stop_count = count(&self.stop_count, ReportField::StopCount, &mut errors);
        let packages_delivered =
            count(&self.packages_delivered, ReportField::PackagesDelivered, &mut errors);
        let packages_returned =
            count(&self.packages_returned, ReportField::PackagesReturned, &mut errors);

        let notes = Some(self.notes.trim())
            .filter(|n| !n.is_empty())
            .map(str::to_string);

        match (driver_name, vehicle_plate, route, package_count, packages_received, stop_count) {
            (
                Some(driver_name),
                Some(vehicle_plate),
                Some(route),
                Some(package_count),
                Some(packages_received),
                Some(stop_count),
            ) if errors.is_empty() => Ok(Report {
                driver_name,
                vehicle_plate,
                route,
                package_count,
                packages_received,
                stop_count,
                packages_delivered,
                packages_returned,
                notes,
            }),
            _ => Err(DomainError::Validation(errors)),
        }
    }
}

impl From<&Report> for ReportForm {
    fn from(report: &Report) -> Self {
        let mut form = Self::default();
        for field in ReportField::ALL {
            let value = field.value_of(report);
            match field {
                ReportField::DriverName => form.driver_name = value,
                ReportField::VehiclePlate => form.vehicle_plate = value,
                ReportField::Route => form.route = value,
                ReportField::PackageCount => form.package_count = value,
                ReportField::PackagesReceived => form.packages_received = value,
                ReportField::StopCount => form.stop_count = value,
                ReportField::PackagesDelivered => form.packages_delivered = value,
                ReportField::PackagesReturned => form.packages_returned = value,
                ReportField::Notes => form.notes = value,
            }
        }
        form
    }
}

fn required_text(raw: &str, field: ReportField, errors: &mut ValidationErrors) -> Option<String> {
    let value = raw.trim();
    if value.is_empty() {
        errors.push(field, "is required");
        None
    } else {
        Some(value.to_string())
    }
}

/// Parse a count; empty input is an error only for required fields.
fn count(raw: &str, field: ReportField, errors: &mut ValidationErrors) -> Option<u32> {
    let value = raw.trim();
    if value.is_empty() {
        if field.is_required() {
            errors.push(field, "is required");
        }
        return None;
    }

    let message = match value.parse::<i128>() {
        Ok(n) => match u32::try_from(n) {
            Ok(n) => return Some(n),
            Err(_) if n < 0 => "must not be negative".to_string(),
            Err(_) => format!("'{value}' is too large"),
        },
        Err(err) => match err.kind() {
            IntErrorKind::NegOverflow => "must not be negative".to_string(),
            IntErrorKind::PosOverflow => format!("'{value}' is too large"),
            _ => format!("'{value}' is not a whole number"),
        },
    };
    errors.push(field, message);
    None
}
