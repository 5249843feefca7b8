//! The shift report entity and its field catalogue.

use serde::{Deserialize, Serialize};

/// One driver shift submission.
///
/// Serialized with the field names the remote service expects; absent
/// optional values are omitted from the JSON body rather than sent as `null`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    #[serde(rename = "nombreApellido")]
    pub driver_name: String,
    #[serde(rename = "patente")]
    pub vehicle_plate: String,
    #[serde(rename = "ruta")]
    pub route: String,
    #[serde(rename = "numeroPaquetes")]
    pub package_count: u32,
    #[serde(rename = "paquetesRecibidos")]
    pub packages_received: u32,
    #[serde(rename = "cantidadParadas")]
    pub stop_count: u32,
    #[serde(
        rename = "paquetesEntregados",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub packages_delivered: Option<u32>,
    #[serde(
        rename = "paquetesDevueltos",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub packages_returned: Option<u32>,
    #[serde(rename = "observaciones", default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl Report {
    /// Build a report from its required fields.
    ///
    /// No validation happens here; user input goes through
    /// [`ReportForm::validate`](crate::ReportForm::validate).
    pub fn new(
        driver_name: impl Into<String>,
        vehicle_plate: impl Into<String>,
        route: impl Into<String>,
        package_count: u32,
        packages_received: u32,
        stop_count: u32,
    ) -> Self {
        Self {
            driver_name: driver_name.into(),
            vehicle_plate: vehicle_plate.into(),
            route: route.into(),
            package_count,
            packages_received,
            stop_count,
            packages_delivered: None,
            packages_returned: None,
            notes: None,
        }
    }

    pub fn with_delivered(mut self, delivered: u32) -> Self {
        self.packages_delivered = Some(delivered);
        self
    }

    pub fn with_returned(mut self, returned: u32) -> Self {
        self.packages_returned = Some(returned);
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }
}

/// The fields of a [`Report`], in display and export order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReportField {
    DriverName,
    VehiclePlate,
    Route,
    PackageCount,
    PackagesReceived,
    StopCount,
    PackagesDelivered,
    PackagesReturned,
    Notes,
}

impl ReportField {
    pub const ALL: [ReportField; 9] = [
        ReportField::DriverName,
        ReportField::VehiclePlate,
        ReportField::Route,
        ReportField::PackageCount,
        ReportField::PackagesReceived,
        ReportField::StopCount,
        ReportField::PackagesDelivered,
        ReportField::PackagesReturned,
        ReportField::Notes,
    ];

    /// JSON key used on the wire and in the offline queue.
    pub fn wire_name(&self) -> &'static str {
        match self {
            ReportField::DriverName => "nombreApellido",
            ReportField::VehiclePlate => "patente",
            ReportField::Route => "ruta",
            ReportField::PackageCount => "numeroPaquetes",
            ReportField::PackagesReceived => "paquetesRecibidos",
            ReportField::StopCount => "cantidadParadas",
            ReportField::PackagesDelivered => "paquetesEntregados",
            ReportField::PackagesReturned => "paquetesDevueltos",
            ReportField::Notes => "observaciones",
        }
    }

    /// Human-readable column heading.
    pub fn label(&self) -> &'static str {
        match self {
            ReportField::DriverName => "Nombre y Apellido",
            ReportField::VehiclePlate => "Patente",
            ReportField::Route => "Ruta",
            ReportField::PackageCount => "Número de Paquetes",
            ReportField::PackagesReceived => "Paquetes Recibidos",
            ReportField::StopCount => "Cantidad de Paradas",
            ReportField::PackagesDelivered => "Paquetes Entregados",
            ReportField::PackagesReturned => "Paquetes Devueltos",
            ReportField::Notes => "Observaciones",
        }
    }

    pub fn is_required(&self) -> bool {
        !matches!(
            self,
            ReportField::PackagesDelivered | ReportField::PackagesReturned | ReportField::Notes
        )
    }

    /// Render this field of `report` as display text; absent values are empty.
    pub fn value_of(&self, report: &Report) -> String {
        fn opt(v: Option<u32>) -> String {
            v.map(|n| n.to_string()).unwrap_or_default()
        }

        match self {
            ReportField::DriverName => report.driver_name.clone(),
            ReportField::VehiclePlate => report.vehicle_plate.clone(),
            ReportField::Route => report.route.clone(),
            ReportField::PackageCount => report.package_count.to_string(),
            ReportField::PackagesReceived => report.packages_received.to_string(),
            ReportField::StopCount => report.stop_count.to_string(),
            ReportField::PackagesDelivered => opt(report.packages_delivered),
            ReportField::PackagesReturned => opt(report.packages_returned),
            ReportField::Notes => report.notes.clone().unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn serializes_with_service_field_names_and_omits_absent_optionals() {
        let report = Report::new("Ana Pérez", "AB123CD", "Norte", 120, 118, 35);
        let value = serde_json::to_value(&report).unwrap();

        assert_eq!(
            value,
            json!({
                "nombreApellido": "Ana Pérez",
                "patente": "AB123CD",
                "ruta": "Norte",
                "numeroPaquetes": 120,
                "paquetesRecibidos": 118,
                "cantidadParadas": 35
            })
        );
    }

    #[test]
    fn optionals_round_trip_and_null_reads_as_absent() {
        let report = Report::new("Ana", "AB1", "Sur", 1, 2, 3)
            .with_delivered(2)
            .with_returned(0)
            .with_notes("ok");
        let text = serde_json::to_string(&report).unwrap();
        assert_eq!(serde_json::from_str::<Report>(&text).unwrap(), report);

        let with_null: Report = serde_json::from_value(json!({
            "nombreApellido": "Ana",
            "patente": "AB1",
            "ruta": "Sur",
            "numeroPaquetes": 1,
            "paquetesRecibidos": 2,
            "cantidadParadas": 3,
            "observaciones": null
        }))
        .unwrap();
        assert_eq!(with_null.notes, None);
    }

    #[test]
    fn field_catalogue_matches_required_set() {
        let required: Vec<_> = ReportField::ALL
            .iter()
            .filter(|f| f.is_required())
            .map(|f| f.wire_name())
            .collect();
        assert_eq!(
            required,
            vec![
                "nombreApellido",
                "patente",
                "ruta",
                "numeroPaquetes",
                "paquetesRecibidos",
                "cantidadParadas"
            ]
        );
    }

    #[test]
    fn value_of_renders_zero_counts_and_blank_optionals() {
        let report = Report::new("Ana", "AB1", "Sur", 0, 0, 0);
        assert_eq!(ReportField::PackageCount.value_of(&report), "0");
        assert_eq!(ReportField::PackagesDelivered.value_of(&report), "");
        assert_eq!(ReportField::Notes.value_of(&report), "");
    }
}
