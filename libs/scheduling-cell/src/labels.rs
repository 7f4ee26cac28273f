// libs/scheduling-cell/src/labels.rs
//! Display labels shown to users. Core logic only ever sees the enums.
use serde::Serialize;
use serde_json::{json, Value};

use crate::models::{Appointment, AppointmentStatus, AppointmentType};

pub fn status_label(status: AppointmentStatus) -> &'static str {
    match status {
        AppointmentStatus::Pending => "En attente",
        AppointmentStatus::Confirmed => "Confirmé",
        AppointmentStatus::Completed => "Terminé",
        AppointmentStatus::Cancelled => "Annulé",
    }
}

pub fn type_label(appointment_type: AppointmentType) -> &'static str {
    match appointment_type {
        AppointmentType::Consultation => "Consultation",
        AppointmentType::FollowUp => "Suivi",
        AppointmentType::Emergency => "Urgence",
        AppointmentType::HomeVisit => "Visite à domicile",
        AppointmentType::Video => "Téléconsultation",
    }
}

/// Every label, keyed by wire value, for clients that render their own lists.
pub fn label_table() -> Value {
    let statuses: serde_json::Map<String, Value> = AppointmentStatus::ALL
        .iter()
        .map(|s| (s.to_string(), json!(status_label(*s))))
        .collect();

    let types: serde_json::Map<String, Value> = AppointmentType::ALL
        .iter()
        .map(|t| (t.to_string(), json!(type_label(*t))))
        .collect();

    json!({
        "statuses": statuses,
        "types": types
    })
}

/// An appointment as returned to the UI, with its labels attached.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentView {
    #[serde(flatten)]
    pub appointment: Appointment,
    pub status_label: &'static str,
    pub type_label: &'static str,
}

impl From<Appointment> for AppointmentView {
    fn from(appointment: Appointment) -> Self {
        Self {
            status_label: status_label(appointment.status),
            type_label: type_label(appointment.appointment_type),
            appointment,
        }
    }
}
