// libs/scheduling-cell/src/services/backend.rs
use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Method;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, error};
use uuid::Uuid;

use shared_backend::{BackendClient, BackendError};
use shared_config::AppConfig;

use crate::error::SchedulingError;
use crate::models::{
    Appointment, AppointmentFilter, AppointmentStatus, BookedSlotSet, DayOfWeek,
    NewAppointment, ProviderSchedule, WorkingHours,
};

/// The external persistence collaborator. Only the scheduling facade talks to it.
#[async_trait]
pub trait SchedulingBackend: Send + Sync {
    async fn fetch_schedule(
        &self,
        provider_id: Uuid,
        auth_token: &str,
    ) -> Result<ProviderSchedule, SchedulingError>;

    async fn fetch_booked_slots(
        &self,
        provider_id: Uuid,
        date: NaiveDate,
        auth_token: &str,
    ) -> Result<BookedSlotSet, SchedulingError>;

    async fn create_appointment(
        &self,
        appointment: &NewAppointment,
        auth_token: &str,
    ) -> Result<Appointment, SchedulingError>;

    async fn update_appointment_status(
        &self,
        appointment_id: Uuid,
        status: AppointmentStatus,
        auth_token: &str,
    ) -> Result<Appointment, SchedulingError>;

    async fn cancel_appointment(
        &self,
        appointment_id: Uuid,
        auth_token: &str,
    ) -> Result<(), SchedulingError>;

    async fn fetch_appointment(
        &self,
        appointment_id: Uuid,
        auth_token: &str,
    ) -> Result<Appointment, SchedulingError>;

    async fn list_appointments(
        &self,
        filter: &AppointmentFilter,
        auth_token: &str,
    ) -> Result<Vec<Appointment>, SchedulingError>;
}

/// Schedule as sent by the backend; the slot duration may be omitted.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ScheduleBody {
    #[serde(default)]
    days: BTreeMap<DayOfWeek, WorkingHours>,
    slot_duration_minutes: Option<i64>,
}

/// [`SchedulingBackend`] over the clinic's REST API.
pub struct RestSchedulingBackend {
    client: BackendClient,
    default_slot_duration_minutes: i64,
}

impl RestSchedulingBackend {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: BackendClient::new(config),
            default_slot_duration_minutes: config.default_slot_duration_minutes,
        }
    }
}

#[async_trait]
impl SchedulingBackend for RestSchedulingBackend {
    async fn fetch_schedule(
        &self,
        provider_id: Uuid,
        auth_token: &str,
    ) -> Result<ProviderSchedule, SchedulingError> {
        debug!("Fetching schedule for provider {}", provider_id);

        let path = format!("/providers/{}/schedule", provider_id);
        let body: ScheduleBody = self
            .client
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| map_backend_error(e, &format!("provider {}", provider_id)))?;

        Ok(ProviderSchedule {
            days: body.days,
            slot_duration_minutes: body
                .slot_duration_minutes
                .unwrap_or(self.default_slot_duration_minutes),
        })
    }

    async fn fetch_booked_slots(
        &self,
        provider_id: Uuid,
        date: NaiveDate,
        auth_token: &str,
    ) -> Result<BookedSlotSet, SchedulingError> {
        debug!("Fetching booked slots for provider {} on {}", provider_id, date);

        let path = format!("/providers/{}/booked-slots?date={}", provider_id, date);
        self.client
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| map_backend_error(e, &format!("provider {}", provider_id)))
    }

    async fn create_appointment(
        &self,
        appointment: &NewAppointment,
        auth_token: &str,
    ) -> Result<Appointment, SchedulingError> {
        debug!(
            "Creating appointment for patient {} with provider {} at {} {}",
            appointment.patient_id, appointment.provider_id, appointment.date, appointment.time
        );

        let body = serde_json::to_value(appointment)
            .map_err(|e| SchedulingError::ValidationError(e.to_string()))?;

        self.client
            .request(Method::POST, "/appointments", Some(auth_token), Some(body))
            .await
            .map_err(|e| map_backend_error(e, &format!("provider {}", appointment.provider_id)))
    }

    async fn update_appointment_status(
        &self,
        appointment_id: Uuid,
        status: AppointmentStatus,
        auth_token: &str,
    ) -> Result<Appointment, SchedulingError> {
        debug!("Updating appointment {} to {}", appointment_id, status);

        let path = format!("/appointments/{}/status", appointment_id);
        self.client
            .request(
                Method::PATCH,
                &path,
                Some(auth_token),
                Some(json!({ "status": status })),
            )
            .await
            .map_err(|e| map_backend_error(e, &format!("appointment {}", appointment_id)))
    }

    async fn cancel_appointment(
        &self,
        appointment_id: Uuid,
        auth_token: &str,
    ) -> Result<(), SchedulingError> {
        debug!("Cancelling appointment {}", appointment_id);

        let path = format!("/appointments/{}/cancel", appointment_id);
        self.client
            .request_empty(Method::POST, &path, Some(auth_token), None)
            .await
            .map_err(|e| map_backend_error(e, &format!("appointment {}", appointment_id)))
    }

    async fn fetch_appointment(
        &self,
        appointment_id: Uuid,
        auth_token: &str,
    ) -> Result<Appointment, SchedulingError> {
        let path = format!("/appointments/{}", appointment_id);
        self.client
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| map_backend_error(e, &format!("appointment {}", appointment_id)))
    }

    async fn list_appointments(
        &self,
        filter: &AppointmentFilter,
        auth_token: &str,
    ) -> Result<Vec<Appointment>, SchedulingError> {
        let mut query_parts = Vec::new();
        if let Some(patient_id) = filter.patient_id {
            query_parts.push(format!("patientId={}", patient_id));
        }
        if let Some(provider_id) = filter.provider_id {
            query_parts.push(format!("providerId={}", provider_id));
        }

        if query_parts.is_empty() {
            return Err(SchedulingError::ValidationError(
                "listing appointments needs a patient or provider".to_string(),
            ));
        }

        let path = format!("/appointments?{}", query_parts.join("&"));
        self.client
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| map_backend_error(e, "appointments"))
    }
}

/// Translate a backend failure into the scheduling taxonomy. `subject` names
/// what was being looked up, for `NotFound` messages.
pub fn map_backend_error(err: BackendError, subject: &str) -> SchedulingError {
    match err {
        BackendError::Status { status, code, message } => match (status, code.as_deref()) {
            (_, Some("invalid_transition")) => SchedulingError::InvalidTransition(message),
            (_, Some("already_terminal")) => SchedulingError::AlreadyTerminal(message),
            (404, _) => SchedulingError::NotFound(format!("{} not found", subject)),
            (409, _) => SchedulingError::Conflict(message),
            (400, _) | (422, _) => SchedulingError::ValidationError(message),
            (401, _) | (403, _) => SchedulingError::Unauthorized(message),
            _ => {
                error!("Unexpected backend status {} for {}: {}", status, subject, message);
                SchedulingError::Backend(format!("backend responded {}: {}", status, message))
            }
        },
        other => {
            error!("Backend unreachable while handling {}: {}", subject, other);
            SchedulingError::Backend(other.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(status: u16, code: Option<&str>) -> BackendError {
        BackendError::Status {
            status,
            code: code.map(str::to_string),
            message: "msg".to_string(),
        }
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            map_backend_error(status(404, None), "appointment x"),
            SchedulingError::NotFound("appointment x not found".to_string())
        );
        assert_eq!(map_backend_error(status(409, None), "s"), SchedulingError::Conflict("msg".into()));
        assert_eq!(map_backend_error(status(422, None), "s"), SchedulingError::ValidationError("msg".into()));
        assert_eq!(map_backend_error(status(400, None), "s"), SchedulingError::ValidationError("msg".into()));
        assert_eq!(map_backend_error(status(403, None), "s"), SchedulingError::Unauthorized("msg".into()));
        assert!(matches!(map_backend_error(status(503, None), "s"), SchedulingError::Backend(_)));
    }

    #[test]
    fn test_error_codes_take_precedence() {
        assert_eq!(
            map_backend_error(status(409, Some("already_terminal")), "s"),
            SchedulingError::AlreadyTerminal("msg".into())
        );
        assert_eq!(
            map_backend_error(status(422, Some("invalid_transition")), "s"),
            SchedulingError::InvalidTransition("msg".into())
        );
    }
}
