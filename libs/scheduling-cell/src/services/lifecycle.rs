// libs/scheduling-cell/src/services/lifecycle.rs
use chrono::{Duration, NaiveDateTime};
use tracing::{debug, info, warn};

use shared_config::AppConfig;
use shared_models::auth::ActorRole;

use crate::error::SchedulingError;
use crate::models::{Appointment, AppointmentStatus};

/// When a patient may still cancel a confirmed appointment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CancellationPolicy {
    pub enforce: bool,
    /// Minutes before the start time after which patients can no longer cancel.
    pub cutoff_minutes: i64,
}

impl Default for CancellationPolicy {
    fn default() -> Self {
        Self {
            enforce: true,
            cutoff_minutes: 0,
        }
    }
}

impl CancellationPolicy {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            enforce: config.enforce_cancellation_cutoff,
            cutoff_minutes: config.cancellation_cutoff_minutes.max(0),
        }
    }

    pub fn disabled() -> Self {
        Self {
            enforce: false,
            cutoff_minutes: 0,
        }
    }

    pub fn allows_cancellation(&self, starts_at: NaiveDateTime, now: NaiveDateTime) -> bool {
        !self.enforce || now < starts_at - Duration::minutes(self.cutoff_minutes)
    }
}

/// Role-gated appointment lifecycle: pending -> confirmed/cancelled -> completed.
#[derive(Debug, Clone, Default)]
pub struct AppointmentLifecycleService {
    policy: CancellationPolicy,
}

impl AppointmentLifecycleService {
    pub fn new(policy: CancellationPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &CancellationPolicy {
        &self.policy
    }

    /// Targets `role` may move an appointment to from `current`, ignoring time-based
    /// preconditions.
    pub fn get_valid_transitions(
        &self,
        current: AppointmentStatus,
        role: ActorRole,
    ) -> Vec<AppointmentStatus> {
        use AppointmentStatus::*;

        match (current, role) {
            (Pending, ActorRole::Provider) => vec![Confirmed, Cancelled],
            (Pending, ActorRole::Patient) => vec![Cancelled],
            (Confirmed, ActorRole::Provider) => vec![Completed],
            (Confirmed, ActorRole::Patient) => vec![Cancelled],
            // Terminal states
            (Completed, _) | (Cancelled, _) => vec![],
        }
    }

    /// Validate a transition request and return the new canonical status.
    /// Never persists anything.
    pub fn validate_transition(
        &self,
        appointment: &Appointment,
        role: ActorRole,
        target: AppointmentStatus,
        now: NaiveDateTime,
    ) -> Result<AppointmentStatus, SchedulingError> {
        let current = appointment.status;
        debug!(
            "Validating transition {} -> {} by {} for appointment {}",
            current, target, role, appointment.id
        );

        if !self.get_valid_transitions(current, role).contains(&target) {
            warn!(
                "Invalid transition attempted on {}: {} -> {} by {}",
                appointment.id, current, target, role
            );
            return Err(SchedulingError::InvalidTransition(format!(
                "{} cannot move an appointment from {} to {}",
                role, current, target
            )));
        }

        if current == AppointmentStatus::Confirmed
            && target == AppointmentStatus::Cancelled
            && role == ActorRole::Patient
            && !self.policy.allows_cancellation(appointment.starts_at(), now)
        {
            warn!(
                "Cancellation cutoff passed for appointment {} starting {}",
                appointment.id,
                appointment.starts_at()
            );
            return Err(SchedulingError::InvalidTransition(format!(
                "confirmed appointments can only be cancelled more than {} minutes before {}",
                self.policy.cutoff_minutes,
                appointment.starts_at()
            )));
        }

        info!("Transition validated for {}: {} -> {}", appointment.id, current, target);
        Ok(target)
    }
}
