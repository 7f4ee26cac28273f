use chrono::NaiveDate;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::SchedulingError;
use crate::models::{BookedSnapshot, SlotTime};

/// Last local check before a booking is submitted: the slot list the patient
/// picked from may be stale, so the requested time is re-checked against a
/// freshly fetched snapshot. The backend stays the final authority.
#[derive(Debug, Clone, Copy, Default)]
pub struct BookingConflictGuard;

impl BookingConflictGuard {
    pub fn new() -> Self {
        Self
    }

    pub fn check_conflict(
        &self,
        provider_id: Uuid,
        date: NaiveDate,
        time: SlotTime,
        snapshot: &BookedSnapshot,
    ) -> Result<(), SchedulingError> {
        if snapshot.provider_id != provider_id || snapshot.date != date {
            return Err(SchedulingError::ValidationError(format!(
                "booked-slot snapshot covers provider {} on {}, not provider {} on {}",
                snapshot.provider_id, snapshot.date, provider_id, date
            )));
        }

        if snapshot.slots.contains(&time) {
            warn!(
                "Slot {} on {} for provider {} already booked (snapshot from {})",
                time, date, provider_id, snapshot.fetched_at
            );
            return Err(SchedulingError::Conflict(format!(
                "{} on {} is already booked",
                time, date
            )));
        }

        debug!("Slot {} on {} for provider {} is free", time, date, provider_id);
        Ok(())
    }
}
