// libs/scheduling-cell/src/services/scheduling.rs
use std::collections::HashMap;
use std::sync::Arc;

use chrono::NaiveDate;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::{Actor, ActorRole};

use crate::error::SchedulingError;
use crate::models::{
    Appointment, AppointmentFilter, AppointmentStatus, BookedSnapshot, BookingRequest,
    CandidateSlot, NewAppointment,
};
use crate::services::backend::SchedulingBackend;
use crate::services::clock::Clock;
use crate::services::conflict::BookingConflictGuard;
use crate::services::lifecycle::{AppointmentLifecycleService, CancellationPolicy};
use crate::services::slots::SlotGeneratorService;

/// Facade-level knobs, normally read from [`AppConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulingSettings {
    pub hide_past_slots: bool,
    pub max_reason_length: usize,
    pub cancellation: CancellationPolicy,
    /// Most appointments kept in the local view before the stalest is dropped.
    pub local_view_capacity: usize,
}

impl Default for SchedulingSettings {
    fn default() -> Self {
        Self {
            hide_past_slots: true,
            max_reason_length: 500,
            cancellation: CancellationPolicy::default(),
            local_view_capacity: 1000,
        }
    }
}

impl SchedulingSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            hide_past_slots: config.hide_past_slots,
            max_reason_length: config.max_reason_length,
            cancellation: CancellationPolicy::from_config(config),
            local_view_capacity: config.local_view_capacity,
        }
    }
}

/// Single entry point for scheduling. Owns the backend collaborator and the
/// local view of appointments the current session has seen.
pub struct SchedulingService {
    backend: Arc<dyn SchedulingBackend>,
    slot_generator: SlotGeneratorService,
    conflict_guard: BookingConflictGuard,
    lifecycle_service: AppointmentLifecycleService,
    clock: Arc<dyn Clock>,
    settings: SchedulingSettings,
    appointments: RwLock<LocalView>,
}

impl SchedulingService {
    pub fn new(
        backend: Arc<dyn SchedulingBackend>,
        clock: Arc<dyn Clock>,
        settings: SchedulingSettings,
    ) -> Self {
        Self {
            backend,
            slot_generator: SlotGeneratorService::new(),
            conflict_guard: BookingConflictGuard::new(),
            lifecycle_service: AppointmentLifecycleService::new(settings.cancellation),
            clock,
            appointments: RwLock::new(LocalView::new(settings.local_view_capacity)),
            settings,
        }
    }

    pub fn from_config(
        backend: Arc<dyn SchedulingBackend>,
        clock: Arc<dyn Clock>,
        config: &AppConfig,
    ) -> Self {
        Self::new(backend, clock, SchedulingSettings::from_config(config))
    }

    pub fn settings(&self) -> &SchedulingSettings {
        &self.settings
    }

    // ==============================================================================
    // SLOTS
    // ==============================================================================

    /// Full slot grid for one provider and date. Booked slots, and slots that
    /// already started when past slots are hidden, come back unavailable.
    pub async fn list_slot_grid(
        &self,
        provider_id: Uuid,
        date: NaiveDate,
        auth_token: &str,
    ) -> Result<Vec<CandidateSlot>, SchedulingError> {
        debug!("Listing slots for provider {} on {}", provider_id, date);

        let (schedule, booked) = tokio::try_join!(
            self.backend.fetch_schedule(provider_id, auth_token),
            self.backend.fetch_booked_slots(provider_id, date, auth_token),
        )?;

        if let Err(e) = schedule.validate() {
            debug!("Provider {} schedule has unusable days: {}", provider_id, e);
        }

        let mut grid = self.slot_generator.candidate_slots(&schedule, date, &booked);

        if self.settings.hide_past_slots {
            let now = self.clock.now();
            for slot in grid.iter_mut() {
                if date.and_time(slot.time.as_naive_time()) <= now {
                    slot.available = false;
                }
            }
        }

        Ok(grid)
    }

    /// Bookable start times for one provider and date, ascending.
    pub async fn list_available_slots(
        &self,
        provider_id: Uuid,
        date: NaiveDate,
        auth_token: &str,
    ) -> Result<Vec<CandidateSlot>, SchedulingError> {
        let slots: Vec<CandidateSlot> = self
            .list_slot_grid(provider_id, date, auth_token)
            .await?
            .into_iter()
            .filter(|slot| slot.available)
            .collect();

        debug!("{} slots available for provider {} on {}", slots.len(), provider_id, date);
        Ok(slots)
    }

    // ==============================================================================
    // BOOKING
    // ==============================================================================

    /// Book a slot for a patient. The time must be on the provider's slot grid
    /// for that date, and is re-checked against a fresh booked-slot snapshot
    /// before anything is written.
    pub async fn book_appointment(
        &self,
        request: BookingRequest,
        auth_token: &str,
    ) -> Result<Appointment, SchedulingError> {
        info!(
            "Booking request: patient {} with provider {} at {} {}",
            request.patient_id, request.provider_id, request.date, request.time
        );

        let reason = self.normalize_reason(request.reason)?;

        let starts_at = request.date.and_time(request.time.as_naive_time());
        if starts_at <= self.clock.now() {
            return Err(SchedulingError::ValidationError(format!(
                "cannot book {} {}, it is in the past",
                request.date, request.time
            )));
        }

        let (schedule, booked) = tokio::try_join!(
            self.backend.fetch_schedule(request.provider_id, auth_token),
            self.backend
                .fetch_booked_slots(request.provider_id, request.date, auth_token),
        )?;

        let on_grid = self
            .slot_generator
            .candidate_slots(&schedule, request.date, &booked)
            .iter()
            .any(|slot| slot.time == request.time);
        if !on_grid {
            warn!(
                "Rejected booking at {} {}: not a slot offered by provider {}",
                request.date, request.time, request.provider_id
            );
            return Err(SchedulingError::ValidationError(format!(
                "{} on {} is not an offered slot",
                request.time, request.date
            )));
        }

        let snapshot = BookedSnapshot::new(request.provider_id, request.date, booked);

        self.conflict_guard
            .check_conflict(request.provider_id, request.date, request.time, &snapshot)?;

        let new_appointment = NewAppointment {
            patient_id: request.patient_id,
            provider_id: request.provider_id,
            date: request.date,
            time: request.time,
            appointment_type: request.appointment_type,
            reason,
            status: AppointmentStatus::Pending,
        };

        let created = self
            .backend
            .create_appointment(&new_appointment, auth_token)
            .await
            .map_err(|e| {
                if let SchedulingError::Conflict(_) = e {
                    warn!(
                        "Slot {} {} for provider {} was taken before the booking landed",
                        request.date, request.time, request.provider_id
                    );
                }
                e
            })?;

        if created.status != AppointmentStatus::Pending {
            warn!(
                "Backend created appointment {} as {} instead of pending",
                created.id, created.status
            );
        }

        self.appointments.write().await.remember(created.clone());

        info!("Appointment {} booked", created.id);
        Ok(created)
    }

    fn normalize_reason(&self, reason: Option<String>) -> Result<Option<String>, SchedulingError> {
        let reason = reason
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty());

        if let Some(r) = &reason {
            if r.chars().count() > self.settings.max_reason_length {
                return Err(SchedulingError::ValidationError(format!(
                    "reason must be at most {} characters",
                    self.settings.max_reason_length
                )));
            }
        }

        Ok(reason)
    }

    // ==============================================================================
    // LIFECYCLE
    // ==============================================================================

    /// Move an appointment to `target` on behalf of `actor`. The local view is
    /// updated before the backend call and restored if that call fails, unless
    /// a newer value replaced the optimistic one in the meantime.
    pub async fn transition_appointment(
        &self,
        appointment_id: Uuid,
        actor: &Actor,
        target: AppointmentStatus,
        auth_token: &str,
    ) -> Result<Appointment, SchedulingError> {
        info!(
            "Transition request on {} to {} by {} {}",
            appointment_id, target, actor.role, actor.id
        );

        let current = self
            .backend
            .fetch_appointment(appointment_id, auth_token)
            .await?;
        authorize(&current, actor)?;

        let status = self.lifecycle_service.validate_transition(
            &current,
            actor.role,
            target,
            self.clock.now(),
        )?;

        let optimistic = current.with_status(status);
        self.appointments.write().await.remember(optimistic.clone());

        let persisted = if status == AppointmentStatus::Cancelled {
            self.backend
                .cancel_appointment(appointment_id, auth_token)
                .await
                .map(|_| optimistic.clone())
        } else {
            self.backend
                .update_appointment_status(appointment_id, status, auth_token)
                .await
        };

        match persisted {
            Ok(updated) => {
                self.appointments.write().await.remember(updated.clone());
                info!("Appointment {} is now {}", appointment_id, updated.status);
                Ok(updated)
            }
            Err(e) => {
                warn!(
                    "Persisting {} -> {} for {} failed, rolling back: {}",
                    current.status, status, appointment_id, e
                );
                let mut view = self.appointments.write().await;
                if !view.replace_if_unchanged(&optimistic, current) {
                    debug!("Appointment {} changed while persisting, keeping newer value", appointment_id);
                }
                Err(e)
            }
        }
    }

    // ==============================================================================
    // QUERIES
    // ==============================================================================

    pub async fn get_appointment(
        &self,
        appointment_id: Uuid,
        actor: &Actor,
        auth_token: &str,
    ) -> Result<Appointment, SchedulingError> {
        let appointment = self
            .backend
            .fetch_appointment(appointment_id, auth_token)
            .await?;
        authorize(&appointment, actor)?;

        self.appointments.write().await.remember(appointment.clone());
        Ok(appointment)
    }

    /// The actor's own appointments, newest first.
    pub async fn list_appointments(
        &self,
        actor: &Actor,
        auth_token: &str,
    ) -> Result<Vec<Appointment>, SchedulingError> {
        let filter = match actor.role {
            ActorRole::Patient => AppointmentFilter {
                patient_id: Some(actor.id),
                provider_id: None,
            },
            ActorRole::Provider => AppointmentFilter {
                patient_id: None,
                provider_id: Some(actor.id),
            },
        };

        let mut appointments = self.backend.list_appointments(&filter, auth_token).await?;
        appointments.sort_by(|a, b| b.starts_at().cmp(&a.starts_at()));

        let mut view = self.appointments.write().await;
        for appointment in &appointments {
            view.remember(appointment.clone());
        }
        drop(view);

        debug!("{} appointments for {} {}", appointments.len(), actor.role, actor.id);
        Ok(appointments)
    }

    /// Last known local value of an appointment, without touching the backend.
    pub async fn cached_appointment(&self, appointment_id: Uuid) -> Option<Appointment> {
        self.appointments.read().await.get(&appointment_id).cloned()
    }

    pub async fn local_view_len(&self) -> usize {
        self.appointments.read().await.len()
    }
}

/// Appointments seen by this service, capped at `capacity`. When full, the
/// entry touched least recently (by `updated_at`, else `created_at`) goes.
#[derive(Debug)]
struct LocalView {
    capacity: usize,
    entries: HashMap<Uuid, Appointment>,
}

impl LocalView {
    fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: HashMap::new(),
        }
    }

    fn get(&self, id: &Uuid) -> Option<&Appointment> {
        self.entries.get(id)
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn remember(&mut self, appointment: Appointment) {
        if self.capacity == 0 {
            return;
        }

        if !self.entries.contains_key(&appointment.id) && self.entries.len() >= self.capacity {
            let stalest = self
                .entries
                .values()
                .min_by_key(|a| a.updated_at.unwrap_or(a.created_at))
                .map(|a| a.id);
            if let Some(id) = stalest {
                self.entries.remove(&id);
            }
        }

        self.entries.insert(appointment.id, appointment);
    }

    /// Put `previous` back only if the entry is still exactly `expected`.
    fn replace_if_unchanged(&mut self, expected: &Appointment, previous: Appointment) -> bool {
        match self.entries.get_mut(&expected.id) {
            Some(entry) if entry == expected => {
                *entry = previous;
                true
            }
            _ => false,
        }
    }
}

fn authorize(appointment: &Appointment, actor: &Actor) -> Result<(), SchedulingError> {
    let owner = match actor.role {
        ActorRole::Patient => appointment.patient_id,
        ActorRole::Provider => appointment.provider_id,
    };

    if owner != actor.id {
        warn!(
            "{} {} tried to act on appointment {} they are not part of",
            actor.role, actor.id, appointment.id
        );
        return Err(SchedulingError::Unauthorized(format!(
            "appointment {} does not belong to this {}",
            appointment.id, actor.role
        )));
    }

    Ok(())
}
