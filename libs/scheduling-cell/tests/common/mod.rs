#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime, Utc};
use tokio::sync::Notify;
use uuid::Uuid;

use scheduling_cell::{
    Appointment, AppointmentFilter, AppointmentStatus, AppointmentType, BookedSlotSet,
    DayOfWeek, FixedClock, NewAppointment, ProviderSchedule, SchedulingBackend,
    SchedulingError, SchedulingService, SchedulingSettings, SlotTime, WorkingHours,
};

pub fn t(raw: &str) -> SlotTime {
    raw.parse().unwrap()
}

/// Monday 2026-01-05.
pub fn monday() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 1, 5).unwrap()
}

pub fn at(date: NaiveDate, hh: u32, mm: u32) -> NaiveDateTime {
    date.and_hms_opt(hh, mm, 0).unwrap()
}

/// New Year's morning, well before any fixture appointment.
pub fn new_year() -> NaiveDateTime {
    at(NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(), 8, 0)
}

/// Monday 09:00-10:00 in 30 minute slots.
pub fn monday_morning_schedule() -> ProviderSchedule {
    ProviderSchedule::new(30)
        .with_day(DayOfWeek::Monday, WorkingHours::working(t("09:00"), t("10:00")))
}

#[derive(Default)]
struct BackendState {
    schedules: HashMap<Uuid, ProviderSchedule>,
    appointments: HashMap<Uuid, Appointment>,
}

/// In-memory stand-in for the REST backend. Creation is atomic per slot, so
/// it plays the role of the final authority on double bookings.
#[derive(Default)]
pub struct InMemoryBackend {
    state: Mutex<BackendState>,
    pub create_calls: AtomicUsize,
    pub update_calls: AtomicUsize,
    pub cancel_calls: AtomicUsize,
    fail_writes: AtomicBool,
    hold_cancels: AtomicBool,
    fail_cancels: AtomicBool,
    release: Notify,
}

impl InMemoryBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn add_schedule(&self, provider_id: Uuid, schedule: ProviderSchedule) {
        self.state.lock().unwrap().schedules.insert(provider_id, schedule);
    }

    pub fn seed_appointment(
        &self,
        patient_id: Uuid,
        provider_id: Uuid,
        date: NaiveDate,
        time: &str,
        status: AppointmentStatus,
    ) -> Appointment {
        let appointment = Appointment {
            id: Uuid::new_v4(),
            patient_id,
            provider_id,
            date,
            time: t(time),
            appointment_type: AppointmentType::Consultation,
            reason: None,
            status,
            created_at: Utc::now(),
            updated_at: None,
        };
        self.state
            .lock()
            .unwrap()
            .appointments
            .insert(appointment.id, appointment.clone());
        appointment
    }

    pub fn stored(&self, id: Uuid) -> Option<Appointment> {
        self.state.lock().unwrap().appointments.get(&id).cloned()
    }

    pub fn appointment_count(&self) -> usize {
        self.state.lock().unwrap().appointments.len()
    }

    /// Make every status write fail with a backend error.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Park every cancel call until `release_cancel` is called.
    pub fn hold_cancels(&self, hold: bool) {
        self.hold_cancels.store(hold, Ordering::SeqCst);
    }

    pub fn release_cancel(&self) {
        self.release.notify_one();
    }

    /// Make cancel calls fail while status updates keep working.
    pub fn fail_cancels(&self, fail: bool) {
        self.fail_cancels.store(fail, Ordering::SeqCst);
    }

    fn check_writes(&self) -> Result<(), SchedulingError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(SchedulingError::Backend("backend responded 503: unavailable".to_string()));
        }
        Ok(())
    }

    fn booked(&self, provider_id: Uuid, date: NaiveDate) -> BookedSlotSet {
        self.state
            .lock()
            .unwrap()
            .appointments
            .values()
            .filter(|a| a.provider_id == provider_id && a.date == date)
            .filter(|a| a.status != AppointmentStatus::Cancelled)
            .map(|a| a.time)
            .collect()
    }
}

#[async_trait]
impl SchedulingBackend for InMemoryBackend {
    async fn fetch_schedule(
        &self,
        provider_id: Uuid,
        _auth_token: &str,
    ) -> Result<ProviderSchedule, SchedulingError> {
        self.state
            .lock()
            .unwrap()
            .schedules
            .get(&provider_id)
            .cloned()
            .ok_or_else(|| SchedulingError::NotFound(format!("provider {} not found", provider_id)))
    }

    async fn fetch_booked_slots(
        &self,
        provider_id: Uuid,
        date: NaiveDate,
        _auth_token: &str,
    ) -> Result<BookedSlotSet, SchedulingError> {
        let booked = self.booked(provider_id, date);
        // Let concurrent callers read the same state before anyone writes.
        tokio::task::yield_now().await;
        Ok(booked)
    }

    async fn create_appointment(
        &self,
        appointment: &NewAppointment,
        _auth_token: &str,
    ) -> Result<Appointment, SchedulingError> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);

        let mut state = self.state.lock().unwrap();
        let taken = state.appointments.values().any(|a| {
            a.provider_id == appointment.provider_id
                && a.date == appointment.date
                && a.time == appointment.time
                && a.status != AppointmentStatus::Cancelled
        });
        if taken {
            return Err(SchedulingError::Conflict("slot already booked".to_string()));
        }

        let created = Appointment {
            id: Uuid::new_v4(),
            patient_id: appointment.patient_id,
            provider_id: appointment.provider_id,
            date: appointment.date,
            time: appointment.time,
            appointment_type: appointment.appointment_type,
            reason: appointment.reason.clone(),
            status: appointment.status,
            created_at: Utc::now(),
            updated_at: None,
        };
        state.appointments.insert(created.id, created.clone());
        Ok(created)
    }

    async fn update_appointment_status(
        &self,
        appointment_id: Uuid,
        status: AppointmentStatus,
        _auth_token: &str,
    ) -> Result<Appointment, SchedulingError> {
        self.update_calls.fetch_add(1, Ordering::SeqCst);
        self.check_writes()?;

        let mut state = self.state.lock().unwrap();
        let appointment = state
            .appointments
            .get_mut(&appointment_id)
            .ok_or_else(|| SchedulingError::NotFound(format!("appointment {} not found", appointment_id)))?;
        appointment.status = status;
        appointment.updated_at = Some(Utc::now());
        Ok(appointment.clone())
    }

    async fn cancel_appointment(
        &self,
        appointment_id: Uuid,
        _auth_token: &str,
    ) -> Result<(), SchedulingError> {
        self.cancel_calls.fetch_add(1, Ordering::SeqCst);
        if self.hold_cancels.load(Ordering::SeqCst) {
            self.release.notified().await;
        }
        self.check_writes()?;
        if self.fail_cancels.load(Ordering::SeqCst) {
            return Err(SchedulingError::Backend("backend responded 503: unavailable".to_string()));
        }

        let mut state = self.state.lock().unwrap();
        let appointment = state
            .appointments
            .get_mut(&appointment_id)
            .ok_or_else(|| SchedulingError::NotFound(format!("appointment {} not found", appointment_id)))?;
        if appointment.status.is_terminal() {
            return Err(SchedulingError::AlreadyTerminal(format!(
                "appointment {} is {}",
                appointment_id, appointment.status
            )));
        }
        appointment.status = AppointmentStatus::Cancelled;
        appointment.updated_at = Some(Utc::now());
        Ok(())
    }

    async fn fetch_appointment(
        &self,
        appointment_id: Uuid,
        _auth_token: &str,
    ) -> Result<Appointment, SchedulingError> {
        self.stored(appointment_id)
            .ok_or_else(|| SchedulingError::NotFound(format!("appointment {} not found", appointment_id)))
    }

    async fn list_appointments(
        &self,
        filter: &AppointmentFilter,
        _auth_token: &str,
    ) -> Result<Vec<Appointment>, SchedulingError> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .appointments
            .values()
            .filter(|a| filter.patient_id.map_or(true, |id| a.patient_id == id))
            .filter(|a| filter.provider_id.map_or(true, |id| a.provider_id == id))
            .cloned()
            .collect())
    }
}

pub fn scheduler_at(
    backend: &Arc<InMemoryBackend>,
    now: NaiveDateTime,
    settings: SchedulingSettings,
) -> SchedulingService {
    SchedulingService::new(backend.clone(), Arc::new(FixedClock(now)), settings)
}

pub fn scheduler(backend: &Arc<InMemoryBackend>) -> SchedulingService {
    scheduler_at(backend, new_year(), SchedulingSettings::default())
}
