// libs/scheduling-cell/src/models.rs
use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, NaiveTime, Timelike, Utc, Weekday};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::SchedulingError;

pub const DEFAULT_SLOT_DURATION_MINUTES: i64 = 30;

// ==============================================================================
// TIME OF DAY
// ==============================================================================

/// A time of day with minute precision, always rendered as zero-padded `HH:MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SlotTime(NaiveTime);

impl SlotTime {
    pub fn from_hm(hour: u32, minute: u32) -> Option<Self> {
        NaiveTime::from_hms_opt(hour, minute, 0).map(Self)
    }

    pub fn from_minutes(minutes_since_midnight: u32) -> Option<Self> {
        Self::from_hm(minutes_since_midnight / 60, minutes_since_midnight % 60)
    }

    pub fn minutes(&self) -> u32 {
        self.0.hour() * 60 + self.0.minute()
    }

    pub fn as_naive_time(&self) -> NaiveTime {
        self.0
    }
}

impl FromStr for SlotTime {
    type Err = SchedulingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let invalid = || {
            SchedulingError::ValidationError(format!("invalid time '{}', expected HH:MM", s))
        };

        let parsed = NaiveTime::parse_from_str(trimmed, "%H:%M:%S")
            .or_else(|_| NaiveTime::parse_from_str(trimmed, "%H:%M"))
            .map_err(|_| invalid())?;

        if parsed.second() != 0 || parsed.nanosecond() != 0 {
            return Err(invalid());
        }

        Ok(Self(parsed))
    }
}

impl fmt::Display for SlotTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%H:%M"))
    }
}

impl Serialize for SlotTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for SlotTime {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

// ==============================================================================
// PROVIDER SCHEDULE
// ==============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DayOfWeek {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl From<Weekday> for DayOfWeek {
    fn from(weekday: Weekday) -> Self {
        match weekday {
            Weekday::Mon => DayOfWeek::Monday,
            Weekday::Tue => DayOfWeek::Tuesday,
            Weekday::Wed => DayOfWeek::Wednesday,
            Weekday::Thu => DayOfWeek::Thursday,
            Weekday::Fri => DayOfWeek::Friday,
            Weekday::Sat => DayOfWeek::Saturday,
            Weekday::Sun => DayOfWeek::Sunday,
        }
    }
}

impl fmt::Display for DayOfWeek {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DayOfWeek::Monday => "monday",
            DayOfWeek::Tuesday => "tuesday",
            DayOfWeek::Wednesday => "wednesday",
            DayOfWeek::Thursday => "thursday",
            DayOfWeek::Friday => "friday",
            DayOfWeek::Saturday => "saturday",
            DayOfWeek::Sunday => "sunday",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkingHours {
    pub is_working: bool,
    pub start: SlotTime,
    pub end: SlotTime,
}

impl WorkingHours {
    pub fn working(start: SlotTime, end: SlotTime) -> Self {
        Self { is_working: true, start, end }
    }

    pub fn day_off() -> Self {
        let midnight = SlotTime(NaiveTime::default());
        Self { is_working: false, start: midnight, end: midnight }
    }
}

/// Weekly working-hours template of one provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderSchedule {
    #[serde(default)]
    pub days: BTreeMap<DayOfWeek, WorkingHours>,
    #[serde(default = "default_slot_duration")]
    pub slot_duration_minutes: i64,
}

fn default_slot_duration() -> i64 {
    DEFAULT_SLOT_DURATION_MINUTES
}

impl Default for ProviderSchedule {
    fn default() -> Self {
        Self::new(DEFAULT_SLOT_DURATION_MINUTES)
    }
}

impl ProviderSchedule {
    pub fn new(slot_duration_minutes: i64) -> Self {
        Self {
            days: BTreeMap::new(),
            slot_duration_minutes,
        }
    }

    pub fn with_day(mut self, day: DayOfWeek, hours: WorkingHours) -> Self {
        self.days.insert(day, hours);
        self
    }

    pub fn hours_for(&self, date: NaiveDate) -> Option<&WorkingHours> {
        self.days.get(&DayOfWeek::from(date.weekday()))
    }

    pub fn validate(&self) -> Result<(), SchedulingError> {
        if self.slot_duration_minutes <= 0 {
            return Err(SchedulingError::ValidationError(format!(
                "slot duration must be positive, got {}",
                self.slot_duration_minutes
            )));
        }

        for (day, hours) in &self.days {
            if hours.is_working && hours.start >= hours.end {
                return Err(SchedulingError::ValidationError(format!(
                    "{}: start {} must be before end {}",
                    day, hours.start, hours.end
                )));
            }
        }

        Ok(())
    }
}

// ==============================================================================
// BOOKED SLOTS
// ==============================================================================

/// Start times already reserved for one provider on one date.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BookedSlotSet(BTreeSet<SlotTime>);

impl BookedSlotSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, time: &SlotTime) -> bool {
        self.0.contains(time)
    }

    pub fn insert(&mut self, time: SlotTime) -> bool {
        self.0.insert(time)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SlotTime> {
        self.0.iter()
    }
}

impl FromIterator<SlotTime> for BookedSlotSet {
    fn from_iter<I: IntoIterator<Item = SlotTime>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// A booked-slot set together with what it was fetched for and when.
#[derive(Debug, Clone)]
pub struct BookedSnapshot {
    pub provider_id: Uuid,
    pub date: NaiveDate,
    pub slots: BookedSlotSet,
    pub fetched_at: DateTime<Utc>,
}

impl BookedSnapshot {
    pub fn new(provider_id: Uuid, date: NaiveDate, slots: BookedSlotSet) -> Self {
        Self {
            provider_id,
            date,
            slots,
            fetched_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateSlot {
    pub time: SlotTime,
    pub available: bool,
}

// ==============================================================================
// APPOINTMENTS
// ==============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppointmentStatus {
    Pending,
    Confirmed,
    Completed,
    Cancelled,
}

impl AppointmentStatus {
    pub const ALL: [AppointmentStatus; 4] = [
        AppointmentStatus::Pending,
        AppointmentStatus::Confirmed,
        AppointmentStatus::Completed,
        AppointmentStatus::Cancelled,
    ];

    pub fn is_terminal(&self) -> bool {
        matches!(self, AppointmentStatus::Completed | AppointmentStatus::Cancelled)
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentStatus::Pending => write!(f, "pending"),
            AppointmentStatus::Confirmed => write!(f, "confirmed"),
            AppointmentStatus::Completed => write!(f, "completed"),
            AppointmentStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AppointmentType {
    Consultation,
    #[serde(alias = "follow_up", alias = "followup")]
    FollowUp,
    #[serde(alias = "urgent")]
    Emergency,
    #[serde(alias = "home_visit")]
    HomeVisit,
    #[serde(alias = "teleconsultation", alias = "video-call")]
    Video,
}

impl AppointmentType {
    pub const ALL: [AppointmentType; 5] = [
        AppointmentType::Consultation,
        AppointmentType::FollowUp,
        AppointmentType::Emergency,
        AppointmentType::HomeVisit,
        AppointmentType::Video,
    ];
}

impl fmt::Display for AppointmentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentType::Consultation => write!(f, "consultation"),
            AppointmentType::FollowUp => write!(f, "follow-up"),
            AppointmentType::Emergency => write!(f, "emergency"),
            AppointmentType::HomeVisit => write!(f, "home-visit"),
            AppointmentType::Video => write!(f, "video"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub provider_id: Uuid,
    pub date: NaiveDate,
    pub time: SlotTime,
    #[serde(rename = "type")]
    pub appointment_type: AppointmentType,
    #[serde(default)]
    pub reason: Option<String>,
    pub status: AppointmentStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Appointment {
    /// Wall-clock start of the appointment in the clinic's local time.
    pub fn starts_at(&self) -> NaiveDateTime {
        self.date.and_time(self.time.as_naive_time())
    }

    pub fn with_status(&self, status: AppointmentStatus) -> Self {
        Self {
            status,
            updated_at: Some(Utc::now()),
            ..self.clone()
        }
    }
}

/// Payload handed to the backend to create an appointment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAppointment {
    pub patient_id: Uuid,
    pub provider_id: Uuid,
    pub date: NaiveDate,
    pub time: SlotTime,
    #[serde(rename = "type")]
    pub appointment_type: AppointmentType,
    pub reason: Option<String>,
    pub status: AppointmentStatus,
}

/// Which appointments to list. At least one side should be set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppointmentFilter {
    pub patient_id: Option<Uuid>,
    pub provider_id: Option<Uuid>,
}

// ==============================================================================
// REQUEST/RESPONSE MODELS
// ==============================================================================

/// Everything the facade needs to book one slot.
#[derive(Debug, Clone)]
pub struct BookingRequest {
    pub patient_id: Uuid,
    pub provider_id: Uuid,
    pub date: NaiveDate,
    pub time: SlotTime,
    pub appointment_type: AppointmentType,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookAppointmentRequest {
    pub provider_id: Uuid,
    pub date: NaiveDate,
    pub time: SlotTime,
    #[serde(rename = "type")]
    pub appointment_type: AppointmentType,
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitionRequest {
    pub status: AppointmentStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotQuery {
    pub date: NaiveDate,
    #[serde(default)]
    pub include_unavailable: bool,
}
