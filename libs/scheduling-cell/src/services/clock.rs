use chrono::{Duration, NaiveDateTime, Utc};

/// Source of "now" in the clinic's local wall-clock time.
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;
}

/// UTC shifted by the clinic's configured offset.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock {
    utc_offset_minutes: i32,
}

impl SystemClock {
    pub fn new(utc_offset_minutes: i32) -> Self {
        Self { utc_offset_minutes }
    }
}

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Utc::now().naive_utc() + Duration::minutes(self.utc_offset_minutes as i64)
    }
}

/// A clock frozen at one instant. Used by tests and replays.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDateTime);

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.0
    }
}
