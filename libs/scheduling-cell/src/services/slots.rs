// libs/scheduling-cell/src/services/slots.rs
use chrono::NaiveDate;
use tracing::{debug, warn};

use crate::models::{BookedSlotSet, CandidateSlot, ProviderSchedule, SlotTime};

/// Turns a weekly working-hours template into the bookable start times of one date.
#[derive(Debug, Clone, Copy, Default)]
pub struct SlotGeneratorService;

impl SlotGeneratorService {
    pub fn new() -> Self {
        Self
    }

    /// Full slot grid for `date`, with booked start times flagged unavailable.
    ///
    /// Returns an empty grid when the provider does not work that weekday, or
    /// when the template itself is unusable (non-positive duration, inverted
    /// window). A slot is only emitted if it fits entirely before `end`.
    pub fn candidate_slots(
        &self,
        schedule: &ProviderSchedule,
        date: NaiveDate,
        booked: &BookedSlotSet,
    ) -> Vec<CandidateSlot> {
        let hours = match schedule.hours_for(date) {
            Some(hours) if hours.is_working => hours,
            _ => {
                debug!("Provider not working on {} ({})", date, date.format("%A"));
                return Vec::new();
            }
        };

        let step = schedule.slot_duration_minutes;
        if step <= 0 {
            warn!("Ignoring schedule with non-positive slot duration {}", step);
            return Vec::new();
        }

        let end = hours.end.minutes() as i64;
        let mut current = hours.start.minutes() as i64;
        let mut slots = Vec::new();

        while current + step <= end {
            let Some(time) = SlotTime::from_minutes(current as u32) else {
                break;
            };

            slots.push(CandidateSlot {
                time,
                available: !booked.contains(&time),
            });

            current += step;
        }

        debug!(
            "Generated {} candidate slots for {} ({} booked)",
            slots.len(),
            date,
            booked.len()
        );
        slots
    }

    /// Offerable start times for `date`, ascending, booked ones excluded.
    pub fn generate_slots(
        &self,
        schedule: &ProviderSchedule,
        date: NaiveDate,
        booked: &BookedSlotSet,
    ) -> Vec<CandidateSlot> {
        self.candidate_slots(schedule, date, booked)
            .into_iter()
            .filter(|slot| slot.available)
            .collect()
    }
}
