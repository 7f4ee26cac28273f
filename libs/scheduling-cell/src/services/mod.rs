pub mod backend;
pub mod clock;
pub mod conflict;
pub mod lifecycle;
pub mod scheduling;
pub mod slots;

pub use backend::{RestSchedulingBackend, SchedulingBackend};
pub use clock::{Clock, FixedClock, SystemClock};
pub use conflict::BookingConflictGuard;
pub use lifecycle::{AppointmentLifecycleService, CancellationPolicy};
pub use scheduling::{SchedulingService, SchedulingSettings};
pub use slots::SlotGeneratorService;
