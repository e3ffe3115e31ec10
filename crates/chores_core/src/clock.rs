//! Wall-clock access and the calendar arithmetic the jobs depend on.

use time::{Date, OffsetDateTime, UtcOffset, Weekday};

pub trait Clock: Send + Sync {
    /// Current time, expressed in the household's local offset.
    fn now(&self) -> OffsetDateTime;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc().to_offset(local_offset())
    }
}

/// Clock pinned to a single instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub OffsetDateTime);

impl Clock for FixedClock {
    fn now(&self) -> OffsetDateTime {
        self.0
    }
}

pub fn local_offset() -> UtcOffset {
    UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC)
}

pub fn is_week_boundary(date: Date) -> bool {
    date.weekday() == Weekday::Sunday
}

pub fn is_last_day_of_month(date: Date) -> bool {
    date.day() == date.month().length(date.year())
}
