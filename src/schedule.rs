use std::fmt::{self, Display};
use std::time::Duration;

use chrono::{DateTime, Datelike, FixedOffset, Timelike, Utc};

/// All caller-supplied timestamps are normalized to this zone before the
/// calendar fields are extracted (the product's audience zone, UTC+05:30).
const CANONICAL_OFFSET_SECS: i32 = 5 * 3600 + 30 * 60;

/// The five-field schedule descriptor consumed by cron-style timer
/// facilities: minute, hour, day-of-month, month, day-of-week (0 = Sunday).
///
/// Cron evaluates a populated day-of-month and day-of-week as a logical OR,
/// so a pattern built from a single instant can fire on an unintended
/// earlier weekday match. The pattern is therefore kept for logging and
/// inspection only; arming always uses the absolute instant via
/// [`fire_delay`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct RecurrencePattern {
    pub minute: u32,
    pub hour: u32,
    pub day_of_month: u32,
    pub month: u32,
    pub day_of_week: u32,
}

impl Display for RecurrencePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {} {}",
            self.minute, self.hour, self.day_of_month, self.month, self.day_of_week
        )
    }
}

fn canonical_offset() -> FixedOffset {
    FixedOffset::east_opt(CANONICAL_OFFSET_SECS).expect("offset is within +/-24h")
}

/// Extract the recurrence fields for `at`, as seen in the canonical zone.
pub fn translate(at: DateTime<Utc>) -> RecurrencePattern {
    let local = at.with_timezone(&canonical_offset());

    RecurrencePattern {
        minute: local.minute(),
        hour: local.hour(),
        day_of_month: local.day(),
        month: local.month(),
        day_of_week: local.weekday().num_days_from_sunday(),
    }
}

/// How long until `at`, saturating to zero. An instant already in the past
/// fires immediately, matching the cron primitive's behavior when a pattern
/// trivially matches "now".
pub fn fire_delay(at: DateTime<Utc>, now: DateTime<Utc>) -> Duration {
    (at - now).to_std().unwrap_or(Duration::ZERO)
}
