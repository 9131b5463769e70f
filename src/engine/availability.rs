use chrono::{DateTime, NaiveDate, NaiveTime, Timelike, Utc};

use crate::model::{DayBlocks, HoursConfig};
use crate::policy::BookingPolicy;

// ── Availability Algorithm ───────────────────────────────────────

/// Candidate session start times for one working day, back-to-back at
/// `session_minutes` spacing. The last start leaves room for a full session
/// before `work_end`. Degenerate hours yield nothing — never a loop.
pub fn slot_grid(hours: &HoursConfig) -> Vec<NaiveTime> {
    if hours.is_degenerate() {
        return Vec::new();
    }
    let step = hours.session_minutes * 60;
    let end = hours.work_end.num_seconds_from_midnight();
    let mut out = Vec::new();
    let mut cursor = hours.work_start.num_seconds_from_midnight();
    while cursor + step <= end {
        if let Some(t) = NaiveTime::from_num_seconds_from_midnight_opt(cursor, 0) {
            out.push(t);
        }
        cursor += step;
    }
    out
}

/// Bookable start times for `date`.
///
/// A candidate survives when it is not booked, not blocked, and far enough
/// ahead of `now` to satisfy the advance-notice window. A day-level block
/// empties the whole date. Output is ascending and deterministic for fixed
/// inputs plus `now`; past dates fall entirely to the notice check.
pub fn available_slots(
    date: NaiveDate,
    hours: &HoursConfig,
    booked: &[NaiveTime],
    blocks: &DayBlocks,
    now: DateTime<Utc>,
    policy: &BookingPolicy,
) -> Vec<NaiveTime> {
    if blocks.day_blocked {
        return Vec::new();
    }
    slot_grid(hours)
        .into_iter()
        .filter(|t| !booked.contains(t))
        .filter(|t| !blocks.times.contains(t))
        .filter(|t| policy.time_until(date, *t, now) >= policy.min_advance_notice)
        .collect()
}
