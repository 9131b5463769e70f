use chrono::{Duration, NaiveDate, NaiveTime};
use ulid::Ulid;

use crate::model::BookingStatus;

#[derive(Debug)]
pub enum ScheduleError {
    NotFound(Ulid),
    /// A concurrent booker claimed the slot first. Expected under load —
    /// the caller should re-fetch availability and offer a re-selection.
    SlotTaken {
        date: NaiveDate,
        time: NaiveTime,
    },
    /// The requested time is not among the currently bookable slots
    /// (blocked, outside business hours, or already gone).
    SlotUnavailable {
        date: NaiveDate,
        time: NaiveTime,
    },
    TooSoonToBook {
        min_notice: Duration,
    },
    TooLateToCancel {
        min_notice: Duration,
    },
    OutsideBookingWindow {
        max_days_ahead: i64,
    },
    InvalidPhone,
    InvalidInitialStatus(BookingStatus),
    InvalidTransition {
        from: BookingStatus,
        to: BookingStatus,
    },
    /// Store connectivity fault — distinct from "no slots available".
    Unavailable(String),
}

impl std::fmt::Display for ScheduleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScheduleError::NotFound(id) => write!(f, "booking not found: {id}"),
            ScheduleError::SlotTaken { date, time } => {
                write!(f, "slot {date} {time} was just taken")
            }
            ScheduleError::SlotUnavailable { date, time } => {
                write!(f, "slot {date} {time} is not available")
            }
            ScheduleError::TooSoonToBook { min_notice } => {
                write!(
                    f,
                    "bookings require at least {} minutes notice",
                    min_notice.num_minutes()
                )
            }
            ScheduleError::TooLateToCancel { min_notice } => {
                write!(
                    f,
                    "cancellations require at least {} minutes notice",
                    min_notice.num_minutes()
                )
            }
            ScheduleError::OutsideBookingWindow { max_days_ahead } => {
                write!(f, "date must be within {max_days_ahead} days from today")
            }
            ScheduleError::InvalidPhone => write!(f, "phone number is not valid"),
            ScheduleError::InvalidInitialStatus(status) => {
                write!(f, "cannot create a booking as {}", status.as_str())
            }
            ScheduleError::InvalidTransition { from, to } => {
                write!(f, "no transition from {} to {}", from.as_str(), to.as_str())
            }
            ScheduleError::Unavailable(e) => write!(f, "service unavailable: {e}"),
        }
    }
}

impl std::error::Error for ScheduleError {}
