use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

// ── Business hours ───────────────────────────────────────────────

/// Working window and session length for the provider. Singleton row in the
/// record store, mutated only by an administrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HoursConfig {
    pub work_start: NaiveTime,
    pub work_end: NaiveTime,
    /// Session length in minutes. Must be > 0 for any slot to exist.
    pub session_minutes: u32,
    /// Shown in the admin console only — the slot generator places sessions
    /// back-to-back and never inserts this as a gap.
    pub break_minutes: u32,
}

impl HoursConfig {
    /// A configuration that can never yield slots for any date.
    pub fn is_degenerate(&self) -> bool {
        self.session_minutes == 0 || self.work_end <= self.work_start
    }
}

// ── Booking ──────────────────────────────────────────────────────

/// Booking lifecycle states. `Cancelled` and `Completed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    PendingPayment,
    Confirmed,
    Completed,
    Cancelled,
}

impl BookingStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, BookingStatus::Completed | BookingStatus::Cancelled)
    }

    /// Every non-cancelled booking holds its (date, time) slot.
    pub fn occupies_slot(&self) -> bool {
        !matches!(self, BookingStatus::Cancelled)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::PendingPayment => "pending_payment",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Completed => "completed",
            BookingStatus::Cancelled => "cancelled",
        }
    }
}

/// Client identity attached to a booking. The phone number is the natural
/// key; `phone` is normalized to digits and `phone_hash` is the one-way
/// lookup key (see [`crate::phone`]).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Client {
    pub name: String,
    pub phone: String,
    pub phone_hash: String,
    pub email: Option<String>,
    pub telegram: Option<String>,
}

/// Pricing metadata copied onto a booking. Never consulted by scheduling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub title: String,
    /// Price in minor currency units.
    pub amount_minor: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Booking {
    pub id: Ulid,
    pub client: Client,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub status: BookingStatus,
    pub notes: Option<String>,
    pub product: Option<Product>,
    /// External notification channel (e.g. chat id) for this client.
    pub chat_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub paid_at: Option<DateTime<Utc>>,
}

/// Insert payload — `id`, `created_at` and `paid_at` are assigned by the
/// store.
#[derive(Debug, Clone)]
pub struct NewBooking {
    pub client: Client,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub status: BookingStatus,
    pub notes: Option<String>,
    pub product: Option<Product>,
    pub chat_id: Option<i64>,
}

// ── Blocks ───────────────────────────────────────────────────────

/// Administrator-imposed exclusion. `time == None` blocks the whole day;
/// otherwise exactly that slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub id: Ulid,
    pub date: NaiveDate,
    pub time: Option<NaiveTime>,
    pub reason: Option<String>,
}

/// Per-date block view consumed by the availability calculator.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DayBlocks {
    pub day_blocked: bool,
    pub times: Vec<NaiveTime>,
}

// ── Actors ───────────────────────────────────────────────────────

/// Who is requesting a lifecycle transition. Clients identify themselves by
/// phone; admins bypass ownership and cancel-notice checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Actor {
    Admin,
    Client { phone: String },
}

impl Actor {
    pub fn is_admin(&self) -> bool {
        matches!(self, Actor::Admin)
    }
}

// ── Change feed ──────────────────────────────────────────────────

/// Emitted to the notifier after every successful mutation. Best-effort:
/// delivery failures never affect the booking outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BookingChange {
    Created {
        id: Ulid,
        date: NaiveDate,
        time: NaiveTime,
        status: BookingStatus,
    },
    Paid {
        id: Ulid,
    },
    Cancelled {
        id: Ulid,
        date: NaiveDate,
        time: NaiveTime,
    },
    Completed {
        id: Ulid,
    },
    ReminderDue {
        id: Ulid,
        date: NaiveDate,
        time: NaiveTime,
        chat_id: Option<i64>,
    },
}

impl BookingChange {
    pub fn kind(&self) -> &'static str {
        match self {
            BookingChange::Created { .. } => "created",
            BookingChange::Paid { .. } => "paid",
            BookingChange::Cancelled { .. } => "cancelled",
            BookingChange::Completed { .. } => "completed",
            BookingChange::ReminderDue { .. } => "reminder_due",
        }
    }

    /// JSON payload handed to external delivery channels.
    pub fn payload(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}
