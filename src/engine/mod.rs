mod availability;
mod error;
mod lifecycle;
mod queries;

pub use availability::{available_slots, slot_grid};
pub use error::ScheduleError;
pub use lifecycle::BookingRequest;

use std::sync::Arc;
use std::time::Instant;

use chrono::{NaiveDate, NaiveTime};
use dashmap::DashMap;

use crate::model::BookingChange;
use crate::notify::Notifier;
use crate::policy::BookingPolicy;
use crate::store::{RecordStore, StoreError};

struct CachedSlots {
    computed_at: Instant,
    slots: Vec<NaiveTime>,
}

/// The scheduling core: availability queries plus the booking lifecycle.
///
/// Holds no booking state of its own — every operation reads and writes
/// through the injected store, and the store's (date, time) uniqueness
/// guarantee is what ultimately prevents double-booking. The notifier is
/// informed after successful mutations, fire-and-forget.
pub struct Scheduler {
    store: Arc<dyn RecordStore>,
    notify: Arc<dyn Notifier>,
    policy: BookingPolicy,
    /// Per-date slot cache. The store reads are the expensive part, not the
    /// slot math; entries live for `policy.cache_ttl` and are dropped on any
    /// mutation touching the date.
    slot_cache: DashMap<NaiveDate, CachedSlots>,
}

impl Scheduler {
    pub fn new(store: Arc<dyn RecordStore>, notify: Arc<dyn Notifier>, policy: BookingPolicy) -> Self {
        Self {
            store,
            notify,
            policy,
            slot_cache: DashMap::new(),
        }
    }

    pub fn policy(&self) -> &BookingPolicy {
        &self.policy
    }

    pub(super) fn store(&self) -> &Arc<dyn RecordStore> {
        &self.store
    }

    pub(super) fn send(&self, change: BookingChange) {
        self.notify.notify(&change);
    }

    pub(super) fn invalidate(&self, date: NaiveDate) {
        self.slot_cache.remove(&date);
    }

    pub(super) fn cached_slots(&self, date: NaiveDate) -> Option<Vec<NaiveTime>> {
        if self.policy.cache_ttl.is_zero() {
            return None;
        }
        let entry = self.slot_cache.get(&date)?;
        if entry.computed_at.elapsed() <= self.policy.cache_ttl {
            Some(entry.slots.clone())
        } else {
            None
        }
    }

    pub(super) fn cache_slots(&self, date: NaiveDate, slots: &[NaiveTime]) {
        if self.policy.cache_ttl.is_zero() {
            return;
        }
        self.slot_cache.insert(
            date,
            CachedSlots {
                computed_at: Instant::now(),
                slots: slots.to_vec(),
            },
        );
    }

    /// Store faults become the caller-facing "service unavailable" error.
    pub(super) fn store_fault(e: StoreError) -> ScheduleError {
        ScheduleError::Unavailable(e.to_string())
    }
}
