use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::info;
use ulid::Ulid;

use crate::engine::Scheduler;

const SCAN_INTERVAL: Duration = Duration::from_secs(60);

/// Background task that emits a due-soon reminder once per confirmed
/// booking entering the lead window. Purely auxiliary: dedup state lives in
/// memory and does not survive a restart, and the scheduling core's
/// correctness never depends on a reminder being delivered.
pub async fn run_reminders(scheduler: Arc<Scheduler>) {
    let mut interval = tokio::time::interval(SCAN_INTERVAL);
    // Booking id → appointment instant, kept so each booking fires once and
    // the map can be pruned once the appointment has passed.
    let mut sent: HashMap<Ulid, DateTime<Utc>> = HashMap::new();
    loop {
        interval.tick().await;
        let now = Utc::now();
        scan_once(&scheduler, now, &mut sent).await;
    }
}

/// One reminder sweep. Split out so tests can drive it with a fixed clock.
pub async fn scan_once(
    scheduler: &Scheduler,
    now: DateTime<Utc>,
    sent: &mut HashMap<Ulid, DateTime<Utc>>,
) {
    match scheduler.due_reminders(now).await {
        Ok(due) => {
            for booking in due {
                let at = scheduler.policy().instant(booking.date, booking.time);
                if sent.insert(booking.id, at).is_none() {
                    scheduler.emit_reminder(&booking);
                    info!(id = %booking.id, %at, "reminder sent");
                }
            }
        }
        Err(e) => {
            // Store hiccup — skip this sweep, the next one retries.
            tracing::debug!("reminder scan skipped: {e}");
        }
    }
    sent.retain(|_, at| *at > now);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::*;
    use crate::notify::NotifyHub;
    use crate::phone;
    use crate::policy::BookingPolicy;
    use crate::store::{MemoryStore, RecordStore};
    use chrono::{NaiveDate, NaiveTime};

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, day).unwrap()
    }

    async fn seed_booking(store: &MemoryStore, date: NaiveDate, time: NaiveTime) -> Ulid {
        let digits = "79001234567";
        store
            .insert_booking(NewBooking {
                client: Client {
                    name: "Anna".into(),
                    phone: digits.into(),
                    phone_hash: phone::hash(digits),
                    email: None,
                    telegram: None,
                },
                date,
                time,
                status: BookingStatus::Confirmed,
                notes: None,
                product: None,
                chat_id: Some(42),
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn reminder_fires_once_per_booking() {
        let store = Arc::new(MemoryStore::new());
        let hub = Arc::new(NotifyHub::new());
        let mut rx = hub.subscribe();
        let scheduler = Scheduler::new(store.clone(), hub.clone(), BookingPolicy::default());

        let id = seed_booking(&store, d(10), t(12, 0)).await;

        // Two hours before the appointment — inside the 24 h lead window.
        let now = scheduler.policy().instant(d(10), t(10, 0));
        let mut sent = HashMap::new();

        scan_once(&scheduler, now, &mut sent).await;
        scan_once(&scheduler, now, &mut sent).await;

        let change = rx.recv().await.unwrap();
        assert!(matches!(
            change,
            BookingChange::ReminderDue { id: got, chat_id: Some(42), .. } if got == id
        ));
        // Second sweep must not have produced another one.
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn pending_and_past_bookings_not_reminded() {
        let store = Arc::new(MemoryStore::new());
        let hub = Arc::new(NotifyHub::new());
        let mut rx = hub.subscribe();
        let scheduler = Scheduler::new(store.clone(), hub.clone(), BookingPolicy::default());

        // Unpaid booking inside the window: no reminder.
        let unpaid = seed_booking(&store, d(10), t(12, 0)).await;
        store
            .update_booking_status(unpaid, BookingStatus::PendingPayment, None)
            .await
            .unwrap();
        // Appointment already started: no reminder.
        seed_booking(&store, d(10), t(9, 0)).await;

        let now = scheduler.policy().instant(d(10), t(10, 0));
        let mut sent = HashMap::new();
        scan_once(&scheduler, now, &mut sent).await;

        assert!(rx.try_recv().is_err());
        assert!(sent.is_empty());
    }

    #[tokio::test]
    async fn sent_map_pruned_after_appointment() {
        let store = Arc::new(MemoryStore::new());
        let hub = Arc::new(NotifyHub::new());
        let scheduler = Scheduler::new(store.clone(), hub.clone(), BookingPolicy::default());

        seed_booking(&store, d(10), t(12, 0)).await;

        let mut sent = HashMap::new();
        let before = scheduler.policy().instant(d(10), t(10, 0));
        scan_once(&scheduler, before, &mut sent).await;
        assert_eq!(sent.len(), 1);

        let after = scheduler.policy().instant(d(10), t(13, 0));
        scan_once(&scheduler, after, &mut sent).await;
        assert!(sent.is_empty());
    }
}
