use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio::sync::RwLock;
use ulid::Ulid;

use crate::model::*;

/// Failures surfaced by a record store implementation.
#[derive(Debug)]
pub enum StoreError {
    /// The (date, time) slot is already claimed by a non-cancelled booking.
    SlotTaken,
    NotFound,
    /// Backend unreachable or otherwise unable to answer.
    Unavailable(String),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::SlotTaken => write!(f, "slot already taken"),
            StoreError::NotFound => write!(f, "record not found"),
            StoreError::Unavailable(e) => write!(f, "store unavailable: {e}"),
        }
    }
}

impl std::error::Error for StoreError {}

/// Transactional record store the scheduling core reads and writes through.
///
/// Implementations must claim the `(date, time)` pair atomically on insert:
/// among non-cancelled bookings at most one may hold a given slot, and the
/// engine treats that guarantee as authoritative under concurrency.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn read_hours(&self) -> Result<Option<HoursConfig>, StoreError>;

    /// Non-cancelled bookings for a date, ascending by time.
    async fn read_bookings(&self, date: NaiveDate) -> Result<Vec<Booking>, StoreError>;

    async fn read_blocks(&self, date: NaiveDate) -> Result<DayBlocks, StoreError>;

    async fn read_booking(&self, id: Ulid) -> Result<Option<Booking>, StoreError>;

    /// Insert a booking, claiming its slot. `StoreError::SlotTaken` is the
    /// expected outcome when a concurrent insert won the slot first.
    async fn insert_booking(&self, new: NewBooking) -> Result<Ulid, StoreError>;

    /// Transition a booking's status. `paid_at`, when given, records the
    /// payment timestamp. Cancelling releases the slot claim.
    async fn update_booking_status(
        &self,
        id: Ulid,
        status: BookingStatus,
        paid_at: Option<DateTime<Utc>>,
    ) -> Result<(), StoreError>;

    /// All bookings owned by a client (any status), newest first.
    async fn client_bookings(&self, phone_hash: &str) -> Result<Vec<Booking>, StoreError>;
}

// ── In-memory reference implementation ───────────────────────────

/// DashMap-backed store used by tests, benches and embedders that bring
/// their own persistence. The slot index entry is the atomic claim point.
pub struct MemoryStore {
    hours: RwLock<Option<HoursConfig>>,
    bookings: DashMap<Ulid, Booking>,
    /// Date → booking ids, including cancelled ones (readers filter).
    by_date: DashMap<NaiveDate, Vec<Ulid>>,
    /// Active claims: (date, time) → booking id.
    slot_index: DashMap<(NaiveDate, NaiveTime), Ulid>,
    blocks: DashMap<Ulid, Block>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            hours: RwLock::new(None),
            bookings: DashMap::new(),
            by_date: DashMap::new(),
            slot_index: DashMap::new(),
            blocks: DashMap::new(),
        }
    }

    // ── Admin mutations (outside the scheduling core's trait) ────

    pub async fn put_hours(&self, hours: HoursConfig) {
        *self.hours.write().await = Some(hours);
    }

    pub fn add_block(
        &self,
        date: NaiveDate,
        time: Option<NaiveTime>,
        reason: Option<String>,
    ) -> Ulid {
        let id = Ulid::new();
        self.blocks.insert(id, Block { id, date, time, reason });
        id
    }

    pub fn remove_block(&self, id: Ulid) -> Option<Block> {
        self.blocks.remove(&id).map(|(_, b)| b)
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn read_hours(&self) -> Result<Option<HoursConfig>, StoreError> {
        Ok(*self.hours.read().await)
    }

    async fn read_bookings(&self, date: NaiveDate) -> Result<Vec<Booking>, StoreError> {
        let ids = self
            .by_date
            .get(&date)
            .map(|e| e.value().clone())
            .unwrap_or_default();
        let mut out: Vec<Booking> = ids
            .iter()
            .filter_map(|id| self.bookings.get(id).map(|b| b.value().clone()))
            .filter(|b| b.status.occupies_slot())
            .collect();
        out.sort_by_key(|b| b.time);
        Ok(out)
    }

    async fn read_blocks(&self, date: NaiveDate) -> Result<DayBlocks, StoreError> {
        let mut out = DayBlocks::default();
        for entry in self.blocks.iter() {
            let block = entry.value();
            if block.date != date {
                continue;
            }
            match block.time {
                None => out.day_blocked = true,
                Some(t) => out.times.push(t),
            }
        }
        out.times.sort();
        Ok(out)
    }

    async fn read_booking(&self, id: Ulid) -> Result<Option<Booking>, StoreError> {
        Ok(self.bookings.get(&id).map(|b| b.value().clone()))
    }

    async fn insert_booking(&self, new: NewBooking) -> Result<Ulid, StoreError> {
        let id = Ulid::new();
        match self.slot_index.entry((new.date, new.time)) {
            Entry::Occupied(_) => return Err(StoreError::SlotTaken),
            Entry::Vacant(v) => {
                v.insert(id);
            }
        }
        let booking = Booking {
            id,
            client: new.client,
            date: new.date,
            time: new.time,
            status: new.status,
            notes: new.notes,
            product: new.product,
            chat_id: new.chat_id,
            created_at: Utc::now(),
            paid_at: None,
        };
        self.by_date.entry(new.date).or_default().push(id);
        self.bookings.insert(id, booking);
        Ok(id)
    }

    async fn update_booking_status(
        &self,
        id: Ulid,
        status: BookingStatus,
        paid_at: Option<DateTime<Utc>>,
    ) -> Result<(), StoreError> {
        let mut booking = self.bookings.get_mut(&id).ok_or(StoreError::NotFound)?;
        let was_active = booking.status.occupies_slot();
        let now_active = status.occupies_slot();

        if was_active && !now_active {
            // Free the slot only if this booking still holds the claim.
            self.slot_index
                .remove_if(&(booking.date, booking.time), |_, holder| *holder == id);
        } else if !was_active && now_active {
            match self.slot_index.entry((booking.date, booking.time)) {
                Entry::Occupied(_) => return Err(StoreError::SlotTaken),
                Entry::Vacant(v) => {
                    v.insert(id);
                }
            }
        }

        booking.status = status;
        if paid_at.is_some() {
            booking.paid_at = paid_at;
        }
        Ok(())
    }

    async fn client_bookings(&self, phone_hash: &str) -> Result<Vec<Booking>, StoreError> {
        // Linear scan; the reference store keeps no client index.
        let mut out: Vec<Booking> = self
            .bookings
            .iter()
            .filter(|e| e.value().client.phone_hash == phone_hash)
            .map(|e| e.value().clone())
            .collect();
        out.sort_by_key(|b| std::cmp::Reverse((b.date, b.time)));
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::phone;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, day).unwrap()
    }

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn client(digits: &str) -> Client {
        Client {
            name: "Anna".into(),
            phone: digits.into(),
            phone_hash: phone::hash(digits),
            email: None,
            telegram: None,
        }
    }

    fn new_booking(date: NaiveDate, time: NaiveTime, status: BookingStatus) -> NewBooking {
        NewBooking {
            client: client("79001234567"),
            date,
            time,
            status,
            notes: None,
            product: None,
            chat_id: None,
        }
    }

    #[tokio::test]
    async fn insert_claims_slot() {
        let store = MemoryStore::new();
        let first = store
            .insert_booking(new_booking(d(10), t(11, 0), BookingStatus::PendingPayment))
            .await;
        assert!(first.is_ok());

        let second = store
            .insert_booking(new_booking(d(10), t(11, 0), BookingStatus::PendingPayment))
            .await;
        assert!(matches!(second, Err(StoreError::SlotTaken)));

        // Different time on the same date is free.
        let third = store
            .insert_booking(new_booking(d(10), t(12, 0), BookingStatus::PendingPayment))
            .await;
        assert!(third.is_ok());
    }

    #[tokio::test]
    async fn concurrent_inserts_one_winner() {
        let store = std::sync::Arc::new(MemoryStore::new());
        let a = store.insert_booking(new_booking(d(10), t(11, 0), BookingStatus::Confirmed));
        let b = store.insert_booking(new_booking(d(10), t(11, 0), BookingStatus::Confirmed));
        let (ra, rb) = tokio::join!(a, b);
        let successes = [&ra, &rb].iter().filter(|r| r.is_ok()).count();
        assert_eq!(successes, 1);
        assert!(
            matches!(ra, Err(StoreError::SlotTaken)) || matches!(rb, Err(StoreError::SlotTaken))
        );
    }

    #[tokio::test]
    async fn cancel_releases_slot() {
        let store = MemoryStore::new();
        let id = store
            .insert_booking(new_booking(d(10), t(11, 0), BookingStatus::Confirmed))
            .await
            .unwrap();

        store
            .update_booking_status(id, BookingStatus::Cancelled, None)
            .await
            .unwrap();

        // Slot can be claimed again.
        let again = store
            .insert_booking(new_booking(d(10), t(11, 0), BookingStatus::PendingPayment))
            .await;
        assert!(again.is_ok());

        // Cancelled booking no longer shows up in date reads.
        let active = store.read_bookings(d(10)).await.unwrap();
        assert_eq!(active.len(), 1);
        assert_ne!(active[0].id, id);
    }

    #[tokio::test]
    async fn read_bookings_sorted_and_filtered() {
        let store = MemoryStore::new();
        store
            .insert_booking(new_booking(d(10), t(15, 0), BookingStatus::Confirmed))
            .await
            .unwrap();
        store
            .insert_booking(new_booking(d(10), t(9, 0), BookingStatus::PendingPayment))
            .await
            .unwrap();
        store
            .insert_booking(new_booking(d(11), t(10, 0), BookingStatus::Confirmed))
            .await
            .unwrap();

        let day = store.read_bookings(d(10)).await.unwrap();
        assert_eq!(day.len(), 2);
        assert_eq!(day[0].time, t(9, 0));
        assert_eq!(day[1].time, t(15, 0));
    }

    #[tokio::test]
    async fn blocks_by_date() {
        let store = MemoryStore::new();
        store.add_block(d(10), Some(t(12, 0)), Some("lunch".into()));
        let whole_day = store.add_block(d(11), None, None);

        let b10 = store.read_blocks(d(10)).await.unwrap();
        assert!(!b10.day_blocked);
        assert_eq!(b10.times, vec![t(12, 0)]);

        let b11 = store.read_blocks(d(11)).await.unwrap();
        assert!(b11.day_blocked);

        store.remove_block(whole_day);
        let b11 = store.read_blocks(d(11)).await.unwrap();
        assert!(!b11.day_blocked);
    }

    #[tokio::test]
    async fn paid_at_recorded_once() {
        let store = MemoryStore::new();
        let id = store
            .insert_booking(new_booking(d(10), t(11, 0), BookingStatus::PendingPayment))
            .await
            .unwrap();

        let ts = Utc::now();
        store
            .update_booking_status(id, BookingStatus::Confirmed, Some(ts))
            .await
            .unwrap();
        let b = store.read_booking(id).await.unwrap().unwrap();
        assert_eq!(b.status, BookingStatus::Confirmed);
        assert_eq!(b.paid_at, Some(ts));

        // Later transitions without a timestamp keep it.
        store
            .update_booking_status(id, BookingStatus::Completed, None)
            .await
            .unwrap();
        let b = store.read_booking(id).await.unwrap().unwrap();
        assert_eq!(b.paid_at, Some(ts));
    }

    #[tokio::test]
    async fn client_bookings_newest_first() {
        let store = MemoryStore::new();
        store
            .insert_booking(new_booking(d(10), t(11, 0), BookingStatus::Confirmed))
            .await
            .unwrap();
        let cancelled = store
            .insert_booking(new_booking(d(12), t(9, 0), BookingStatus::Confirmed))
            .await
            .unwrap();
        store
            .update_booking_status(cancelled, BookingStatus::Cancelled, None)
            .await
            .unwrap();

        let hash = phone::hash("79001234567");
        let mine = store.client_bookings(&hash).await.unwrap();
        assert_eq!(mine.len(), 2); // history includes cancelled
        assert_eq!(mine[0].date, d(12));
        assert_eq!(mine[1].date, d(10));

        let nobody = store.client_bookings(&phone::hash("70000000000")).await.unwrap();
        assert!(nobody.is_empty());
    }

    #[tokio::test]
    async fn update_missing_booking_not_found() {
        let store = MemoryStore::new();
        let result = store
            .update_booking_status(Ulid::new(), BookingStatus::Cancelled, None)
            .await;
        assert!(matches!(result, Err(StoreError::NotFound)));
    }
}
