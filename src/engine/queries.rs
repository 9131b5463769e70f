use chrono::{DateTime, NaiveDate, NaiveTime, Utc};

use crate::model::Booking;
use crate::phone;

use super::availability::available_slots;
use super::{ScheduleError, Scheduler};

impl Scheduler {
    /// Bookable start times for `date`, cached for a short TTL.
    ///
    /// Missing business-hours configuration degrades to an empty list —
    /// "no slots" is always a safe answer to render. A store fault is a
    /// distinguishable `Unavailable` error instead, so callers can tell the
    /// two apart.
    pub async fn available_slots(
        &self,
        date: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<Vec<NaiveTime>, ScheduleError> {
        if let Some(hit) = self.cached_slots(date) {
            metrics::counter!(
                crate::observability::AVAILABILITY_QUERIES_TOTAL,
                "source" => "cache"
            )
            .increment(1);
            return Ok(hit);
        }

        let started = std::time::Instant::now();
        let slots = self.compute_slots(date, now).await?;
        metrics::histogram!(crate::observability::AVAILABILITY_DURATION_SECONDS)
            .record(started.elapsed().as_secs_f64());
        metrics::counter!(
            crate::observability::AVAILABILITY_QUERIES_TOTAL,
            "source" => "store"
        )
        .increment(1);

        self.cache_slots(date, &slots);
        Ok(slots)
    }

    /// Uncached availability straight from the store. The lifecycle manager
    /// re-validates against this at write time to narrow the race window.
    pub(super) async fn compute_slots(
        &self,
        date: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<Vec<NaiveTime>, ScheduleError> {
        let hours = match self.store().read_hours().await.map_err(Self::store_fault)? {
            Some(hours) => hours,
            None => {
                tracing::warn!(%date, "business hours not configured, no slots offered");
                return Ok(Vec::new());
            }
        };
        let blocks = self
            .store()
            .read_blocks(date)
            .await
            .map_err(Self::store_fault)?;
        let booked: Vec<NaiveTime> = self
            .store()
            .read_bookings(date)
            .await
            .map_err(Self::store_fault)?
            .iter()
            .map(|b| b.time)
            .collect();

        Ok(available_slots(
            date,
            &hours,
            &booked,
            &blocks,
            now,
            self.policy(),
        ))
    }

    /// A client's booking history (any status), newest first. Lookup is by
    /// phone hash — raw digits never reach the store query.
    pub async fn client_bookings(&self, raw_phone: &str) -> Result<Vec<Booking>, ScheduleError> {
        let digits = phone::normalize(raw_phone).ok_or(ScheduleError::InvalidPhone)?;
        self.store()
            .client_bookings(&phone::hash(&digits))
            .await
            .map_err(Self::store_fault)
    }

    /// Confirmed bookings whose appointment starts within the reminder lead
    /// window. Consumed by the reminder dispatcher.
    pub async fn due_reminders(&self, now: DateTime<Utc>) -> Result<Vec<Booking>, ScheduleError> {
        let policy = self.policy();
        let today = policy.today(now);
        let horizon_days = policy.reminder_lead.num_days() + 1;

        let mut due = Vec::new();
        for offset in 0..=horizon_days {
            let date = today + chrono::Duration::days(offset);
            let day = self
                .store()
                .read_bookings(date)
                .await
                .map_err(Self::store_fault)?;
            for booking in day {
                if booking.status != crate::model::BookingStatus::Confirmed {
                    continue;
                }
                let until = policy.time_until(booking.date, booking.time, now);
                if until > chrono::Duration::zero() && until <= policy.reminder_lead {
                    due.push(booking);
                }
            }
        }
        Ok(due)
    }
}
