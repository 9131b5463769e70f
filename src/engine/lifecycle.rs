use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use ulid::Ulid;

use crate::model::*;
use crate::phone;
use crate::store::StoreError;

use super::{ScheduleError, Scheduler};

/// Everything a caller supplies to create a booking. The phone arrives raw;
/// the engine normalizes and hashes it.
#[derive(Debug, Clone)]
pub struct BookingRequest {
    pub name: String,
    pub phone: String,
    pub email: Option<String>,
    pub telegram: Option<String>,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub notes: Option<String>,
    pub product: Option<Product>,
    pub chat_id: Option<i64>,
}

impl Scheduler {
    /// Create a booking in `initial` status: `PendingPayment` for the
    /// self-service flow, `Confirmed` for trusted admin-direct booking.
    ///
    /// Availability is re-validated against the store at write time rather
    /// than trusting the caller's earlier slot listing; the store's
    /// uniqueness constraint is still the final arbiter, and losing that
    /// race surfaces as `SlotTaken` — an ordinary outcome, not a fault.
    pub async fn create_booking(
        &self,
        req: BookingRequest,
        initial: BookingStatus,
        now: DateTime<Utc>,
    ) -> Result<Ulid, ScheduleError> {
        if !matches!(
            initial,
            BookingStatus::PendingPayment | BookingStatus::Confirmed
        ) {
            return Err(ScheduleError::InvalidInitialStatus(initial));
        }
        let digits = phone::normalize(&req.phone).ok_or(ScheduleError::InvalidPhone)?;

        let policy = self.policy();
        let days_ahead = (req.date - policy.today(now)).num_days();
        if days_ahead < 0 || days_ahead > policy.max_days_ahead {
            return Err(ScheduleError::OutsideBookingWindow {
                max_days_ahead: policy.max_days_ahead,
            });
        }

        // Timing first, so a too-close slot reports the notice threshold
        // instead of a generic unavailability.
        if policy.time_until(req.date, req.time, now) < policy.min_advance_notice {
            return Err(ScheduleError::TooSoonToBook {
                min_notice: policy.min_advance_notice,
            });
        }

        let open = self.compute_slots(req.date, now).await?;
        if !open.contains(&req.time) {
            return Err(ScheduleError::SlotUnavailable {
                date: req.date,
                time: req.time,
            });
        }

        let client = Client {
            name: req.name,
            phone_hash: phone::hash(&digits),
            phone: digits,
            email: req.email,
            telegram: req.telegram,
        };
        let new = NewBooking {
            client,
            date: req.date,
            time: req.time,
            status: initial,
            notes: req.notes,
            product: req.product,
            chat_id: req.chat_id,
        };

        let id = match self.store().insert_booking(new).await {
            Ok(id) => id,
            Err(StoreError::SlotTaken) => {
                metrics::counter!(crate::observability::SLOT_CONFLICTS_TOTAL).increment(1);
                tracing::info!(date = %req.date, time = %req.time, "slot lost to concurrent booking");
                return Err(ScheduleError::SlotTaken {
                    date: req.date,
                    time: req.time,
                });
            }
            Err(e) => return Err(Self::store_fault(e)),
        };

        self.invalidate(req.date);
        metrics::counter!(
            crate::observability::BOOKINGS_CREATED_TOTAL,
            "status" => initial.as_str()
        )
        .increment(1);
        tracing::info!(%id, date = %req.date, time = %req.time, status = initial.as_str(), "booking created");
        self.send(BookingChange::Created {
            id,
            date: req.date,
            time: req.time,
            status: initial,
        });
        Ok(id)
    }

    /// Cancel a booking.
    ///
    /// Clients may only cancel their own bookings (matched by phone hash; a
    /// foreign id reads as not-found), and a confirmed booking only while
    /// the cancel-notice window still holds — the boundary is inclusive.
    /// Admins skip both checks. Cancelling an already-cancelled booking is
    /// an idempotent no-op.
    pub async fn cancel_booking(
        &self,
        id: Ulid,
        acting_as: &Actor,
        now: DateTime<Utc>,
    ) -> Result<(), ScheduleError> {
        let booking = self
            .store()
            .read_booking(id)
            .await
            .map_err(Self::store_fault)?
            .ok_or(ScheduleError::NotFound(id))?;

        if let Actor::Client { phone } = acting_as {
            let digits = phone::normalize(phone).ok_or(ScheduleError::InvalidPhone)?;
            if phone::hash(&digits) != booking.client.phone_hash {
                // Do not reveal that the id exists at all.
                return Err(ScheduleError::NotFound(id));
            }
        }

        let policy = self.policy();
        match booking.status {
            BookingStatus::Cancelled => return Ok(()),
            BookingStatus::Completed => {
                return Err(ScheduleError::InvalidTransition {
                    from: BookingStatus::Completed,
                    to: BookingStatus::Cancelled,
                });
            }
            BookingStatus::Confirmed if !acting_as.is_admin() => {
                let remaining = policy.time_until(booking.date, booking.time, now);
                if remaining < policy.min_cancel_notice {
                    return Err(ScheduleError::TooLateToCancel {
                        min_notice: policy.min_cancel_notice,
                    });
                }
            }
            // Unpaid orders cancel freely; admin cancels skip the window.
            BookingStatus::PendingPayment | BookingStatus::Confirmed => {}
        }

        self.update_status(id, BookingStatus::Cancelled, None).await?;
        self.invalidate(booking.date);
        let actor = if acting_as.is_admin() { "admin" } else { "client" };
        metrics::counter!(
            crate::observability::BOOKINGS_CANCELLED_TOTAL,
            "actor" => actor
        )
        .increment(1);
        tracing::info!(%id, actor, "booking cancelled");
        self.send(BookingChange::Cancelled {
            id,
            date: booking.date,
            time: booking.time,
        });
        Ok(())
    }

    /// Record payment: `PendingPayment → Confirmed`, stamping `paid_at`.
    /// No timing constraint applies.
    pub async fn mark_paid(&self, id: Ulid, now: DateTime<Utc>) -> Result<(), ScheduleError> {
        let booking = self
            .store()
            .read_booking(id)
            .await
            .map_err(Self::store_fault)?
            .ok_or(ScheduleError::NotFound(id))?;

        if booking.status != BookingStatus::PendingPayment {
            return Err(ScheduleError::InvalidTransition {
                from: booking.status,
                to: BookingStatus::Confirmed,
            });
        }

        self.update_status(id, BookingStatus::Confirmed, Some(now)).await?;
        tracing::info!(%id, "booking paid");
        self.send(BookingChange::Paid { id });
        Ok(())
    }

    /// Administrative record-keeping: `Confirmed → Completed` after the
    /// appointment took place. Manual — nothing triggers it automatically.
    pub async fn complete_booking(&self, id: Ulid) -> Result<(), ScheduleError> {
        let booking = self
            .store()
            .read_booking(id)
            .await
            .map_err(Self::store_fault)?
            .ok_or(ScheduleError::NotFound(id))?;

        if booking.status != BookingStatus::Confirmed {
            return Err(ScheduleError::InvalidTransition {
                from: booking.status,
                to: BookingStatus::Completed,
            });
        }

        self.update_status(id, BookingStatus::Completed, None).await?;
        tracing::info!(%id, "booking completed");
        self.send(BookingChange::Completed { id });
        Ok(())
    }

    /// Emit the due-soon reminder for a confirmed booking. Called by the
    /// reminder dispatcher; delivery is best-effort like every notification.
    pub fn emit_reminder(&self, booking: &Booking) {
        metrics::counter!(crate::observability::REMINDERS_SENT_TOTAL).increment(1);
        self.send(BookingChange::ReminderDue {
            id: booking.id,
            date: booking.date,
            time: booking.time,
            chat_id: booking.chat_id,
        });
    }

    async fn update_status(
        &self,
        id: Ulid,
        status: BookingStatus,
        paid_at: Option<DateTime<Utc>>,
    ) -> Result<(), ScheduleError> {
        match self.store().update_booking_status(id, status, paid_at).await {
            Ok(()) => Ok(()),
            Err(StoreError::NotFound) => Err(ScheduleError::NotFound(id)),
            Err(e) => Err(Self::store_fault(e)),
        }
    }
}
