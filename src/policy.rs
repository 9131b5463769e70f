use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveTime, TimeZone, Utc};

/// Timing rules for the scheduling core. All date/time arithmetic happens in
/// `business_tz` — there is exactly one business timezone, no per-user
/// conversion.
#[derive(Debug, Clone)]
pub struct BookingPolicy {
    /// Minimum lead time between "now" and a bookable slot start.
    pub min_advance_notice: Duration,
    /// Minimum lead time for a client (non-admin) to self-cancel a confirmed
    /// booking. Inclusive: remaining time equal to the threshold passes.
    pub min_cancel_notice: Duration,
    /// How far into the future a booking date may lie, in days from today.
    pub max_days_ahead: i64,
    /// How long before the appointment the reminder fires.
    pub reminder_lead: Duration,
    pub business_tz: FixedOffset,
    /// TTL for per-date availability caching. Zero disables the cache.
    pub cache_ttl: std::time::Duration,
}

impl Default for BookingPolicy {
    fn default() -> Self {
        Self {
            min_advance_notice: Duration::hours(1),
            min_cancel_notice: Duration::minutes(30),
            max_days_ahead: 30,
            reminder_lead: Duration::hours(24),
            business_tz: FixedOffset::east_opt(3 * 3600).expect("offset in range"),
            cache_ttl: std::time::Duration::from_secs(30),
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.parse().ok())
}

impl BookingPolicy {
    /// Read overrides from `PRAXIS_*` environment variables, falling back to
    /// the defaults above.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            min_advance_notice: env_parse("PRAXIS_MIN_ADVANCE_MINUTES")
                .map(Duration::minutes)
                .unwrap_or(defaults.min_advance_notice),
            min_cancel_notice: env_parse("PRAXIS_MIN_CANCEL_MINUTES")
                .map(Duration::minutes)
                .unwrap_or(defaults.min_cancel_notice),
            max_days_ahead: env_parse("PRAXIS_MAX_DAYS_AHEAD").unwrap_or(defaults.max_days_ahead),
            reminder_lead: env_parse("PRAXIS_REMINDER_LEAD_HOURS")
                .map(Duration::hours)
                .unwrap_or(defaults.reminder_lead),
            business_tz: env_parse::<i32>("PRAXIS_UTC_OFFSET_MINUTES")
                .and_then(|m| FixedOffset::east_opt(m * 60))
                .unwrap_or(defaults.business_tz),
            cache_ttl: env_parse("PRAXIS_CACHE_TTL_SECS")
                .map(std::time::Duration::from_secs)
                .unwrap_or(defaults.cache_ttl),
        }
    }

    /// Absolute instant of a (date, time) pair in the business timezone.
    pub fn instant(&self, date: NaiveDate, time: NaiveTime) -> DateTime<Utc> {
        Utc.from_utc_datetime(&(date.and_time(time) - self.business_tz))
    }

    /// Today's calendar date in the business timezone.
    pub fn today(&self, now: DateTime<Utc>) -> NaiveDate {
        now.with_timezone(&self.business_tz).date_naive()
    }

    /// Signed time remaining until the appointment instant. Negative once
    /// the slot start has passed.
    pub fn time_until(&self, date: NaiveDate, time: NaiveTime, now: DateTime<Utc>) -> Duration {
        self.instant(date, time) - now
    }
}
