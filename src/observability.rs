use std::net::SocketAddr;

// ── RED metrics (request-driven) ────────────────────────────────

/// Counter: bookings created. Labels: status.
pub const BOOKINGS_CREATED_TOTAL: &str = "praxis_bookings_created_total";

/// Counter: bookings cancelled. Labels: actor.
pub const BOOKINGS_CANCELLED_TOTAL: &str = "praxis_bookings_cancelled_total";

/// Counter: create attempts that lost the slot race at the store.
pub const SLOT_CONFLICTS_TOTAL: &str = "praxis_slot_conflicts_total";

/// Counter: availability queries. Labels: source (cache | store).
pub const AVAILABILITY_QUERIES_TOTAL: &str = "praxis_availability_queries_total";

/// Histogram: availability computation latency in seconds (store reads
/// included — the reads dominate, not the slot math).
pub const AVAILABILITY_DURATION_SECONDS: &str = "praxis_availability_duration_seconds";

// ── Auxiliary ───────────────────────────────────────────────────

/// Counter: reminder notifications emitted.
pub const REMINDERS_SENT_TOTAL: &str = "praxis_reminders_sent_total";

/// Counter: change notifications dropped for lack of subscribers.
pub const NOTIFY_DROPPED_TOTAL: &str = "praxis_notify_dropped_total";

/// Install Prometheus metrics exporter on the given port. No-op if port is None.
pub fn init(port: Option<u16>) {
    let Some(port) = port else { return };
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .expect("failed to install Prometheus metrics exporter");
    tracing::info!("metrics endpoint: http://0.0.0.0:{port}/metrics");
}
