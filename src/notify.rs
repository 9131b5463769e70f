use tokio::sync::broadcast;

use crate::model::BookingChange;

const CHANNEL_CAPACITY: usize = 256;

/// Outbound notification channel. Strictly fire-and-forget: implementations
/// must not block the caller, and delivery failures stay inside the
/// implementation — the scheduling outcome never depends on them.
pub trait Notifier: Send + Sync {
    fn notify(&self, change: &BookingChange);
}

/// Sink for embedders that run without a notification channel.
#[derive(Debug, Default)]
pub struct NullNotifier;

impl Notifier for NullNotifier {
    fn notify(&self, _change: &BookingChange) {}
}

/// In-process broadcast hub. Subscribers (bot webhook forwarder, admin live
/// view) receive every change; a send with nobody listening is a no-op.
pub struct NotifyHub {
    tx: broadcast::Sender<BookingChange>,
}

impl Default for NotifyHub {
    fn default() -> Self {
        Self::new()
    }
}

impl NotifyHub {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<BookingChange> {
        self.tx.subscribe()
    }
}

impl Notifier for NotifyHub {
    fn notify(&self, change: &BookingChange) {
        tracing::debug!(kind = change.kind(), payload = %change.payload(), "notify");
        if self.tx.send(change.clone()).is_err() {
            // Nobody listening — expected, not an error.
            metrics::counter!(crate::observability::NOTIFY_DROPPED_TOTAL).increment(1);
        }
    }
}
