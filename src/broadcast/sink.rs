use std::sync::Arc;

use crossbeam_channel::Sender;

use crate::error::SinkClosed;
use crate::notification::Notification;

/// One-way delivery channel of a single subscriber.
///
/// `deliver` blocks until the subscriber has accepted the notification and
/// fails only once the receiving side is gone.
pub trait NotificationSink: Send + Sync {
    /// Hands `notification` to the subscriber.
    ///
    /// # Errors
    ///
    /// Returns [`SinkClosed`] if the subscriber has abandoned its channel.
    fn deliver(&self, notification: &Arc<Notification>) -> Result<(), SinkClosed>;
}

impl NotificationSink for Sender<Arc<Notification>> {
    fn deliver(&self, notification: &Arc<Notification>) -> Result<(), SinkClosed> {
        self.send(Arc::clone(notification)).map_err(|_| SinkClosed)
    }
}

/// Must only be delivered to from outside the async runtime, e.g. from the
/// ingestion thread; `blocking_send` panics on a runtime worker.
#[cfg(feature = "transport-http")]
impl NotificationSink for tokio::sync::mpsc::Sender<Arc<Notification>> {
    fn deliver(&self, notification: &Arc<Notification>) -> Result<(), SinkClosed> {
        self.blocking_send(Arc::clone(notification))
            .map_err(|_| SinkClosed)
    }
}
