use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, TryRecvError};

use crate::error::{NotifyError, NotifyResult};
use crate::notification::Notification;

use super::manager::{BroadcastManager, SubscriptionId};

/// Receiving end of a [`BroadcastManager::subscribe`] registration.
///
/// Dropping the handle unsubscribes. The receiver is released before the
/// registration is removed so a `send` blocked on this subscriber can finish
/// and let go of the registry lock. Unsubscribing still waits for the
/// registry, so do not drop a handle on the thread that must receive for
/// some other subscription of the same manager.
#[derive(Debug)]
pub struct Subscription {
    id: SubscriptionId,
    rx: Option<Receiver<Arc<Notification>>>,
    manager: Arc<BroadcastManager>,
}

impl Subscription {
    pub(crate) fn new(
        id: SubscriptionId,
        rx: Receiver<Arc<Notification>>,
        manager: Arc<BroadcastManager>,
    ) -> Self {
        Self {
            id,
            rx: Some(rx),
            manager,
        }
    }

    /// The id backing this subscription.
    #[must_use]
    pub const fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Receive the next notification (blocking).
    pub fn recv(&self) -> NotifyResult<Arc<Notification>> {
        self.receiver()?.recv().map_err(|_| disconnected())
    }

    /// Receive the next notification with a timeout.
    pub fn recv_timeout(&self, timeout: Duration) -> NotifyResult<Arc<Notification>> {
        self.receiver()?
            .recv_timeout(timeout)
            .map_err(|err| match err {
                RecvTimeoutError::Timeout => NotifyError::Timeout {
                    duration_ms: timeout.as_millis().min(u128::from(u64::MAX)) as u64,
                },
                RecvTimeoutError::Disconnected => disconnected(),
            })
    }

    /// Receive a notification only if a producer is currently offering one.
    pub fn try_recv(&self) -> NotifyResult<Option<Arc<Notification>>> {
        match self.receiver()?.try_recv() {
            Ok(n) => Ok(Some(n)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(disconnected()),
        }
    }

    /// Stops receiving and removes the registration.
    pub fn unsubscribe(self) {
        drop(self);
    }

    fn receiver(&self) -> NotifyResult<&Receiver<Arc<Notification>>> {
        self.rx.as_ref().ok_or_else(disconnected)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        drop(self.rx.take());
        self.manager.remove(self.id);
    }
}

fn disconnected() -> NotifyError {
    NotifyError::Disconnected {
        path: "subscription".to_string(),
    }
}
