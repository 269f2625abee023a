use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crossbeam_channel::bounded;
use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::notification::Notification;

use super::sink::NotificationSink;
use super::subscription::Subscription;

/// Identifier of a registered subscriber. Never reused within a process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    /// The raw counter value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

struct Registry {
    next_id: u64,
    sinks: BTreeMap<SubscriptionId, Box<dyn NotificationSink>>,
}

/// Registry of subscriber sinks; broadcasts each notification to all of them.
///
/// All methods are synchronized. `add` and `remove` take the registry lock
/// exclusively, `send` holds it shared for the whole fan-out pass, so a
/// subscriber that blocks delivery also delays registrations until it either
/// accepts the notification or abandons its channel.
///
/// The manager never closes subscriber channels; it only stops delivering to
/// removed ones.
pub struct BroadcastManager {
    registry: RwLock<Registry>,
}

impl BroadcastManager {
    /// Creates a manager without subscribers.
    #[must_use]
    pub fn new() -> Self {
        Self {
            registry: RwLock::new(Registry {
                next_id: 0,
                sinks: BTreeMap::new(),
            }),
        }
    }

    /// Registers `sink` and returns its id, to be passed to [`remove`].
    ///
    /// [`remove`]: Self::remove
    pub fn add(&self, sink: impl NotificationSink + 'static) -> SubscriptionId {
        let mut registry = self.registry.write();
        let id = SubscriptionId(registry.next_id);
        registry.next_id += 1;
        registry.sinks.insert(id, Box::new(sink));
        debug!(subscription = %id, subscribers = registry.sinks.len(), "subscriber added");
        id
    }

    /// Unregisters the sink identified by `id`.
    ///
    /// Unknown or already removed ids are ignored. Returns whether a sink was
    /// removed.
    pub fn remove(&self, id: SubscriptionId) -> bool {
        let mut registry = self.registry.write();
        let removed = registry.sinks.remove(&id).is_some();
        if removed {
            debug!(subscription = %id, subscribers = registry.sinks.len(), "subscriber removed");
        }
        removed
    }

    /// Delivers `notification` to every registered sink and returns how many
    /// accepted it.
    ///
    /// Blocks until each live subscriber has taken the notification. Sinks
    /// whose subscriber has gone away are skipped but stay registered until
    /// the subscriber removes itself.
    pub fn send(&self, notification: &Arc<Notification>) -> usize {
        let registry = self.registry.read();
        let mut delivered = 0;
        for (id, sink) in &registry.sinks {
            match sink.deliver(notification) {
                Ok(()) => delivered += 1,
                Err(e) => warn!(subscription = %id, "skipping subscriber: {e}"),
            }
        }
        delivered
    }

    /// Creates a rendezvous channel, registers it and returns the receiving
    /// handle.
    #[must_use]
    pub fn subscribe(self: &Arc<Self>) -> Subscription {
        let (tx, rx) = bounded(0);
        let id = self.add(tx);
        Subscription::new(id, rx, Arc::clone(self))
    }

    /// Number of registered subscribers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.registry.read().sinks.len()
    }

    /// Returns true if no subscriber is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.registry.read().sinks.is_empty()
    }

    /// Returns true if `id` is still registered.
    #[must_use]
    pub fn contains(&self, id: SubscriptionId) -> bool {
        self.registry.read().sinks.contains_key(&id)
    }
}

impl Default for BroadcastManager {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for BroadcastManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let registry = self.registry.read();
        f.debug_struct("BroadcastManager")
            .field("subscribers", &registry.sinks.len())
            .field("next_id", &registry.next_id)
            .finish()
    }
}
