//! Live fan-out of notifications to subscribers.
//!
//! The [`BroadcastManager`] is a registry of delivery sinks keyed by a
//! monotonically increasing [`SubscriptionId`]. The ingestion thread calls
//! [`BroadcastManager::send`] once per notification; every subscriber
//! registers on connect and removes itself on disconnect.
//!
//! Delivery is a blocking hand-off. A subscriber that stops reading without
//! abandoning its channel stalls the producer and everybody else. Abandoning
//! the receiving side releases the producer at once, which is why subscribers
//! drop their receiver before calling [`BroadcastManager::remove`].

/// Subscriber registry and fan-out.
pub mod manager;
/// Delivery sink abstraction.
pub mod sink;
/// Blocking subscription handle.
pub mod subscription;

pub use manager::{BroadcastManager, SubscriptionId};
pub use sink::NotificationSink;
pub use subscription::Subscription;
