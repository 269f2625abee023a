//! Bounded history of the most recent notifications.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::notification::Notification;

/// The current backlog of notifications.
///
/// Holds at most `capacity` notifications, newest first. Adding to a full
/// backlog evicts the oldest entry.
///
/// `add` and `notifications` are synchronized and can be called from
/// concurrent threads without additional locking: readers share the lock,
/// a writer holds it exclusively.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use jolla_notifications::{Backlog, Notification};
///
/// let backlog = Backlog::new(2);
/// for body in ["one", "two", "three"] {
///     backlog.add(Arc::new(Notification::new("now", "", body)));
/// }
///
/// let bodies: Vec<_> = backlog.notifications().iter().map(|n| n.body().to_string()).collect();
/// assert_eq!(bodies, ["three", "two"]);
/// ```
#[derive(Debug)]
pub struct Backlog {
    capacity: usize,
    entries: RwLock<VecDeque<Arc<Notification>>>,
}

impl Backlog {
    /// Creates an empty backlog holding at most `capacity` notifications.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: RwLock::new(VecDeque::new()),
        }
    }

    /// Prepends `notification`, evicting the oldest entries beyond capacity.
    pub fn add(&self, notification: Arc<Notification>) {
        let mut entries = self.entries.write();
        entries.push_front(notification);
        entries.truncate(self.capacity);
    }

    /// Returns a snapshot of the backlog, newest first.
    ///
    /// The snapshot is detached from the backlog; later calls to `add` do not
    /// change it.
    #[must_use]
    pub fn notifications(&self) -> Vec<Arc<Notification>> {
        self.entries.read().iter().cloned().collect()
    }

    /// Number of notifications currently held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Returns true if nothing has been added yet or the capacity is 0.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Maximum number of notifications kept.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }
}
