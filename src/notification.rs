//! The normalized notification record.

use std::fmt;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

/// A time stamped phone notification.
///
/// Only two textual fields are taken from the D-Bus record. `time` is
/// supplied by whoever constructs the value (the parser stamps it with its
/// [`TimeFormatter`]).
///
/// Serialized field names (`Time`, `Summary`, `Body`) are part of the wire
/// format consumed by the web view and must stay stable.
///
/// # Examples
///
/// ```
/// use jolla_notifications::Notification;
///
/// let n = Notification::new("MockedTime", "Uhr", "Timer expired");
/// assert!(!n.is_empty());
/// assert_eq!(n.summary(), "Uhr");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Notification {
    time: String,

    /// Normally names the source of the notification rather than
    /// summarizing it.
    summary: String,

    body: String,
}

impl Notification {
    /// Creates a notification from its three fields.
    #[must_use]
    pub fn new(time: impl Into<String>, summary: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            time: time.into(),
            summary: summary.into(),
            body: body.into(),
        }
    }

    /// Receive time as rendered by the parser's formatter.
    #[must_use]
    pub fn time(&self) -> &str {
        &self.time
    }

    /// Usually the name of the sending app or contact.
    #[must_use]
    pub fn summary(&self) -> &str {
        &self.summary
    }

    /// The notification text.
    #[must_use]
    pub fn body(&self) -> &str {
        &self.body
    }

    /// Returns true if the notification carries no usable data, i.e. its body
    /// is empty. The summary is not considered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("Empty notification");
        }

        write!(f, "Notification time: \"{}\" ", self.time)?;
        if !self.summary.is_empty() {
            write!(f, "summary: \"{}\" ", self.summary)?;
        }
        write!(f, "body: \"{}\"", self.body)
    }
}

/// Renders the moment a notification was received.
///
/// Implemented for any `Fn(DateTime<Local>) -> String`, which is how tests
/// pin the timestamp.
pub trait TimeFormatter: Send + Sync {
    /// Formats `at` for the `Time` field.
    fn format(&self, at: DateTime<Local>) -> String;
}

impl<F> TimeFormatter for F
where
    F: Fn(DateTime<Local>) -> String + Send + Sync,
{
    fn format(&self, at: DateTime<Local>) -> String {
        self(at)
    }
}

/// RFC 822 timestamps with a numeric zone (RFC 822Z), e.g.
/// `03 Sep 15 12:50 +0200`. `Local` carries no zone abbreviation, so the
/// offset stands in for it.
#[derive(Debug, Clone, Copy, Default)]
pub struct Rfc822;

impl TimeFormatter for Rfc822 {
    fn format(&self, at: DateTime<Local>) -> String {
        at.format("%d %b %y %H:%M %z").to_string()
    }
}
