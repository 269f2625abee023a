//! Field extraction from a single `dbus-monitor` record.
//!
//! The interesting values live in the hints dictionary of the `Notify` call.
//! A hint key line is followed by a `variant string "..."` line carrying its
//! value, so the parser walks the record line by line and remembers which
//! value it expects next.

use chrono::Local;

use crate::error::ParseError;
use crate::notification::{Notification, Rfc822, TimeFormatter};

const PREVIEW_BODY_MARKER: &str = r#"string "x-nemo-preview-body""#;
const OWNER_MARKER: &str = r#"string "x-nemo-owner""#;
const PREVIEW_SUMMARY_MARKER: &str = r#"string "x-nemo-preview-summary""#;

/// Which value the next line carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FieldState {
    Idle,
    AwaitingSummary,
    AwaitingBody,
}

impl FieldState {
    /// Transition taken from `Idle` for a hint key line.
    ///
    /// The owner only names the summary while no summary has been seen yet;
    /// a preview summary always does. Consumers depend on this precedence.
    fn on_key(line: &str, summary_unset: bool) -> Self {
        if line.contains(PREVIEW_BODY_MARKER) {
            Self::AwaitingBody
        } else if line.contains(OWNER_MARKER) {
            if summary_unset {
                Self::AwaitingSummary
            } else {
                Self::Idle
            }
        } else if line.contains(PREVIEW_SUMMARY_MARKER) {
            Self::AwaitingSummary
        } else {
            Self::Idle
        }
    }
}

/// Returns the text strictly between the first and the last double quote of
/// `line`, or an empty string if the line has fewer than two quotes.
#[must_use]
pub fn extract_quoted(line: &str) -> &str {
    match (line.find('"'), line.rfind('"')) {
        (Some(first), Some(last)) if first < last => &line[first + 1..last],
        _ => "",
    }
}

/// Turns raw records into [`Notification`]s.
#[derive(Debug, Clone, Default)]
pub struct RecordParser<F = Rfc822> {
    formatter: F,
}

impl RecordParser<Rfc822> {
    /// Creates a parser stamping notifications with local time in RFC 822
    /// form with a numeric zone.
    #[must_use]
    pub const fn new() -> Self {
        Self { formatter: Rfc822 }
    }
}

impl<F: TimeFormatter> RecordParser<F> {
    /// Creates a parser stamping notifications with `formatter`.
    pub const fn with_formatter(formatter: F) -> Self {
        Self { formatter }
    }

    /// Extracts summary and body from one raw record.
    ///
    /// Missing fields stay empty; a record without a body is valid output and
    /// is recognized by [`Notification::is_empty`].
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::InvalidEncoding`] if the record is not UTF-8.
    pub fn parse(&self, record: &[u8]) -> Result<Notification, ParseError> {
        let text = std::str::from_utf8(record).map_err(|e| ParseError::InvalidEncoding {
            valid_up_to: e.valid_up_to(),
        })?;

        let time = self.formatter.format(Local::now());
        let mut summary = String::new();
        let mut body = String::new();
        let mut state = FieldState::Idle;

        for line in text.lines() {
            state = match state {
                FieldState::AwaitingBody => {
                    extract_quoted(line).clone_into(&mut body);
                    FieldState::Idle
                }
                FieldState::AwaitingSummary => {
                    extract_quoted(line).clone_into(&mut summary);
                    FieldState::Idle
                }
                FieldState::Idle => FieldState::on_key(line, summary.is_empty()),
            };
        }

        Ok(Notification::new(time, summary, body))
    }
}
