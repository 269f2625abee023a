//! # jolla-notifications
//!
//! Mirrors the desktop notifications of a Jolla phone to a browser.
//!
//! The phone's `dbus-monitor` output is split into records, each record is
//! parsed into a [`Notification`], and every non-empty notification is both
//! kept in a bounded [`Backlog`] and fanned out to live subscribers through
//! the [`BroadcastManager`].
//!
//! ## Pipeline
//!
//! - [`RecordScanner`]: splits the byte stream on the `int32 -1` terminator
//! - [`RecordParser`]: pulls summary and body out of one record
//! - [`Ingestor`]: drives scanner and parser on a dedicated thread
//! - [`Backlog`]: the newest N notifications, newest first
//! - [`BroadcastManager`]: per-subscriber delivery of new notifications
//!
//! ## Usage
//!
//! ```rust
//! use std::io::Cursor;
//! use std::sync::Arc;
//!
//! use jolla_notifications::{Backlog, BroadcastManager, Ingestor};
//!
//! let backlog = Arc::new(Backlog::new(10));
//! let broadcast = Arc::new(BroadcastManager::new());
//! let ingestor = Ingestor::new(Arc::clone(&backlog), Arc::clone(&broadcast));
//!
//! let log = "   string \"x-nemo-preview-summary\"\n         variant             string \"Uhr\"\n   string \"x-nemo-preview-body\"\n         variant             string \"Timer\"\n   int32 -1\n";
//! let stats = ingestor.run(Cursor::new(log))?;
//!
//! assert_eq!(stats.notifications, 1);
//! assert_eq!(backlog.notifications()[0].summary(), "Uhr");
//! # Ok::<(), jolla_notifications::NotifyError>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

// Core types
pub mod error;
pub mod notification;

// Pipeline stages
pub mod parser;
pub mod scanner;
pub mod source;

// Shared state and fan-out
pub mod backlog;
pub mod broadcast;
pub mod config;
pub mod ingest;

#[cfg(feature = "transport-http")]
pub mod transport;

pub use backlog::Backlog;
pub use broadcast::{BroadcastManager, NotificationSink, Subscription, SubscriptionId};
pub use config::{ScannerConfig, ServerConfig};
pub use error::{NotifyError, NotifyResult, ParseError, ScanError, SinkClosed, SourceError};
pub use ingest::{IngestStats, Ingestor};
pub use notification::{Notification, Rfc822, TimeFormatter};
pub use parser::RecordParser;
pub use scanner::{split_record, RecordScanner, Split};
pub use source::{RecordSource, SourceReader};
