//! The ingestion pipeline: scanner → parser → backlog and broadcast.
//!
//! One producer thread runs the pipeline for the lifetime of the record
//! stream. A read failure ends it; malformed records never do.

use std::io::Read;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use tracing::{debug, error, info, warn};

use crate::backlog::Backlog;
use crate::broadcast::BroadcastManager;
use crate::config::ScannerConfig;
use crate::error::{NotifyError, NotifyResult};
use crate::notification::{Rfc822, TimeFormatter};
use crate::parser::RecordParser;
use crate::scanner::RecordScanner;

/// Counters for one ingestion run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestStats {
    /// Raw records split off the stream.
    pub records: u64,
    /// Notifications added to the backlog and broadcast.
    pub notifications: u64,
    /// Records that parsed into a notification without a body.
    pub empty: u64,
    /// Records that could not be read as text.
    pub malformed: u64,
}

/// Feeds parsed notifications into the shared backlog and broadcast manager.
#[derive(Debug)]
pub struct Ingestor<F = Rfc822> {
    parser: RecordParser<F>,
    backlog: Arc<Backlog>,
    broadcast: Arc<BroadcastManager>,
    scanner: ScannerConfig,
}

impl Ingestor<Rfc822> {
    /// Creates an ingestor stamping notifications with the default formatter.
    #[must_use]
    pub fn new(backlog: Arc<Backlog>, broadcast: Arc<BroadcastManager>) -> Self {
        Self::with_parser(RecordParser::new(), backlog, broadcast)
    }
}

impl<F: TimeFormatter> Ingestor<F> {
    /// Creates an ingestor around a custom parser.
    pub fn with_parser(
        parser: RecordParser<F>,
        backlog: Arc<Backlog>,
        broadcast: Arc<BroadcastManager>,
    ) -> Self {
        Self {
            parser,
            backlog,
            broadcast,
            scanner: ScannerConfig::default(),
        }
    }

    /// Replaces the scanner limits.
    #[must_use]
    pub fn scanner_config(mut self, scanner: ScannerConfig) -> Self {
        self.scanner = scanner;
        self
    }

    /// Consumes `reader` until end of stream.
    ///
    /// # Errors
    ///
    /// Returns [`NotifyError::Scan`] if reading the stream fails. Records
    /// processed before the failure stay in the backlog.
    pub fn run<R: Read>(&self, reader: R) -> NotifyResult<IngestStats> {
        let mut stats = IngestStats::default();

        for record in RecordScanner::with_config(reader, &self.scanner) {
            let record = record.map_err(|e| {
                error!("record stream failed: {e}");
                NotifyError::from(e)
            })?;
            stats.records += 1;
            debug!(record = %String::from_utf8_lossy(&record), "D-Bus record");

            let notification = match self.parser.parse(&record) {
                Ok(n) => n,
                Err(e) => {
                    warn!("skipping record: {e}");
                    stats.malformed += 1;
                    continue;
                }
            };

            info!("New {notification}");
            if notification.is_empty() {
                stats.empty += 1;
                continue;
            }

            let notification = Arc::new(notification);
            self.backlog.add(Arc::clone(&notification));
            let delivered = self.broadcast.send(&notification);
            debug!(delivered, "notification broadcast");
            stats.notifications += 1;
        }

        info!(
            records = stats.records,
            notifications = stats.notifications,
            "record stream ended"
        );
        Ok(stats)
    }
}

impl<F: TimeFormatter + 'static> Ingestor<F> {
    /// Runs the pipeline on a dedicated thread.
    ///
    /// # Errors
    ///
    /// Returns [`NotifyError::Internal`] if the thread cannot be spawned.
    pub fn spawn<R: Read + Send + 'static>(
        self,
        reader: R,
    ) -> NotifyResult<JoinHandle<NotifyResult<IngestStats>>> {
        thread::Builder::new()
            .name("jolla-ingest".to_string())
            .spawn(move || self.run(reader))
            .map_err(|e| NotifyError::internal(format!("failed to spawn ingestion thread: {e}")))
    }
}
