//! Runtime configuration.

use std::net::SocketAddr;
use std::path::PathBuf;

use crate::error::{NotifyError, NotifyResult};
use crate::source::RecordSource;

/// Default number of notifications kept in the backlog.
pub const DEFAULT_MAX_NOTIFICATIONS: usize = 10;

/// Default upper bound for a single raw record.
pub const DEFAULT_MAX_RECORD_LEN: usize = 64 * 1024;

/// Limits applied while splitting the record stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannerConfig {
    /// Records growing past this many bytes without a terminator abort the
    /// scan.
    pub max_record_len: usize,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            max_record_len: DEFAULT_MAX_RECORD_LEN,
        }
    }
}

/// Server configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Address the web interface listens on.
    pub listen: SocketAddr,
    /// Directory containing the web interface.
    pub html_dir: PathBuf,
    /// Maximum number of notifications to serve.
    pub max_notifications: usize,
    /// Log raw records and individual HTTP requests.
    pub verbose: bool,
    /// Where `dbus-monitor` output comes from.
    pub source: RecordSource,
    pub scanner: ScannerConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: SocketAddr::from(([0, 0, 0, 0], 8080)),
            html_dir: PathBuf::from("./html"),
            max_notifications: DEFAULT_MAX_NOTIFICATIONS,
            verbose: false,
            source: RecordSource::default(),
            scanner: ScannerConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Checks the parts of the configuration that would otherwise only fail
    /// once the server is up.
    ///
    /// # Errors
    ///
    /// Returns [`NotifyError::Config`] if a capture file does not exist or
    /// the record limit cannot hold a single terminator.
    pub fn validate(&self) -> NotifyResult<()> {
        if let RecordSource::File(path) = &self.source {
            if !path.is_file() {
                return Err(NotifyError::config(format!(
                    "capture file {} does not exist",
                    path.display()
                )));
            }
        }

        if self.scanner.max_record_len < crate::scanner::RECORD_TERMINATOR.len() {
            return Err(NotifyError::config(format!(
                "max record length {} is shorter than the record terminator",
                self.scanner.max_record_len
            )));
        }

        Ok(())
    }
}
