//! Error types for jolla-notifications.
//!
//! Errors are strongly typed using thiserror, one enum per stage of the
//! pipeline plus a top-level [`NotifyError`] that wraps them. Only stream
//! read failures are fatal to ingestion; everything a malformed record can
//! cause is absorbed by the parser.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors produced while splitting the raw byte stream into records.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("Failed to read record stream: {0}")]
    Io(#[from] io::Error),

    #[error("Record exceeds maximum length of {limit} bytes")]
    RecordTooLong {
        limit: usize,
    },
}

/// Errors produced while reading fields out of a single raw record.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Record is not valid UTF-8 (valid up to byte {valid_up_to})")]
    InvalidEncoding {
        valid_up_to: usize,
    },
}

/// Errors produced while opening a record source.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Failed to spawn '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("Failed to open capture file {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Spawned '{program}' without a stdout pipe")]
    MissingStdout {
        program: String,
    },
}

/// Returned by a subscriber sink whose receiving side is gone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Subscriber channel is closed")]
pub struct SinkClosed;

/// Top-level error type for jolla-notifications.
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Scan error: {0}")]
    Scan(#[from] ScanError),

    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("Source error: {0}")]
    Source(#[from] SourceError),

    #[error("Invalid configuration: {message}")]
    Config {
        message: String,
    },

    #[error("Receive timed out after {duration_ms}ms")]
    Timeout {
        duration_ms: u64,
    },

    #[error("Channel disconnected: {path}")]
    Disconnected {
        path: String,
    },

    #[error("Server error: {message}")]
    Server {
        message: String,
    },

    #[error("Internal error: {message}")]
    Internal {
        message: String,
    },
}

impl NotifyError {
    /// Creates a configuration error.
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates a server error.
    #[must_use]
    pub fn server(message: impl Into<String>) -> Self {
        Self::Server {
            message: message.into(),
        }
    }

    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns true if this is a scan error.
    #[must_use]
    pub const fn is_scan(&self) -> bool {
        matches!(self, Self::Scan(_))
    }

    /// Returns true if this is a parse error.
    #[must_use]
    pub const fn is_parse(&self) -> bool {
        matches!(self, Self::Parse(_))
    }

    /// Returns true if this is a source error.
    #[must_use]
    pub const fn is_source(&self) -> bool {
        matches!(self, Self::Source(_))
    }

    /// Returns true if this error must stop the ingestion pipeline.
    ///
    /// Parse errors only cost the affected record; timeouts only affect the
    /// waiting subscriber.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        !matches!(self, Self::Parse(_) | Self::Timeout { .. })
    }
}

/// Result type alias for jolla-notifications operations.
pub type NotifyResult<T> = Result<T, NotifyError>;
