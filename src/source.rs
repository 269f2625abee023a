//! Where the raw `dbus-monitor` byte stream comes from.
//!
//! In production the stream is the stdout of a spawned `dbus-monitor`. For
//! development a previously captured log can be replayed instead, e.g. one
//! recorded with
//!
//! ```text
//! dbus-monitor "interface='org.freedesktop.Notifications',member='Notify'" > dbus.log
//! ```
//!
//! The child process is not supervised: when it exits the stream ends and so
//! does ingestion.

use std::fmt;
use std::fs::File;
use std::io::{self, Read};
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};

use tracing::{debug, warn};

use crate::error::SourceError;

/// Program spawned by [`RecordSource::default`].
pub const DBUS_MONITOR_PROGRAM: &str = "dbus-monitor";

/// Match rule selecting notification events on the session bus.
pub const NOTIFY_MATCH_RULE: &str = "interface='org.freedesktop.Notifications',member='Notify'";

/// Origin of the record stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordSource {
    /// Spawn a monitor process and read its stdout.
    DbusMonitor {
        program: PathBuf,
        args: Vec<String>,
    },
    /// Replay a captured log.
    File(PathBuf),
    /// Read from this process's stdin.
    Stdin,
}

impl Default for RecordSource {
    fn default() -> Self {
        Self::dbus_monitor(DBUS_MONITOR_PROGRAM)
    }
}

impl RecordSource {
    /// A monitor process run as `program` with the notification match rule.
    #[must_use]
    pub fn dbus_monitor(program: impl Into<PathBuf>) -> Self {
        Self::DbusMonitor {
            program: program.into(),
            args: vec![NOTIFY_MATCH_RULE.to_string()],
        }
    }

    /// Opens the stream.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] if the capture file cannot be opened or the
    /// monitor process cannot be started.
    pub fn open(&self) -> Result<SourceReader, SourceError> {
        match self {
            Self::DbusMonitor { program, args } => {
                let name = program.display().to_string();
                let mut child = Command::new(program)
                    .args(args)
                    .stdin(Stdio::null())
                    .stdout(Stdio::piped())
                    .spawn()
                    .map_err(|source| SourceError::Spawn {
                        program: name.clone(),
                        source,
                    })?;

                let Some(stdout) = child.stdout.take() else {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(SourceError::MissingStdout { program: name });
                };

                debug!(program = %name, pid = child.id(), "spawned record source");
                Ok(SourceReader {
                    inner: Box::new(stdout),
                    child: Some(child),
                })
            }
            Self::File(path) => {
                let file = File::open(path).map_err(|source| SourceError::Open {
                    path: path.clone(),
                    source,
                })?;
                Ok(SourceReader {
                    inner: Box::new(file),
                    child: None,
                })
            }
            Self::Stdin => Ok(SourceReader {
                inner: Box::new(io::stdin()),
                child: None,
            }),
        }
    }
}

impl fmt::Display for RecordSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DbusMonitor { program, args } => {
                write!(f, "{}", program.display())?;
                for arg in args {
                    write!(f, " {arg:?}")?;
                }
                Ok(())
            }
            Self::File(path) => write!(f, "file {}", path.display()),
            Self::Stdin => f.write_str("stdin"),
        }
    }
}

/// Readable record stream. Owns the monitor process, if any, and kills it
/// when dropped.
pub struct SourceReader {
    inner: Box<dyn Read + Send>,
    child: Option<Child>,
}

impl SourceReader {
    /// Wraps an arbitrary reader.
    pub fn from_reader(reader: impl Read + Send + 'static) -> Self {
        Self {
            inner: Box::new(reader),
            child: None,
        }
    }

    /// Process id of the monitor process, if this stream has one.
    #[must_use]
    pub fn child_id(&self) -> Option<u32> {
        self.child.as_ref().map(Child::id)
    }
}

impl Read for SourceReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }
}

impl fmt::Debug for SourceReader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceReader")
            .field("child", &self.child_id())
            .finish_non_exhaustive()
    }
}

impl Drop for SourceReader {
    fn drop(&mut self) {
        let Some(mut child) = self.child.take() else {
            return;
        };

        if let Ok(Some(status)) = child.try_wait() {
            debug!(pid = child.id(), %status, "record source already exited");
            return;
        }
        if let Err(e) = child.kill() {
            warn!(pid = child.id(), "failed to kill record source: {e}");
        }
        let _ = child.wait();
    }
}
