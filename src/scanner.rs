//! Record boundary scanner for `dbus-monitor` output.
//!
//! `dbus-monitor` prints one multi-line block per intercepted `Notify` call.
//! Every block ends with the `expire_timeout` argument, which the phone always
//! sends as `-1`, so the line `int32 -1` doubles as a record terminator.
//!
//! # Stream format
//! ```text
//! method call sender=:1.22 -> dest=org.freedesktop.Notifications ...
//!    string "AndroidNotification"
//!    ...
//!    int32 -1
//! method call sender=:1.36 -> dest=org.freedesktop.Notifications ...
//! ```

use std::io::{BufRead, BufReader, ErrorKind, Read};

use crate::config::ScannerConfig;
use crate::error::ScanError;

/// Terminator closing every record.
pub const RECORD_TERMINATOR: &[u8] = b"int32 -1\n";

/// Outcome of one [`split_record`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Split<'a> {
    /// No complete record is buffered; append more input and call again.
    NeedMore,
    /// A record was found. `consumed` bytes must be dropped from the front of
    /// the buffer before the next call.
    Record {
        consumed: usize,
        record: &'a [u8],
    },
    /// The buffer is exhausted and the stream has ended.
    Done,
}

/// Splits the next record off the front of `data`.
///
/// A terminated record keeps its `int32 -1` line minus the trailing newline.
/// At end of stream an unterminated remainder is returned verbatim as a final
/// record, even if it is malformed.
#[must_use]
pub fn split_record(data: &[u8], at_eof: bool) -> Split<'_> {
    if data.is_empty() && at_eof {
        return Split::Done;
    }

    if let Some(i) = find_terminator(data) {
        let consumed = i + RECORD_TERMINATOR.len();
        return Split::Record {
            consumed,
            record: &data[..consumed - 1],
        };
    }

    if at_eof {
        return Split::Record {
            consumed: data.len(),
            record: data,
        };
    }

    Split::NeedMore
}

fn find_terminator(data: &[u8]) -> Option<usize> {
    data.windows(RECORD_TERMINATOR.len())
        .position(|window| window == RECORD_TERMINATOR)
}

/// Iterator over the raw records of a byte stream.
///
/// Forward-only and not restartable. A read failure is yielded once, after
/// which the iterator is exhausted.
#[derive(Debug)]
pub struct RecordScanner<R> {
    reader: BufReader<R>,
    buf: Vec<u8>,
    max_record_len: usize,
    at_eof: bool,
    finished: bool,
}

impl<R: Read> RecordScanner<R> {
    /// Creates a scanner with the default [`ScannerConfig`].
    pub fn new(reader: R) -> Self {
        Self::with_config(reader, &ScannerConfig::default())
    }

    /// Creates a scanner enforcing `config`'s record limit.
    pub fn with_config(reader: R, config: &ScannerConfig) -> Self {
        Self {
            reader: BufReader::new(reader),
            buf: Vec::new(),
            max_record_len: config.max_record_len.max(RECORD_TERMINATOR.len()),
            at_eof: false,
            finished: false,
        }
    }

    fn fill(&mut self) -> std::io::Result<usize> {
        let chunk = self.reader.fill_buf()?;
        let n = chunk.len();
        self.buf.extend_from_slice(chunk);
        self.reader.consume(n);
        Ok(n)
    }
}

impl<R: Read> Iterator for RecordScanner<R> {
    type Item = Result<Vec<u8>, ScanError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.finished {
                return None;
            }

            match split_record(&self.buf, self.at_eof) {
                Split::Done => {
                    self.finished = true;
                    return None;
                }
                Split::Record { consumed, record } => {
                    let record = record.to_vec();
                    self.buf.drain(..consumed);
                    return Some(Ok(record));
                }
                Split::NeedMore => {}
            }

            if self.buf.len() >= self.max_record_len {
                self.finished = true;
                return Some(Err(ScanError::RecordTooLong {
                    limit: self.max_record_len,
                }));
            }

            match self.fill() {
                Ok(0) => self.at_eof = true,
                Ok(_) => {}
                Err(e) if e.kind() == ErrorKind::Interrupted => {}
                Err(e) => {
                    self.finished = true;
                    return Some(Err(e.into()));
                }
            }
        }
    }
}

impl<R: Read> std::iter::FusedIterator for RecordScanner<R> {}
