//! Append-only record of hub activity.
//!
//! Sessions, the listener, and the command dispatcher report discrete events
//! through the [`EventLog`] trait. The production sink writes one line per
//! record to a file that is truncated when the hub starts; tests use the
//! in-memory sink and assert on the captured records.

use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::{self, LineWriter, Write};
use std::sync::{Arc, Mutex, PoisonError};

use camino::{Utf8Path, Utf8PathBuf};
use thiserror::Error;
use time::macros::format_description;
use time::{OffsetDateTime, UtcOffset};
use tracing::{debug, warn};

const EVENTS_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::events");

/// Category of an [`EventRecord`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// The hub finished binding and began accepting devices.
    ServerStart,
    /// A connection was accepted, before any handshake.
    ConnectAttempt,
    /// A device registered and now occupies its slot.
    RegisterAccept,
    /// A registration was refused.
    RegisterDeny,
    /// A registered device reported status.
    Message,
    /// A registered session ended.
    Disconnect,
    /// An operator command reached a device connection.
    CommandSent,
    /// An operator command could not be delivered.
    CommandFailed,
    /// The hub is shutting down.
    ServerStop,
}

impl EventKind {
    /// Tag written between brackets in the log line.
    #[must_use]
    pub const fn tag(self) -> &'static str {
        match self {
            Self::ServerStart => "SERVER-START",
            Self::ConnectAttempt => "CONNECT-ATTEMPT",
            Self::RegisterAccept => "REGISTER-ACCEPT",
            Self::RegisterDeny => "REGISTER-DENY",
            Self::Message => "MESSAGE",
            Self::Disconnect => "DISCONNECT",
            Self::CommandSent => "COMMAND-SENT",
            Self::CommandFailed => "COMMAND-FAILED",
            Self::ServerStop => "SERVER-STOP",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.tag())
    }
}

/// Immutable event captured at creation time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventRecord {
    timestamp: OffsetDateTime,
    kind: EventKind,
    detail: String,
}

impl EventRecord {
    /// Captures an event stamped with the current time.
    #[must_use]
    pub fn now(kind: EventKind, detail: impl Into<String>) -> Self {
        Self::at(OffsetDateTime::now_utc(), kind, detail)
    }

    /// Captures an event with an explicit timestamp.
    #[must_use]
    pub fn at(timestamp: OffsetDateTime, kind: EventKind, detail: impl Into<String>) -> Self {
        Self {
            timestamp,
            kind,
            detail: detail.into(),
        }
    }

    /// When the event happened.
    #[must_use]
    pub fn timestamp(&self) -> OffsetDateTime {
        self.timestamp
    }

    /// Event category.
    #[must_use]
    pub fn kind(&self) -> EventKind {
        self.kind
    }

    /// Free-text detail.
    #[must_use]
    pub fn detail(&self) -> &str {
        &self.detail
    }

    /// Renders the log line with the timestamp shifted to `offset`.
    #[must_use]
    pub fn render(&self, offset: UtcOffset) -> String {
        let stamp = self
            .timestamp
            .to_offset(offset)
            .format(format_description!(
                "[year]-[month]-[day] [hour]:[minute]:[second]"
            ))
            .unwrap_or_else(|_| self.timestamp.unix_timestamp().to_string());
        format!("[{stamp}] [{}] {}", self.kind, self.detail)
    }
}

impl fmt::Display for EventRecord {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.render(UtcOffset::UTC))
    }
}

/// Sink receiving event records from every hub component.
///
/// Implementations must not fail the caller: a session or dispatch must keep
/// going even when the record cannot be stored.
pub trait EventLog: Send + Sync {
    /// Appends one record.
    fn append(&self, record: EventRecord);

    /// Convenience wrapper building the record in place.
    fn record(&self, kind: EventKind, detail: String) {
        self.append(EventRecord::now(kind, detail));
    }
}

impl<T> EventLog for Arc<T>
where
    T: EventLog + ?Sized,
{
    fn append(&self, record: EventRecord) {
        (**self).append(record);
    }
}

/// Errors raised while opening the event log file.
#[derive(Debug, Error)]
pub enum EventLogError {
    /// The file could not be created or truncated.
    #[error("failed to open event log '{path}': {source}")]
    Open {
        /// Configured log path.
        path: Utf8PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
}

/// File-backed sink writing one line per record.
#[derive(Debug)]
pub struct FileEventLog {
    path: Utf8PathBuf,
    offset: UtcOffset,
    writer: Mutex<LineWriter<File>>,
}

impl FileEventLog {
    /// Creates or truncates the log file.
    ///
    /// The local UTC offset is sampled here, before worker threads exist;
    /// when it cannot be determined the log is written in UTC.
    pub fn create(path: &Utf8Path) -> Result<Self, EventLogError> {
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(path.as_std_path())
            .map_err(|source| EventLogError::Open {
                path: path.to_path_buf(),
                source,
            })?;
        let offset = UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC);
        Ok(Self {
            path: path.to_path_buf(),
            offset,
            writer: Mutex::new(LineWriter::new(file)),
        })
    }

    /// Location of the log file.
    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }
}

impl EventLog for FileEventLog {
    fn append(&self, record: EventRecord) {
        let line = record.render(self.offset);
        debug!(target: EVENTS_TARGET, kind = %record.kind(), detail = record.detail(), "event");
        let mut writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        if let Err(error) = writeln!(writer, "{line}") {
            warn!(
                target: EVENTS_TARGET,
                %error,
                path = %self.path,
                "failed to append event record"
            );
        }
    }
}

/// In-memory sink, primarily for tests and embedding.
#[derive(Debug, Default)]
pub struct MemoryEventLog {
    records: Mutex<Vec<EventRecord>>,
}

impl MemoryEventLog {
    /// Builds an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of every record appended so far.
    #[must_use]
    pub fn records(&self) -> Vec<EventRecord> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Kinds of the captured records, in append order.
    #[must_use]
    pub fn kinds(&self) -> Vec<EventKind> {
        self.records().iter().map(EventRecord::kind).collect()
    }

    /// Whether any record of `kind` has a detail containing `needle`.
    #[must_use]
    pub fn contains(&self, kind: EventKind, needle: &str) -> bool {
        self.records()
            .iter()
            .any(|record| record.kind() == kind && record.detail().contains(needle))
    }
}

impl EventLog for MemoryEventLog {
    fn append(&self, record: EventRecord) {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(record);
    }
}
