//! Error types for command dispatch.

use std::io;

use thiserror::Error;

use crate::roster::RosterError;

/// Why a command did not reach its device.
#[derive(Debug, Error)]
pub enum DispatchFailure {
    /// The target slot has no live session; nothing was written.
    #[error("no session for '{name}'")]
    NoSession { name: String },
    /// The write to the device's connection failed.
    #[error("write to '{name}' failed: {source}")]
    WriteError {
        name: String,
        #[source]
        source: io::Error,
    },
    /// The index does not address a roster slot.
    #[error("no roster slot at index {index}")]
    UnknownSlot { index: usize },
    /// The command text was empty after trimming to printable characters.
    #[error("command is empty")]
    EmptyCommand,
    #[error("roster unavailable: {0}")]
    Roster(#[source] RosterError),
}

impl DispatchFailure {
    /// Short reason for operator display and the event log.
    #[must_use]
    pub fn reason(&self) -> &'static str {
        match self {
            Self::NoSession { .. } => "no-session",
            Self::WriteError { .. } => "write-error",
            Self::UnknownSlot { .. } => "unknown-slot",
            Self::EmptyCommand => "empty-command",
            Self::Roster(_) => "roster-unavailable",
        }
    }
}

impl From<RosterError> for DispatchFailure {
    fn from(error: RosterError) -> Self {
        match error {
            RosterError::UnknownSlot { index } => Self::UnknownSlot { index },
            other => Self::Roster(other),
        }
    }
}
