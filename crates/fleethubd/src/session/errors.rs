//! Registration failures.

use thiserror::Error;

use crate::roster::RosterError;

/// Why a connection was refused a roster slot.
#[derive(Debug, Error)]
pub enum RegistrationError {
    /// The presented name is not on the roster, or the first message had no
    /// `name:` prefix at all.
    #[error("unknown device '{name}'")]
    Denied { name: String },
    /// Another live session holds the slot and duplicates are rejected.
    #[error("slot occupied by another session for '{name}'")]
    SlotOccupied { name: String },
    #[error("roster unavailable: {0}")]
    Roster(#[source] RosterError),
}

impl RegistrationError {
    pub(super) fn from_roster(error: RosterError) -> Self {
        match error {
            RosterError::AlreadyOccupied { name } => Self::SlotOccupied { name },
            other => Self::Roster(other),
        }
    }
}
