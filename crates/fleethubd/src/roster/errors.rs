//! Error types for roster mutations.

use thiserror::Error;

/// Errors returned by [`super::Roster`] mutations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RosterError {
    /// The index does not address a roster slot.
    #[error("no roster slot at index {index}")]
    UnknownSlot { index: usize },
    /// The slot already has a live session and the policy rejects duplicates.
    #[error("slot '{name}' is already occupied")]
    AlreadyOccupied { name: String },
    /// A writer panicked while holding the roster lock.
    #[error("roster lock poisoned")]
    Poisoned,
}
