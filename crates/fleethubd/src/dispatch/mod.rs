//! Operator command delivery.
//!
//! The dispatcher copies the target slot's connection handle under the
//! roster lock, releases it, and performs one blocking write. A stalled
//! device therefore delays only the operator, never other sessions or the
//! snapshot reader. Outcomes are recorded in the event log. The dispatcher
//! never closes a connection or vacates a slot; that stays with the session
//! that owns it.

mod errors;

use std::sync::Arc;

use tracing::{info, warn};

pub use self::errors::DispatchFailure;
use crate::events::{EventKind, EventLog};
use crate::roster::Roster;

const DISPATCH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::dispatch");

/// Longest command accepted, in characters.
pub const COMMAND_CAPACITY: usize = 31;

/// Printable ASCII, the only characters a command may carry.
#[must_use]
pub fn is_command_char(character: char) -> bool {
    matches!(character, ' '..='~')
}

/// Keeps the printable prefix of `text` up to [`COMMAND_CAPACITY`].
#[must_use]
pub fn normalise_command(text: &str) -> String {
    text.chars()
        .filter(|character| is_command_char(*character))
        .take(COMMAND_CAPACITY)
        .collect()
}

/// Writes operator commands to live device connections.
pub struct CommandDispatcher {
    roster: Arc<Roster>,
    events: Arc<dyn EventLog>,
}

impl CommandDispatcher {
    pub fn new(roster: Arc<Roster>, events: Arc<dyn EventLog>) -> Self {
        Self { roster, events }
    }

    /// Sends `command` to the device occupying `index`.
    ///
    /// Returns the slot's name on success. Every outcome except
    /// [`DispatchFailure::EmptyCommand`] and [`DispatchFailure::UnknownSlot`]
    /// is recorded in the event log.
    pub fn dispatch(&self, index: usize, command: &str) -> Result<String, DispatchFailure> {
        let command = normalise_command(command);
        if command.is_empty() {
            return Err(DispatchFailure::EmptyCommand);
        }
        let name = self
            .roster
            .name(index)
            .ok_or(DispatchFailure::UnknownSlot { index })?
            .to_owned();

        let result = match self.roster.connection(index) {
            Ok(Some(handle)) => handle
                .send(command.as_bytes())
                .map_err(|source| DispatchFailure::WriteError {
                    name: name.clone(),
                    source,
                }),
            Ok(None) => Err(DispatchFailure::NoSession { name: name.clone() }),
            Err(error) => Err(error.into()),
        };

        match &result {
            Ok(()) => {
                self.events
                    .record(EventKind::CommandSent, format!("To {name}: {command}"));
                info!(target: DISPATCH_TARGET, slot = index, %name, %command, "command sent");
            }
            Err(failure) => {
                self.events.record(
                    EventKind::CommandFailed,
                    format!("To {name}: {command} ({})", failure.reason()),
                );
                warn!(target: DISPATCH_TARGET, slot = index, %name, %command, error = %failure, "command failed");
            }
        }
        result.map(|()| name)
    }
}
