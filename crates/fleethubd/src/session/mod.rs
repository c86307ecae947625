//! Per-connection session handling.
//!
//! A session starts unregistered. Its first message either binds it to a
//! roster slot (`ACCEPTED`) or ends it (`DENIED`). A registered session
//! applies every further message from its device to the slot until the
//! connection reads EOF or fails, then vacates the slot.

mod errors;
pub mod protocol;

use std::io::Write;
use std::sync::Arc;

use tracing::{debug, info, warn};

use fleethub_config::Framing;

pub use self::errors::RegistrationError;
use self::protocol::{ACCEPTED, DENIED, MessageReader, parse_message};
use crate::events::{EventKind, EventLog};
use crate::roster::{Occupancy, Roster};
use crate::transport::{ConnectionHandle, ConnectionHandler, ConnectionStream, SessionId};

const SESSION_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::session");

/// Slot bound to a registered session.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Registration {
    index: usize,
    name: String,
}

/// Runs the registration handshake and read loop for each connection.
pub struct SessionHandler {
    roster: Arc<Roster>,
    events: Arc<dyn EventLog>,
    framing: Framing,
}

impl SessionHandler {
    pub fn new(roster: Arc<Roster>, events: Arc<dyn EventLog>, framing: Framing) -> Self {
        Self {
            roster,
            events,
            framing,
        }
    }

    fn register(
        &self,
        first: &str,
        handle: &ConnectionHandle,
    ) -> Result<Registration, RegistrationError> {
        let Some(message) = parse_message(first) else {
            return Err(RegistrationError::Denied {
                name: first.to_owned(),
            });
        };
        let Some(index) = self.roster.find_slot_by_name(message.name) else {
            return Err(RegistrationError::Denied {
                name: message.name.to_owned(),
            });
        };

        // Held until ACCEPTED is written so a dispatch cannot overtake it.
        let mut writer = handle.lock_writer();
        let occupancy = self
            .roster
            .occupy(index, handle.clone())
            .map_err(RegistrationError::from_roster)?;
        if let Occupancy::Evicted(previous) = occupancy {
            info!(
                target: SESSION_TARGET,
                name = message.name,
                evicted = %previous.session(),
                session = %handle.session(),
                "evicting previous session"
            );
            previous.close();
        }
        if let Err(error) = writer.write_all(ACCEPTED).and_then(|()| writer.flush()) {
            debug!(target: SESSION_TARGET, %error, session = %handle.session(), "failed to send ACCEPTED");
        }
        drop(writer);

        self.events.record(
            EventKind::RegisterAccept,
            format!(
                "{} registered from {} ({})",
                message.name,
                handle.peer(),
                message.payload
            ),
        );
        info!(
            target: SESSION_TARGET,
            slot = index,
            name = message.name,
            peer = %handle.peer(),
            session = %handle.session(),
            "device registered"
        );
        Ok(Registration {
            index,
            name: message.name.to_owned(),
        })
    }

    fn deny(&self, handle: &ConnectionHandle, error: &RegistrationError) {
        if let Err(send_error) = handle.send(DENIED) {
            debug!(target: SESSION_TARGET, error = %send_error, session = %handle.session(), "failed to send DENIED");
        }
        handle.close();
        self.events.record(
            EventKind::RegisterDeny,
            format!("{} from {}", error, handle.peer()),
        );
        warn!(
            target: SESSION_TARGET,
            peer = %handle.peer(),
            session = %handle.session(),
            reason = %error,
            "registration denied"
        );
    }

    fn apply(&self, registration: &Registration, session: SessionId, line: &str) {
        let Some(message) = parse_message(line) else {
            warn!(target: SESSION_TARGET, name = %registration.name, %session, "ignoring message without name prefix");
            return;
        };
        if message.name != registration.name {
            warn!(
                target: SESSION_TARGET,
                name = %registration.name,
                claimed = message.name,
                %session,
                "ignoring message for another device"
            );
            return;
        }
        match self
            .roster
            .update_status(registration.index, session, message.payload)
        {
            Ok(true) => self.events.record(
                EventKind::Message,
                format!("From {}: {}", registration.name, message.payload),
            ),
            Ok(false) => {
                debug!(target: SESSION_TARGET, name = %registration.name, %session, "status from superseded session dropped");
            }
            Err(error) => {
                warn!(target: SESSION_TARGET, %error, name = %registration.name, %session, "status update failed");
            }
        }
    }

    fn close(&self, registration: &Registration, handle: &ConnectionHandle) {
        let session = handle.session();
        let detail = match self.roster.vacate(registration.index, session) {
            Ok(true) => format!("{} disconnected", registration.name),
            Ok(false) => format!("{} disconnected (superseded)", registration.name),
            Err(error) => {
                warn!(target: SESSION_TARGET, %error, name = %registration.name, %session, "failed to vacate slot");
                format!("{} disconnected", registration.name)
            }
        };
        handle.close();
        self.events.record(EventKind::Disconnect, detail);
        info!(
            target: SESSION_TARGET,
            slot = registration.index,
            name = %registration.name,
            %session,
            "device disconnected"
        );
    }
}

impl ConnectionHandler for SessionHandler {
    fn handle(&self, stream: ConnectionStream) {
        let session = stream.session();
        let handle = match stream.handle() {
            Ok(handle) => handle,
            Err(error) => {
                warn!(target: SESSION_TARGET, %error, %session, "failed to prepare connection handle");
                return;
            }
        };
        let mut reader = MessageReader::new(stream, self.framing);

        let first = match reader.next_message() {
            Ok(Some(first)) => first,
            Ok(None) => {
                debug!(target: SESSION_TARGET, %session, "connection closed before registering");
                handle.close();
                return;
            }
            Err(error) => {
                debug!(target: SESSION_TARGET, %error, %session, "read failed before registering");
                handle.close();
                return;
            }
        };

        let registration = match self.register(&first, &handle) {
            Ok(registration) => registration,
            Err(error) => {
                self.deny(&handle, &error);
                return;
            }
        };

        loop {
            match reader.next_message() {
                Ok(Some(line)) => self.apply(&registration, session, &line),
                Ok(None) => break,
                Err(error) => {
                    debug!(target: SESSION_TARGET, %error, %session, "read failed; closing session");
                    break;
                }
            }
        }
        self.close(&registration, &handle);
    }
}
