//! Fleet monitoring hub.
//!
//! The hub accepts TCP connections from a fixed roster of factory devices.
//! Each device registers with a single `name:payload` message and then
//! streams status updates over the same connection. The hub keeps the latest
//! status of every roster slot in a shared table, appends notable events to
//! a plain-text log, and lets an operator send short commands to connected
//! devices from a terminal console.
//!
//! Startup runs through [`bootstrap_with`]: configuration is resolved by
//! `ortho_config`, structured telemetry is installed, the event log is
//! truncated, and the roster is allocated. [`run_server`] then binds the
//! listener, spawns one thread per connection, and either drives the
//! operator console or, when headless, waits for a termination signal.
//!
//! Every roster slot is guarded by one mutex. Sessions write their own slot,
//! the dispatcher copies a connection handle out before writing to a device,
//! and the dashboard reads a consistent snapshot of the whole table once per
//! refresh period.

mod bootstrap;
pub mod console;
mod dispatch;
mod events;
mod health;
mod process;
mod roster;
mod session;
mod telemetry;
mod transport;

pub use bootstrap::{
    BootstrapError, ConfigLoader, Hub, StaticConfigLoader, SystemConfigLoader, bootstrap_with,
};
pub use dispatch::{
    COMMAND_CAPACITY, CommandDispatcher, DispatchFailure, is_command_char, normalise_command,
};
pub use events::{EventKind, EventLog, EventLogError, EventRecord, FileEventLog, MemoryEventLog};
pub use health::{HealthReporter, StructuredHealthReporter};
pub use process::{
    LaunchError, ShutdownError, ShutdownSignal, SystemShutdownSignal, run_server,
};
pub use roster::{ERROR_STATUS, Occupancy, Roster, RosterError, STATUS_CAPACITY, SlotView};
pub use session::{RegistrationError, SessionHandler, protocol};
pub use telemetry::TelemetryError;
pub use transport::{
    ConnectionHandle, ConnectionHandler, ConnectionStream, ListenerError, SessionId,
};

#[cfg(test)]
mod tests;
