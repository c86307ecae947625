//! TCP listener for device connections.
//!
//! The transport module binds the configured endpoint, accepts connections in
//! a background thread, and hands each one to a [`ConnectionHandler`] on its
//! own session thread. The listener keeps track of every session it spawned
//! so shutdown can close their sockets and wait for them.

mod errors;
mod handler;
mod listener;
#[cfg(test)]
mod test_utils;

pub use self::errors::ListenerError;
pub use self::handler::{ConnectionHandle, ConnectionHandler, ConnectionStream, SessionId};
pub(crate) use self::listener::SocketListener;
#[cfg(test)]
pub(crate) use self::listener::ListenerHandle;
#[cfg(test)]
pub(crate) use self::test_utils::{CountingHandler, DrainingHandler, connected_pair};

const TRANSPORT_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::transport");
