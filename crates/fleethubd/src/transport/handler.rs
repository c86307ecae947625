//! Connection handling abstractions for the hub listener.

use std::fmt;
use std::io::{self, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Identifier assigned to every accepted connection, unique for the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(u64);

impl SessionId {
    pub(crate) const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Raw numeric value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "#{}", self.0)
    }
}

/// Reading side of an accepted connection, owned by exactly one session.
pub struct ConnectionStream {
    session: SessionId,
    peer: SocketAddr,
    stream: TcpStream,
}

impl ConnectionStream {
    /// Wraps an accepted TCP stream.
    pub(crate) fn new(stream: TcpStream, session: SessionId) -> io::Result<Self> {
        let peer = stream.peer_addr()?;
        Ok(Self {
            session,
            peer,
            stream,
        })
    }

    /// Identifier of the session this stream belongs to.
    #[must_use]
    pub fn session(&self) -> SessionId {
        self.session
    }

    /// Remote address of the device.
    #[must_use]
    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    /// Builds the shareable write/close handle for this connection.
    pub fn handle(&self) -> io::Result<ConnectionHandle> {
        let writer = self.stream.try_clone()?;
        let control = self.stream.try_clone()?;
        Ok(ConnectionHandle {
            session: self.session,
            peer: self.peer,
            writer: Arc::new(Mutex::new(writer)),
            control: Arc::new(control),
        })
    }

    /// Independent clone used only to force the connection closed.
    pub(crate) fn control(&self) -> io::Result<TcpStream> {
        self.stream.try_clone()
    }
}

impl Read for ConnectionStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.stream.read(buf)
    }
}

impl fmt::Debug for ConnectionStream {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("ConnectionStream")
            .field("session", &self.session)
            .field("peer", &self.peer)
            .finish_non_exhaustive()
    }
}

/// Shareable handle onto a live connection.
///
/// The roster keeps a clone so the command dispatcher can write to the
/// device. Holding a handle never implies ownership: only the session that
/// accepted the connection decides when it ends. Writes are serialised, and
/// [`ConnectionHandle::lock_writer`] lets the session hold the write side
/// across publication so nothing overtakes its handshake reply.
#[derive(Clone)]
pub struct ConnectionHandle {
    session: SessionId,
    peer: SocketAddr,
    writer: Arc<Mutex<TcpStream>>,
    control: Arc<TcpStream>,
}

impl ConnectionHandle {
    /// Session owning the connection.
    #[must_use]
    pub fn session(&self) -> SessionId {
        self.session
    }

    /// Remote address of the device.
    #[must_use]
    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    /// Writes `bytes` in full with a single blocking attempt.
    pub fn send(&self, bytes: &[u8]) -> io::Result<()> {
        let mut writer = self.lock_writer();
        writer.write_all(bytes)?;
        writer.flush()
    }

    /// Exclusive access to the write side.
    pub fn lock_writer(&self) -> MutexGuard<'_, TcpStream> {
        self.writer.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Shuts the connection down in both directions.
    ///
    /// The owning session observes end-of-stream on its next read.
    pub fn close(&self) {
        shutdown_quietly(&self.control);
    }

    /// Shuts down only the write direction; later sends fail.
    pub fn close_write(&self) {
        if let Err(error) = self.control.shutdown(Shutdown::Write)
            && error.kind() != io::ErrorKind::NotConnected
        {
            tracing::debug!(
                target: super::TRANSPORT_TARGET,
                %error,
                session = %self.session,
                "write shutdown failed"
            );
        }
    }
}

impl fmt::Debug for ConnectionHandle {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("ConnectionHandle")
            .field("session", &self.session)
            .field("peer", &self.peer)
            .finish_non_exhaustive()
    }
}

pub(crate) fn shutdown_quietly(stream: &TcpStream) {
    if let Err(error) = stream.shutdown(Shutdown::Both)
        && error.kind() != io::ErrorKind::NotConnected
    {
        tracing::debug!(
            target: super::TRANSPORT_TARGET,
            %error,
            "connection shutdown failed"
        );
    }
}

/// Handles accepted socket connections.
pub trait ConnectionHandler: Send + Sync + 'static {
    /// Handles a single connection until it ends. Implementations should
    /// avoid panicking.
    fn handle(&self, stream: ConnectionStream);
}
