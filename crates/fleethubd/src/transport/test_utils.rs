//! Test helpers for the transport module.

use std::net::{TcpListener, TcpStream};
use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use super::{ConnectionHandler, ConnectionStream, SessionId};

pub(crate) struct CountingHandler {
    count: Arc<AtomicUsize>,
}

impl CountingHandler {
    pub(crate) fn new() -> (Arc<AtomicUsize>, Arc<Self>) {
        let count = Arc::new(AtomicUsize::new(0));
        let handler = Arc::new(Self {
            count: Arc::clone(&count),
        });
        (count, handler)
    }
}

impl ConnectionHandler for CountingHandler {
    fn handle(&self, _stream: ConnectionStream) {
        self.count.fetch_add(1, Ordering::SeqCst);
    }
}

/// Handler that blocks reading until the peer or the listener closes the
/// connection, then counts the session as finished.
pub(crate) struct DrainingHandler {
    finished: Arc<AtomicUsize>,
}

impl DrainingHandler {
    pub(crate) fn new() -> (Arc<AtomicUsize>, Arc<Self>) {
        let finished = Arc::new(AtomicUsize::new(0));
        let handler = Arc::new(Self {
            finished: Arc::clone(&finished),
        });
        (finished, handler)
    }
}

impl ConnectionHandler for DrainingHandler {
    fn handle(&self, mut stream: ConnectionStream) {
        let _ = std::io::copy(&mut stream, &mut std::io::sink());
        self.finished.fetch_add(1, Ordering::SeqCst);
    }
}

/// Accepted server-side stream plus the client socket connected to it.
pub(crate) fn connected_pair(session: u64) -> (ConnectionStream, TcpStream) {
    let listener = TcpListener::bind(("127.0.0.1", 0)).expect("bind listener");
    let addr = listener.local_addr().expect("listener address");
    let client = TcpStream::connect(addr).expect("connect client");
    let (server, _) = listener.accept().expect("accept connection");
    let stream = ConnectionStream::new(server, SessionId::new(session)).expect("wrap stream");
    (stream, client)
}
