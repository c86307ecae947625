//! Listener implementation for device sessions.

use std::io;
use std::net::{SocketAddr, TcpListener, TcpStream, ToSocketAddrs};
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use std::thread;
use std::time::Duration;

use tracing::{debug, info, warn};

use fleethub_config::ListenEndpoint;

use crate::events::{EventKind, EventLog};

use super::handler::shutdown_quietly;
use super::{ConnectionHandler, ConnectionStream, ListenerError, SessionId, TRANSPORT_TARGET};

const ACCEPT_BACKOFF: Duration = Duration::from_millis(25);
const ERROR_BACKOFF: Duration = Duration::from_millis(150);

/// Listener bound to the hub's TCP endpoint.
#[derive(Debug)]
pub(crate) struct SocketListener {
    endpoint: ListenEndpoint,
    listener: TcpListener,
}

impl SocketListener {
    pub(crate) fn bind(endpoint: &ListenEndpoint) -> Result<Self, ListenerError> {
        let listener = bind_tcp(endpoint.host(), endpoint.port())?;
        Ok(Self {
            endpoint: endpoint.clone(),
            listener,
        })
    }

    /// Address actually bound; differs from the endpoint when port 0 was requested.
    pub(crate) fn local_addr(&self) -> Result<SocketAddr, ListenerError> {
        self.listener
            .local_addr()
            .map_err(|source| ListenerError::LocalAddr { source })
    }

    pub(crate) fn start(
        self,
        handler: Arc<dyn ConnectionHandler>,
        events: Arc<dyn EventLog>,
    ) -> Result<ListenerHandle, ListenerError> {
        self.listener
            .set_nonblocking(true)
            .map_err(|source| ListenerError::NonBlocking { source })?;
        let shutdown = Arc::new(AtomicBool::new(false));
        let shutdown_flag = Arc::clone(&shutdown);
        let handle = thread::Builder::new()
            .name("hub-listener".to_owned())
            .spawn(move || {
                let mut sessions = SessionThreads::default();
                run_accept_loop(&self, &shutdown_flag, &handler, &*events, &mut sessions);
                sessions.close_all();
            })
            .map_err(|source| ListenerError::Spawn { source })?;
        Ok(ListenerHandle {
            shutdown,
            handle: Some(handle),
        })
    }
}

/// Handle to the background listener thread.
pub(crate) struct ListenerHandle {
    shutdown: Arc<AtomicBool>,
    handle: Option<thread::JoinHandle<()>>,
}

impl ListenerHandle {
    pub(crate) fn shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }

    /// Waits for the accept loop and every session it spawned to finish.
    ///
    /// Live sessions are closed from the listener thread once shutdown is
    /// requested, so this returns even when devices are still connected.
    pub(crate) fn join(mut self) -> Result<(), ListenerError> {
        if let Some(handle) = self.handle.take() {
            match handle.join() {
                Ok(()) => Ok(()),
                Err(_) => Err(ListenerError::ThreadPanic),
            }
        } else {
            Ok(())
        }
    }
}

impl Drop for ListenerHandle {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }
}

/// Session threads spawned by the accept loop, with a control clone of each
/// connection so shutdown can unblock their reads.
#[derive(Default)]
struct SessionThreads {
    live: Vec<(thread::JoinHandle<()>, TcpStream)>,
}

impl SessionThreads {
    fn track(&mut self, handle: thread::JoinHandle<()>, control: TcpStream) {
        self.reap();
        self.live.push((handle, control));
    }

    fn reap(&mut self) {
        let (finished, live): (Vec<_>, Vec<_>) = self
            .live
            .drain(..)
            .partition(|(handle, _)| handle.is_finished());
        self.live = live;
        for (handle, _) in finished {
            join_session(handle);
        }
    }

    fn close_all(&mut self) {
        for (_, control) in &self.live {
            shutdown_quietly(control);
        }
        for (handle, _) in self.live.drain(..) {
            join_session(handle);
        }
    }
}

fn join_session(handle: thread::JoinHandle<()>) {
    if handle.join().is_err() {
        warn!(target: TRANSPORT_TARGET, "session thread panicked");
    }
}

fn run_accept_loop(
    listener: &SocketListener,
    shutdown: &AtomicBool,
    handler: &Arc<dyn ConnectionHandler>,
    events: &dyn EventLog,
    sessions: &mut SessionThreads,
) {
    info!(
        target: TRANSPORT_TARGET,
        endpoint = %listener.endpoint,
        "device listener active"
    );
    let mut next_session = 1_u64;
    let mut last_error = None::<io::ErrorKind>;
    while !shutdown.load(Ordering::SeqCst) {
        match accept_connection(listener) {
            Ok(Some(stream)) => {
                last_error = None;
                let session = SessionId::new(next_session);
                next_session += 1;
                spawn_session(stream, session, handler, events, sessions);
            }
            Ok(None) => {
                thread::sleep(ACCEPT_BACKOFF);
            }
            Err(error) => {
                let kind = error.kind();
                if last_error != Some(kind) {
                    warn!(
                        target: TRANSPORT_TARGET,
                        error = %error,
                        "socket accept error"
                    );
                }
                last_error = Some(kind);
                thread::sleep(ERROR_BACKOFF);
            }
        }
    }
    debug!(
        target: TRANSPORT_TARGET,
        live = sessions.live.len(),
        "listener stopping; closing live sessions"
    );
}

fn spawn_session(
    stream: TcpStream,
    session: SessionId,
    handler: &Arc<dyn ConnectionHandler>,
    events: &dyn EventLog,
    sessions: &mut SessionThreads,
) {
    let connection = match ConnectionStream::new(stream, session) {
        Ok(connection) => connection,
        Err(error) => {
            warn!(target: TRANSPORT_TARGET, %error, %session, "dropping unusable connection");
            return;
        }
    };
    events.record(
        EventKind::ConnectAttempt,
        format!("New connection {session} from {}", connection.peer()),
    );
    let control = match connection.control() {
        Ok(control) => control,
        Err(error) => {
            warn!(target: TRANSPORT_TARGET, %error, %session, "dropping unusable connection");
            return;
        }
    };
    let handler = Arc::clone(handler);
    let spawned = thread::Builder::new()
        .name(format!("session-{}", session.get()))
        .spawn(move || handler.handle(connection));
    match spawned {
        Ok(handle) => sessions.track(handle, control),
        Err(error) => {
            warn!(target: TRANSPORT_TARGET, %error, %session, "failed to spawn session thread");
            shutdown_quietly(&control);
        }
    }
}

fn accept_connection(listener: &SocketListener) -> Result<Option<TcpStream>, io::Error> {
    match listener.listener.accept() {
        Ok((stream, _)) => {
            stream.set_nonblocking(false)?;
            Ok(Some(stream))
        }
        Err(error) if error.kind() == io::ErrorKind::WouldBlock => Ok(None),
        Err(error) => Err(error),
    }
}

fn bind_tcp(host: &str, port: u16) -> Result<TcpListener, ListenerError> {
    let mut addrs = (host, port)
        .to_socket_addrs()
        .map_err(|source| ListenerError::Resolve {
            host: host.to_owned(),
            port,
            source,
        })?;
    let addr = addrs
        .find(|addr| matches!(addr, SocketAddr::V4(_) | SocketAddr::V6(_)))
        .ok_or_else(|| ListenerError::ResolveEmpty {
            host: host.to_owned(),
            port,
        })?;
    TcpListener::bind(addr).map_err(|source| ListenerError::BindTcp { addr, source })
}
