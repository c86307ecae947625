//! Supervises hub launch sequencing and runtime orchestration.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

use tracing::{info, warn};

use crate::StructuredHealthReporter;
use crate::bootstrap::{ConfigLoader, Hub, SystemConfigLoader, bootstrap_with};
use crate::console::{
    Console, ConsoleState, CrosstermInput, SnapshotReader, SnapshotSource, TerminalRenderer,
};
use crate::dispatch::CommandDispatcher;
use crate::events::EventKind;
use crate::health::HealthReporter;
use crate::session::SessionHandler;
use crate::transport::SocketListener;

use super::PROCESS_TARGET;
use super::errors::LaunchError;
use super::shutdown::{ShutdownSignal, SystemShutdownSignal};

/// Process-level collaborators needed to control the hub lifecycle.
pub(crate) struct ProcessControl<S> {
    pub(crate) shutdown: S,
}

/// Service dependencies required to construct the hub runtime.
pub(crate) struct ServiceDeps<L> {
    pub(crate) loader: L,
    pub(crate) reporter: Arc<dyn HealthReporter>,
}

/// Collaborators required to launch the hub runtime.
pub(crate) struct LaunchPlan<L, S> {
    pub(crate) process: ProcessControl<S>,
    pub(crate) services: ServiceDeps<L>,
}

/// Runs the hub using the production collaborators.
pub fn run_server() -> Result<(), LaunchError> {
    let plan = LaunchPlan {
        process: ProcessControl {
            shutdown: SystemShutdownSignal::new(),
        },
        services: ServiceDeps {
            loader: SystemConfigLoader,
            reporter: Arc::new(StructuredHealthReporter::new()),
        },
    };
    run_server_with(plan)
}

/// Runs the hub with injected collaborators.
///
/// Headless configurations block on `shutdown`; interactive ones run the
/// operator console until the operator quits or `shutdown` fires.
pub(crate) fn run_server_with<L, S>(plan: LaunchPlan<L, S>) -> Result<(), LaunchError>
where
    L: ConfigLoader,
    S: ShutdownSignal + 'static,
{
    let LaunchPlan { process, services } = plan;
    let ProcessControl { shutdown } = process;
    let ServiceDeps { loader, reporter } = services;

    let hub = bootstrap_with(&loader, &*reporter)?;
    let config = hub.config();
    let listener = SocketListener::bind(config.listen())?;
    let local = listener.local_addr()?;
    let events = hub.events();
    let roster = hub.roster();
    events.record(EventKind::ServerStart, format!("Listening on {local}"));

    let handler = Arc::new(SessionHandler::new(
        Arc::clone(&roster),
        Arc::clone(&events),
        config.framing(),
    ));
    let listener_handle = listener.start(handler, Arc::clone(&events))?;
    reporter.listener_ready(local);
    info!(
        target: PROCESS_TARGET,
        %local,
        headless = config.headless(),
        "hub running"
    );

    let outcome = if config.headless() {
        shutdown.wait().map_err(LaunchError::from)
    } else {
        run_console(&hub, local, shutdown)
    };

    reporter.shutdown_requested();
    listener_handle.shutdown();
    let closed = roster.close_all();
    let joined = listener_handle.join();
    events.record(
        EventKind::ServerStop,
        format!("Server stopped; closed {closed} live session(s)"),
    );
    reporter.shutdown_completed();
    info!(target: PROCESS_TARGET, "shutdown sequence completed");

    outcome?;
    joined?;
    Ok(())
}

fn run_console<S>(hub: &Hub, local: SocketAddr, shutdown: S) -> Result<(), LaunchError>
where
    S: ShutdownSignal + 'static,
{
    let stop = Arc::new(AtomicBool::new(false));
    spawn_signal_watcher(shutdown, Arc::clone(&stop))?;

    let roster = hub.roster();
    let state = Arc::new(Mutex::new(ConsoleState::new(roster.len())));
    let renderer = TerminalRenderer::new()?;
    let source = SnapshotSource {
        roster: Arc::clone(&roster),
        console: Arc::clone(&state),
        listen: local.to_string(),
    };
    let reader = SnapshotReader::spawn(source, Box::new(renderer), hub.config().render_interval())?;
    let dispatcher = Arc::new(CommandDispatcher::new(roster, hub.events()));

    let ran = Console::new(CrosstermInput, state, dispatcher).run(&stop);
    let stopped = reader.stop();
    ran?;
    stopped?;
    Ok(())
}

/// Raises `stop` when a termination signal arrives.
///
/// The watcher is detached: when the operator quits first it stays blocked
/// until the process exits.
fn spawn_signal_watcher<S>(shutdown: S, stop: Arc<AtomicBool>) -> Result<(), LaunchError>
where
    S: ShutdownSignal + 'static,
{
    thread::Builder::new()
        .name("signal-watcher".to_owned())
        .spawn(move || {
            if let Err(error) = shutdown.wait() {
                warn!(target: PROCESS_TARGET, %error, "signal watcher failed; use Ctrl+C to quit");
                return;
            }
            stop.store(true, Ordering::SeqCst);
        })
        .map(|_| ())
        .map_err(|source| LaunchError::SignalWatcher { source })
}
