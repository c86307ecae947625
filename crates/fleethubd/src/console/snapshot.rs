//! Periodic snapshot reader driving the renderer.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::Duration;

use tracing::{debug, warn};

use super::render::{Frame, Renderer};
use super::state::ConsoleState;
use super::{CONSOLE_TARGET, ConsoleError};
use crate::roster::Roster;

/// Inputs shared between the console and the snapshot reader.
#[derive(Clone)]
pub struct SnapshotSource {
    pub roster: Arc<Roster>,
    pub console: Arc<Mutex<ConsoleState>>,
    pub listen: String,
}

impl SnapshotSource {
    /// Builds the frame for `tick`. Reads only.
    #[must_use]
    pub fn frame(&self, tick: u64) -> Frame {
        let console = self
            .console
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .view();
        Frame {
            slots: self.roster.snapshot(),
            console,
            listen: self.listen.clone(),
            tick,
        }
    }
}

/// Background thread rendering a fresh frame every interval.
pub struct SnapshotReader {
    shutdown: Arc<AtomicBool>,
    handle: Option<thread::JoinHandle<()>>,
}

impl SnapshotReader {
    pub fn spawn(
        source: SnapshotSource,
        mut renderer: Box<dyn Renderer>,
        interval: Duration,
    ) -> Result<Self, ConsoleError> {
        let shutdown = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&shutdown);
        let handle = thread::Builder::new()
            .name("snapshot-reader".to_owned())
            .spawn(move || run_reader(&source, renderer.as_mut(), interval, &flag))
            .map_err(|source| ConsoleError::Spawn { source })?;
        Ok(Self {
            shutdown,
            handle: Some(handle),
        })
    }

    /// Stops the reader and waits for it; the renderer is dropped on exit.
    pub fn stop(mut self) -> Result<(), ConsoleError> {
        self.shutdown.store(true, Ordering::SeqCst);
        match self.handle.take() {
            Some(handle) => handle.join().map_err(|_| ConsoleError::ThreadPanic),
            None => Ok(()),
        }
    }
}

impl Drop for SnapshotReader {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }
}

fn run_reader(
    source: &SnapshotSource,
    renderer: &mut dyn Renderer,
    interval: Duration,
    shutdown: &AtomicBool,
) {
    let mut tick = 0_u64;
    let mut failing = false;
    while !shutdown.load(Ordering::SeqCst) {
        match renderer.render(&source.frame(tick)) {
            Ok(()) => failing = false,
            Err(error) => {
                if !failing {
                    warn!(target: CONSOLE_TARGET, %error, "dashboard render failed");
                }
                failing = true;
            }
        }
        tick = tick.wrapping_add(1);
        thread::sleep(interval);
    }
    debug!(target: CONSOLE_TARGET, frames = tick, "snapshot reader stopped");
}
