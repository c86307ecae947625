//! Operator console: live dashboard plus command entry.
//!
//! The snapshot reader renders the roster on a fixed period from its own
//! thread; [`Console::run`] reads keys on the calling thread and dispatches
//! commands synchronously. Both share the [`ConsoleState`] behind a mutex.

mod input;
mod render;
mod snapshot;
mod state;

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use thiserror::Error;
use tracing::debug;

pub use self::input::{CrosstermInput, InputSource};
pub use self::render::{Frame, Renderer, TerminalRenderer};
pub use self::snapshot::{SnapshotReader, SnapshotSource};
pub use self::state::{
    Action, ConsoleState, ConsoleView, Key, Mode, Outcome, OutcomeStatus,
};
use crate::dispatch::CommandDispatcher;

const CONSOLE_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::console");

/// How long a key poll blocks before the stop flag is rechecked.
const INPUT_POLL: Duration = Duration::from_millis(50);

/// Errors raised by the terminal console.
#[derive(Debug, Error)]
pub enum ConsoleError {
    #[error("failed to prepare terminal: {source}")]
    Terminal {
        #[source]
        source: io::Error,
    },
    #[error("failed to read terminal input: {source}")]
    Input {
        #[source]
        source: io::Error,
    },
    #[error("failed to draw dashboard: {source}")]
    Render {
        #[source]
        source: io::Error,
    },
    #[error("failed to spawn snapshot reader: {source}")]
    Spawn {
        #[source]
        source: io::Error,
    },
    #[error("snapshot reader panicked")]
    ThreadPanic,
}

/// Key loop driving the console state and the dispatcher.
pub struct Console<I> {
    input: I,
    state: Arc<Mutex<ConsoleState>>,
    dispatcher: Arc<CommandDispatcher>,
}

impl<I: InputSource> Console<I> {
    pub fn new(
        input: I,
        state: Arc<Mutex<ConsoleState>>,
        dispatcher: Arc<CommandDispatcher>,
    ) -> Self {
        Self {
            input,
            state,
            dispatcher,
        }
    }

    /// Runs until the operator quits or `stop` is raised.
    pub fn run(&mut self, stop: &AtomicBool) -> Result<(), ConsoleError> {
        while !stop.load(Ordering::SeqCst) {
            let Some(key) = self.input.next_key(INPUT_POLL)? else {
                continue;
            };
            let action = self.lock_state().handle_key(key);
            match action {
                Action::None => {}
                Action::Quit => {
                    debug!(target: CONSOLE_TARGET, "operator requested shutdown");
                    return Ok(());
                }
                Action::Dispatch { index, command } => {
                    let result = self.dispatcher.dispatch(index, &command);
                    self.lock_state().record_outcome(index, &result);
                }
            }
        }
        Ok(())
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, ConsoleState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
