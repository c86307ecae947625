//! Defines the unified error surface for hub launch and supervision.

use std::io;

use thiserror::Error;

use crate::bootstrap::BootstrapError;
use crate::console::ConsoleError;
use crate::transport::ListenerError;

use super::shutdown::ShutdownError;

/// Errors surfaced while launching or supervising the hub process.
#[derive(Debug, Error)]
pub enum LaunchError {
    /// Bootstrapping the hub failed.
    #[error("hub bootstrap failed: {source}")]
    Bootstrap {
        /// Underlying bootstrap error.
        #[source]
        source: BootstrapError,
    },
    /// Binding or running the device listener failed.
    #[error("device listener failed: {source}")]
    Listener {
        /// Underlying listener error.
        #[source]
        source: ListenerError,
    },
    /// Waiting for shutdown failed.
    #[error("failed to await shutdown signal: {source}")]
    Shutdown {
        /// Underlying shutdown error.
        #[source]
        source: ShutdownError,
    },
    /// The operator console failed.
    #[error("operator console failed: {source}")]
    Console {
        /// Underlying console error.
        #[source]
        source: ConsoleError,
    },
    /// The signal watcher thread could not be started.
    #[error("failed to spawn signal watcher: {source}")]
    SignalWatcher {
        #[source]
        source: io::Error,
    },
}

impl From<BootstrapError> for LaunchError {
    fn from(source: BootstrapError) -> Self {
        Self::Bootstrap { source }
    }
}

impl From<ListenerError> for LaunchError {
    fn from(source: ListenerError) -> Self {
        Self::Listener { source }
    }
}

impl From<ShutdownError> for LaunchError {
    fn from(source: ShutdownError) -> Self {
        Self::Shutdown { source }
    }
}

impl From<ConsoleError> for LaunchError {
    fn from(source: ConsoleError) -> Self {
        Self::Console { source }
    }
}
