//! Hub bootstrap orchestration.

use std::sync::Arc;

use ortho_config::{OrthoConfig, OrthoError};
use thiserror::Error;

use fleethub_config::{Config, DEFAULT_ROSTER};

use crate::events::{EventLog, EventLogError, FileEventLog};
use crate::health::HealthReporter;
use crate::roster::Roster;
use crate::telemetry::{self, TelemetryError};

/// Trait abstracting configuration loading for testability.
pub trait ConfigLoader: Send + Sync {
    /// Loads the hub configuration.
    fn load(&self) -> Result<Config, Arc<OrthoError>>;
}

/// Loader that delegates to [`OrthoConfig::load`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemConfigLoader;

impl ConfigLoader for SystemConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Config::load()
    }
}

/// Loader returning a configuration resolved elsewhere.
#[derive(Debug, Clone)]
pub struct StaticConfigLoader {
    config: Config,
}

impl StaticConfigLoader {
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self { config }
    }
}

impl ConfigLoader for StaticConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Ok(self.config.clone())
    }
}

/// Errors surfaced during bootstrap.
#[derive(Debug, Error)]
pub enum BootstrapError {
    /// Configuration failed to load.
    #[error("failed to load configuration: {source}")]
    Configuration {
        /// Underlying loader error.
        #[source]
        source: Arc<OrthoError>,
    },
    /// Telemetry initialisation failed.
    #[error("failed to initialise telemetry: {source}")]
    Telemetry {
        /// Underlying telemetry error.
        #[source]
        source: TelemetryError,
    },
    /// The event log could not be created.
    #[error("failed to open event log: {source}")]
    EventLog {
        #[source]
        source: EventLogError,
    },
}

/// Shared state assembled by a successful bootstrap.
pub struct Hub {
    config: Config,
    roster: Arc<Roster>,
    events: Arc<FileEventLog>,
}

impl Hub {
    /// Accessor for the resolved configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Shared slot table.
    #[must_use]
    pub fn roster(&self) -> Arc<Roster> {
        Arc::clone(&self.roster)
    }

    /// Shared event sink.
    #[must_use]
    pub fn events(&self) -> Arc<dyn EventLog> {
        self.events.clone()
    }
}

/// Bootstraps the hub using the supplied collaborators.
///
/// Loads configuration, installs telemetry, truncates the event log, and
/// allocates the roster from [`DEFAULT_ROSTER`].
pub fn bootstrap_with(
    loader: &dyn ConfigLoader,
    reporter: &dyn HealthReporter,
) -> Result<Hub, BootstrapError> {
    reporter.bootstrap_starting();
    match assemble(loader) {
        Ok(hub) => {
            reporter.bootstrap_succeeded(&hub.config);
            Ok(hub)
        }
        Err(error) => {
            reporter.bootstrap_failed(&error);
            Err(error)
        }
    }
}

fn assemble(loader: &dyn ConfigLoader) -> Result<Hub, BootstrapError> {
    let config = loader
        .load()
        .map_err(|source| BootstrapError::Configuration { source })?;
    telemetry::initialise(&config).map_err(|source| BootstrapError::Telemetry { source })?;
    let events = FileEventLog::create(config.event_log_path())
        .map_err(|source| BootstrapError::EventLog { source })?;
    let roster = Roster::new(DEFAULT_ROSTER, config.duplicate_policy());
    Ok(Hub {
        config,
        roster: Arc::new(roster),
        events: Arc::new(events),
    })
}
