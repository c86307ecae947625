//! Configuration for the fleethub server.
//!
//! Values are layered by `ortho_config`: built-in defaults, then the file
//! named by `--config-path`, then `FLEETHUB_*` environment variables, then
//! command-line flags. Only the hub loads [`Config`]; the device simulator
//! takes [`DEFAULT_TCP_PORT`] from here so both sides default to one port.

use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};

mod defaults;
mod endpoint;
mod logging;
mod policy;

pub use defaults::{
    DEFAULT_EVENT_LOG_PATH, DEFAULT_LISTEN_HOST, DEFAULT_LOG_FILTER, DEFAULT_RENDER_INTERVAL_MS,
    DEFAULT_ROSTER, DEFAULT_TCP_PORT, default_event_log_path, default_listen_endpoint,
    default_log_filter, default_log_filter_string, default_log_format,
};
pub use endpoint::{EndpointParseError, ListenEndpoint};
pub use logging::{LogFormat, LogFormatParseError};
pub use policy::{DuplicatePolicy, Framing, PolicyParseError};

/// Resolved hub configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, OrthoConfig)]
#[ortho_config(prefix = "FLEETHUB")]
pub struct Config {
    /// Address the hub listens on for device sessions.
    #[ortho_config(default = defaults::default_listen_endpoint())]
    pub listen: ListenEndpoint,
    /// `tracing` filter expression for diagnostic logs.
    #[ortho_config(default = defaults::default_log_filter_string())]
    pub log_filter: String,
    /// Diagnostic log output format.
    #[ortho_config(default = defaults::default_log_format())]
    pub log_format: LogFormat,
    /// Diagnostic log destination; stderr when absent.
    pub log_file: Option<Utf8PathBuf>,
    /// Event log file, truncated at every start.
    #[ortho_config(default = defaults::default_event_log_path())]
    pub event_log_path: Utf8PathBuf,
    /// Handling of a second registration for an occupied slot.
    #[ortho_config(default = DuplicatePolicy::Reject)]
    pub duplicate_policy: DuplicatePolicy,
    /// Inbound message framing.
    #[ortho_config(default = Framing::Chunk)]
    pub framing: Framing,
    /// Dashboard refresh period in milliseconds.
    #[ortho_config(default = defaults::DEFAULT_RENDER_INTERVAL_MS)]
    pub render_interval_ms: u64,
    /// Run without the operator console.
    #[ortho_config(default = false)]
    pub headless: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen: default_listen_endpoint(),
            log_filter: default_log_filter_string(),
            log_format: default_log_format(),
            log_file: None,
            event_log_path: default_event_log_path(),
            duplicate_policy: DuplicatePolicy::default(),
            framing: Framing::default(),
            render_interval_ms: DEFAULT_RENDER_INTERVAL_MS,
            headless: false,
        }
    }
}

impl Config {
    /// Address the hub listens on.
    #[must_use]
    pub fn listen(&self) -> &ListenEndpoint {
        &self.listen
    }

    /// Diagnostic log filter expression.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        &self.log_filter
    }

    /// Diagnostic log format.
    #[must_use]
    pub fn log_format(&self) -> LogFormat {
        self.log_format
    }

    /// Diagnostic log file, when configured.
    #[must_use]
    pub fn log_file(&self) -> Option<&Utf8Path> {
        self.log_file.as_deref()
    }

    /// Event log file path.
    #[must_use]
    pub fn event_log_path(&self) -> &Utf8Path {
        &self.event_log_path
    }

    /// Duplicate registration policy.
    #[must_use]
    pub fn duplicate_policy(&self) -> DuplicatePolicy {
        self.duplicate_policy
    }

    /// Inbound framing mode.
    #[must_use]
    pub fn framing(&self) -> Framing {
        self.framing
    }

    /// Dashboard refresh period. Never zero.
    #[must_use]
    pub fn render_interval(&self) -> Duration {
        Duration::from_millis(self.render_interval_ms.max(1))
    }

    /// Whether the operator console is disabled.
    #[must_use]
    pub fn headless(&self) -> bool {
        self.headless
    }
}
