//! Test configuration loaders for scenarios covering success and failure paths.

use std::ffi::OsString;
use std::sync::Arc;

use camino::Utf8PathBuf;
use ortho_config::{OrthoConfig, OrthoError};
use tempfile::TempDir;

use fleethub_config::{Config, DuplicatePolicy, Framing, ListenEndpoint};

use crate::bootstrap::ConfigLoader;

/// Loader that binds loopback on an ephemeral port and keeps the event log
/// under a temporary directory.
#[derive(Clone)]
pub struct TestConfigLoader {
    dir: Arc<TempDir>,
    listen: ListenEndpoint,
    policy: DuplicatePolicy,
    framing: Framing,
}

impl TestConfigLoader {
    #[must_use]
    pub fn new() -> Self {
        let dir = TempDir::new().expect("failed to create temporary directory for event log");
        Self {
            dir: Arc::new(dir),
            listen: ListenEndpoint::new("127.0.0.1", 0),
            policy: DuplicatePolicy::Reject,
            framing: Framing::Chunk,
        }
    }

    #[must_use]
    pub fn with_policy(mut self, policy: DuplicatePolicy) -> Self {
        self.policy = policy;
        self
    }

    #[must_use]
    pub fn with_listen(mut self, listen: ListenEndpoint) -> Self {
        self.listen = listen;
        self
    }

    /// Location of the event log written by hubs using this loader.
    #[must_use]
    pub fn event_log_path(&self) -> Utf8PathBuf {
        let path = self.dir.path().join("factory.log");
        Utf8PathBuf::from_path_buf(path).expect("temporary event log path was not valid UTF-8")
    }
}

impl Default for TestConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader for TestConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Ok(Config {
            listen: self.listen.clone(),
            event_log_path: self.event_log_path(),
            duplicate_policy: self.policy,
            framing: self.framing,
            headless: true,
            ..Config::default()
        })
    }
}

/// Loader that intentionally fails by passing an unsupported listen scheme.
pub struct FailingConfigLoader;

impl ConfigLoader for FailingConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        let args = vec![
            OsString::from("fleethubd"),
            OsString::from("--listen"),
            OsString::from("unix://hub.sock"),
        ];
        Config::load_from_iter(args)
    }
}
