//! Shared harness for the hub behavioural suites.

mod config_loader;
mod hub_world;
mod reporter;
mod world;

pub use config_loader::{FailingConfigLoader, TestConfigLoader};
pub use hub_world::{DeviceClient, HubWorld};
pub use reporter::{HealthEvent, RecordingHealthReporter};
pub use world::{TestWorld, world};

use std::thread;
use std::time::{Duration, Instant};

pub const WAIT_TIMEOUT: Duration = Duration::from_secs(2);
pub const POLL_INTERVAL: Duration = Duration::from_millis(10);

pub type StepResult = Result<(), String>;

/// Polls `condition` until it holds or [`WAIT_TIMEOUT`] elapses.
pub fn eventually(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + WAIT_TIMEOUT;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(POLL_INTERVAL);
    }
    condition()
}
