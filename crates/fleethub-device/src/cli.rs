//! Command-line arguments for the device simulator.

use clap::Parser;
use fleethub_config::DEFAULT_TCP_PORT;

/// Host the simulator dials when none is given.
pub(crate) const DEFAULT_HUB_HOST: &str = "127.0.0.1";

/// Simulated factory device speaking the hub's `name:payload` protocol.
#[derive(Parser, Debug)]
#[command(name = "fleethub-device")]
pub(crate) struct Cli {
    /// Roster name to register as (for example `ARM01`).
    #[arg(value_name = "NAME")]
    pub(crate) name: String,
    /// Hub host name or address.
    #[arg(long, default_value = DEFAULT_HUB_HOST)]
    pub(crate) host: String,
    /// Hub TCP port.
    #[arg(long, default_value_t = DEFAULT_TCP_PORT)]
    pub(crate) port: u16,
}
