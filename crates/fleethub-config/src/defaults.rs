use camino::Utf8PathBuf;

use crate::endpoint::ListenEndpoint;

/// Default TCP port devices connect to.
pub const DEFAULT_TCP_PORT: u16 = 8080;

/// Default bind host; accepts devices on every interface.
pub const DEFAULT_LISTEN_HOST: &str = "0.0.0.0";

/// Default log filter expression used by the binaries.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Default event log file, relative to the working directory.
pub const DEFAULT_EVENT_LOG_PATH: &str = "factory.log";

/// Default period between dashboard snapshots, in milliseconds.
pub const DEFAULT_RENDER_INTERVAL_MS: u64 = 100;

/// Fixed roster of recognised device identities.
///
/// The position of a name is its slot index; the console and the command
/// dispatcher address slots by index, so the order is part of the contract.
pub const DEFAULT_ROSTER: [&str; 10] = [
    "ARM01", "TEMP02", "BUTTON01", "LED01", "sensor01", "sensor02", "sensor03", "sensor04",
    "sensor05", "sensor06",
];

/// Default log filter expression used by the binaries.
pub fn default_log_filter() -> &'static str {
    DEFAULT_LOG_FILTER
}

/// Owned log filter value used where allocation is required (e.g. serde).
pub fn default_log_filter_string() -> String {
    DEFAULT_LOG_FILTER.to_owned()
}

/// Default logging format for the binaries.
pub fn default_log_format() -> crate::logging::LogFormat {
    crate::logging::LogFormat::Compact
}

/// Computes the default listen endpoint for the hub.
pub fn default_listen_endpoint() -> ListenEndpoint {
    ListenEndpoint::new(DEFAULT_LISTEN_HOST, DEFAULT_TCP_PORT)
}

/// Default event log location.
pub fn default_event_log_path() -> Utf8PathBuf {
    Utf8PathBuf::from(DEFAULT_EVENT_LOG_PATH)
}
