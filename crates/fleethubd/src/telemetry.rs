//! Structured telemetry initialisation for the hub.

use std::fs::OpenOptions;
use std::io::{self, IsTerminal};
use std::sync::Mutex;

use camino::Utf8PathBuf;
use once_cell::sync::OnceCell;
use tracing::{Subscriber, subscriber::SetGlobalDefaultError};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::fmt::writer::BoxMakeWriter;

use fleethub_config::{Config, LogFormat};

static TELEMETRY_GUARD: OnceCell<()> = OnceCell::new();

/// Errors encountered while configuring telemetry.
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    /// Failed to parse the configured log filter expression.
    #[error("invalid log filter: {0}")]
    Filter(String),
    /// Failed to open the configured diagnostic log file.
    #[error("failed to open log file '{path}': {source}")]
    LogFile {
        path: Utf8PathBuf,
        #[source]
        source: io::Error,
    },
    /// Failed to install the tracing subscriber.
    #[error("failed to install telemetry subscriber: {0}")]
    Subscriber(SetGlobalDefaultError),
}

/// Where diagnostic output goes.
enum Sink {
    Stderr,
    File(std::fs::File),
    /// The dashboard owns the terminal and no log file is configured.
    Discard,
}

/// Configures the global tracing subscriber when invoked for the first time.
///
/// Repeated calls are idempotent: the first invocation installs the global
/// subscriber. Later invocations succeed without touching the global state
/// again.
pub fn initialise(config: &Config) -> Result<(), TelemetryError> {
    TELEMETRY_GUARD
        .get_or_try_init(|| install_subscriber(config))
        .map(|_| ())
}

fn open_sink(config: &Config) -> Result<Sink, TelemetryError> {
    match config.log_file() {
        Some(path) => OpenOptions::new()
            .create(true)
            .append(true)
            .open(path.as_std_path())
            .map(Sink::File)
            .map_err(|source| TelemetryError::LogFile {
                path: path.to_path_buf(),
                source,
            }),
        None if config.headless() => Ok(Sink::Stderr),
        None => Ok(Sink::Discard),
    }
}

fn install_subscriber(config: &Config) -> Result<(), TelemetryError> {
    let filter = EnvFilter::try_new(config.log_filter())
        .map_err(|error| TelemetryError::Filter(error.to_string()))?;
    let sink = open_sink(config)?;
    let ansi = matches!(sink, Sink::Stderr) && io::stderr().is_terminal();

    let builder = |filter: EnvFilter, writer: BoxMakeWriter| {
        fmt::Subscriber::builder()
            .with_env_filter(filter)
            .with_target(true)
            .with_level(true)
            .with_thread_ids(false)
            .with_thread_names(true)
            .with_writer(writer)
            .with_ansi(ansi)
            .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
    };
    let writer = match sink {
        Sink::Stderr => BoxMakeWriter::new(io::stderr),
        Sink::File(file) => BoxMakeWriter::new(Mutex::new(file)),
        Sink::Discard => BoxMakeWriter::new(io::sink),
    };

    let subscriber: Box<dyn Subscriber + Send + Sync> = match config.log_format() {
        LogFormat::Json => {
            let json = builder(filter, writer).json().flatten_event(true).finish();
            Box::new(json)
        }
        LogFormat::Compact => Box::new(builder(filter, writer).compact().finish()),
    };

    tracing::subscriber::set_global_default(subscriber).map_err(TelemetryError::Subscriber)
}
