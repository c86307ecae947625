//! Error types for the device simulator.

use std::io;
use std::process::ExitCode;

use thiserror::Error;

/// Exit status reported when the hub refuses the device name.
pub(crate) const DENIED_EXIT_STATUS: u8 = 2;

#[derive(Debug, Error)]
pub(crate) enum AppError {
    #[error("{0}")]
    CliUsage(clap::Error),
    #[error("failed to resolve hub address {endpoint}: {source}")]
    Resolve { endpoint: String, source: io::Error },
    #[error("failed to connect to hub at {endpoint}: {source}")]
    Connect { endpoint: String, source: io::Error },
    #[error("failed to send registration: {0}")]
    SendRegistration(io::Error),
    #[error("failed to read registration reply: {0}")]
    ReadReply(io::Error),
    #[error("the hub does not know device '{name}'; check the name and retry")]
    Denied { name: String },
    #[error("the hub sent no registration reply")]
    NoReply,
    #[error("unexpected registration reply '{0}'")]
    UnexpectedReply(String),
    #[error("failed to start the command reader: {0}")]
    SpawnReader(io::Error),
    #[error("failed to send status to the hub: {0}")]
    SendStatus(io::Error),
    #[error("failed to read status input: {0}")]
    ReadInput(io::Error),
    #[error("failed to write output: {0}")]
    WriteOutput(io::Error),
}

impl AppError {
    /// Process exit code for this failure.
    pub(crate) fn exit_code(&self) -> ExitCode {
        match self {
            Self::Denied { .. } => ExitCode::from(DENIED_EXIT_STATUS),
            _ => ExitCode::FAILURE,
        }
    }
}
