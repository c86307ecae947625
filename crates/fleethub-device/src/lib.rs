//! Device simulator for the fleethub server.
//!
//! The simulator plays one roster device: it connects to the hub, registers
//! with `NAME:CONNECTED`, then forwards each non-empty stdin line as a
//! `NAME:<line>` status report while printing every command the hub sends.
//! It exits with status 2 when the hub denies the name and 1 on any other
//! failure.

use std::ffi::OsString;
use std::io::{Read, Write};
use std::net::Shutdown;
use std::process::ExitCode;

use clap::Parser;
use clap::error::ErrorKind;

mod cli;
mod errors;
mod session;
mod transport;

use cli::Cli;
pub(crate) use errors::AppError;
use session::Ending;

/// Runs the simulator with the given arguments and streams.
#[must_use]
pub fn run<I, R, W, E>(args: I, input: R, stdout: &mut W, stderr: &mut E) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    R: Read + Send + 'static,
    W: Write,
    E: Write,
{
    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(error) if is_informational(&error) => {
            let _ = write!(stdout, "{error}");
            return ExitCode::SUCCESS;
        }
        Err(error) => {
            let error = AppError::CliUsage(error);
            let _ = write!(stderr, "{error}");
            return error.exit_code();
        }
    };

    match simulate(&cli, input, stdout) {
        Ok(Ending::InputClosed | Ending::HubClosed) => ExitCode::SUCCESS,
        Err(error) => {
            let _ = writeln!(stderr, "{error}");
            error.exit_code()
        }
    }
}

fn simulate<R, W>(cli: &Cli, input: R, stdout: &mut W) -> Result<Ending, AppError>
where
    R: Read + Send + 'static,
    W: Write,
{
    let mut stream = transport::connect(&cli.host, cli.port)?;
    writeln!(stdout, "[device] connected to {}:{}; registering as {}", cli.host, cli.port, cli.name)
        .map_err(AppError::WriteOutput)?;
    session::register(&mut stream, &cli.name)?;
    writeln!(stdout, "[device] registered; type a status and press Enter (e.g. OK, ERROR)")
        .map_err(AppError::WriteOutput)?;
    let ending = session::relay(&mut stream, &cli.name, input, stdout);
    // Unblocks the command reader, which holds a clone of the socket.
    let _ = stream.shutdown(Shutdown::Both);
    ending
}

fn is_informational(error: &clap::Error) -> bool {
    matches!(error.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion)
}
