//! Entry point for the fleethub device simulator.
//!
//! Delegates to [`fleethub_device::run`] with the process streams.

use std::io;
use std::process::ExitCode;

fn main() -> ExitCode {
    let mut stdout = io::stdout().lock();
    let mut stderr = io::stderr().lock();
    fleethub_device::run(std::env::args_os(), io::stdin(), &mut stdout, &mut stderr)
}
