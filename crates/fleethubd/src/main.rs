use std::process::ExitCode;

fn main() -> ExitCode {
    match fleethubd::run_server() {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("fleethubd: {error}");
            ExitCode::FAILURE
        }
    }
}
