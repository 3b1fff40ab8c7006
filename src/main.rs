//! datasaver - Inspect and edit persisted values

use std::process::ExitCode;

fn main() -> ExitCode {
    if let Err(e) = datasaver::cli::run() {
        eprintln!("Error: {:#}", e);
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
