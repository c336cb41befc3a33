//! Entry point for the `shinobid` registry server.

use std::io::{self, Write};
use std::process::ExitCode;

fn main() -> ExitCode {
    match shinobid::run_server() {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            let mut stderr = io::stderr().lock();
            match writeln!(stderr, "shinobid: {error}") {
                Ok(()) | Err(_) => ExitCode::FAILURE,
            }
        }
    }
}
