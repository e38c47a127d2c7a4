//! CLI entrypoint for the `winhome` reconciler.
//!
//! The binary delegates to [`winhome_cli::run`], which parses arguments,
//! initialises telemetry, wires the engine and dispatches the subcommand.

use std::io::{self, StdoutLock};
use std::process::ExitCode;

fn main() -> ExitCode {
    let mut stdout: StdoutLock<'_> = io::stdout().lock();
    // Left unlocked: worker threads log to stderr while a run is in flight.
    let mut stderr = io::stderr();
    winhome_cli::run(std::env::args_os(), &mut stdout, &mut stderr)
}
