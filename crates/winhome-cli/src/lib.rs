//! Command-line interface runtime for the `winhome` reconciler.
//!
//! The module owns argument parsing, telemetry start-up and dispatch to the
//! subcommand handlers. [`run`] takes its output streams as parameters so
//! tests can drive the whole binary in-process.

use std::ffi::OsString;
use std::io::Write;
use std::process::ExitCode;

use clap::Parser;

mod appliers;
mod cli;
mod commands;
mod errors;
pub mod telemetry;

use cli::{Cli, Command};
use errors::{CliError, report};

/// Runs the CLI using the provided arguments and IO handles.
#[must_use]
pub fn run<I, W, E>(args: I, stdout: &mut W, stderr: &mut E) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    W: Write,
    E: Write,
{
    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(error) => return usage(&error, stdout, stderr),
    };
    let debug = cli.debug;
    match execute(cli, stdout) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            // Nowhere left to send a failed stderr write.
            report(&error, debug, stderr).ok();
            ExitCode::FAILURE
        }
    }
}

fn execute(cli: Cli, stdout: &mut dyn Write) -> Result<(), CliError> {
    let mut config = cli.config;
    if cli.debug {
        config.log_filter = String::from("debug");
    }
    telemetry::initialise(&config)?;
    match &cli.command {
        Command::Apply(args) => commands::apply(&config, args, stdout),
        Command::State { action } => commands::state(&config, action, stdout),
        Command::Plugins { action } => commands::plugins(&config, action, stdout),
        Command::Generate(args) => commands::generate(args, stdout),
    }
}

/// Prints help, version or a usage error and returns clap's exit status.
fn usage<W: Write, E: Write>(error: &clap::Error, stdout: &mut W, stderr: &mut E) -> ExitCode {
    let rendered = error.render().to_string();
    let written = if error.use_stderr() {
        write!(stderr, "{rendered}")
    } else {
        write!(stdout, "{rendered}")
    };
    if written.is_err() {
        return ExitCode::FAILURE;
    }
    u8::try_from(error.exit_code()).map_or(ExitCode::FAILURE, ExitCode::from)
}
