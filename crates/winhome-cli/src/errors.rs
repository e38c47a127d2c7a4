//! Error types and diagnostics helpers for the CLI runtime.

use std::error::Error as _;
use std::io::{self, Write};
use std::path::PathBuf;

use thiserror::Error;
use winhome_engine::{DescriptorError, EngineError};
use winhome_state::StateError;

use crate::telemetry::TelemetryError;

#[derive(Debug, Error)]
pub(crate) enum CliError {
    #[error(transparent)]
    Telemetry(#[from] TelemetryError),
    #[error("config file not found at: {}", path.display())]
    DescriptorMissing { path: PathBuf },
    #[error("failed to load descriptor: {0}")]
    Descriptor(#[from] DescriptorError),
    #[error("reconciliation aborted: {0}")]
    Engine(#[from] EngineError),
    #[error(transparent)]
    State(#[from] StateError),
    #[error("failed to write output: {0}")]
    Output(#[from] io::Error),
    #[error("failed to write '{}': {source}", path.display())]
    WriteFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Writes `error` to `stderr`, with its source chain when `debug` is set.
pub(crate) fn report(error: &CliError, debug: bool, stderr: &mut dyn Write) -> io::Result<()> {
    writeln!(stderr, "[Critical Error] {error}")?;
    if !debug {
        return writeln!(stderr, "Tip: Run with --debug to see full error details.");
    }
    let mut source = error.source();
    while let Some(cause) = source {
        writeln!(stderr, "  caused by: {cause}")?;
        source = cause.source();
    }
    Ok(())
}
