//! Domain errors raised by plugin operations.
//!
//! All errors use `thiserror`-derived enums with structured context so callers
//! can inspect the failure programmatically. The runner renders these into
//! the `error` string of a failed [`crate::PluginResult`]; discovery and
//! runtime bootstrapping return them directly.

use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

/// Errors arising from plugin operations.
#[derive(Debug, Clone, Error)]
pub enum PluginError {
    /// A manifest could not be read or parsed.
    #[error("invalid plugin manifest '{}': {message}", path.display())]
    Manifest {
        /// Manifest file that was rejected.
        path: PathBuf,
        /// Human-readable failure description.
        message: String,
    },

    /// The plugins directory could not be listed.
    #[error("failed to scan plugins directory '{}': {source}", path.display())]
    Discovery {
        /// Directory being scanned.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: Arc<std::io::Error>,
    },

    /// The plugin process could not be spawned.
    #[error("plugin '{name}' failed to start: {message}")]
    SpawnFailed {
        /// Plugin name.
        name: String,
        /// Human-readable failure description.
        message: String,
    },

    /// The plugin did not complete within the configured timeout.
    #[error("plugin '{name}' timed out after {timeout_ms}ms")]
    Timeout {
        /// Plugin name.
        name: String,
        /// Configured timeout in milliseconds.
        timeout_ms: u64,
    },

    /// The plugin wrote more than the stdout size limit.
    #[error("plugin '{name}' exceeded the output size limit of {limit} bytes")]
    OutputLimit {
        /// Plugin name.
        name: String,
        /// Configured limit in bytes.
        limit: usize,
    },

    /// The plugin exited with a non-zero status code.
    #[error("plugin '{name}' exited with non-zero status {status}")]
    NonZeroExit {
        /// Plugin name.
        name: String,
        /// Process exit status, `-1` when killed by a signal.
        status: i32,
    },

    /// The plugin request could not be serialized to JSON.
    #[error("failed to serialise plugin request: {message}")]
    SerializeRequest {
        /// Serializer message.
        message: String,
    },

    /// The plugin produced no output on stdout.
    #[error("plugin '{name}' returned an empty response")]
    EmptyResponse {
        /// Plugin name.
        name: String,
    },

    /// The plugin output did not contain a parsable result.
    #[error("plugin '{name}' returned an invalid JSON response: {message}. Output: {output}")]
    InvalidResponse {
        /// Plugin name.
        name: String,
        /// Parser message.
        message: String,
        /// Raw stdout text.
        output: String,
    },

    /// Communicating with the plugin process failed.
    #[error("I/O error communicating with plugin '{name}': {message}")]
    Io {
        /// Plugin name.
        name: String,
        /// Human-readable failure description.
        message: String,
    },

    /// The interpreter runtime a plugin needs is missing and could not be
    /// installed.
    #[error("runtime '{runtime}' required by plugin '{name}' is unavailable: {message}")]
    RuntimeUnavailable {
        /// Plugin name.
        name: String,
        /// Runtime tool name (for example `uv`).
        runtime: String,
        /// Human-readable failure description.
        message: String,
    },
}
