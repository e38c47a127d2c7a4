//! Plugin process execution.
//!
//! [`PluginRunner`] launches a plugin's entry point (directly for native
//! executables, through `uv` or `bun` otherwise) with the plugin directory as
//! working directory, writes the JSON request line, and interprets stdout.
//! Timeouts, output overruns, non-zero exits, empty output, and unparsable
//! output all come back as a failed [`PluginResult`]; the runner never
//! returns an error to its caller.

use std::time::Duration;

use serde_json::Value;
use tracing::{debug, info, warn};
use winhome_process::{ProcessCommand, ProcessError, RuntimeResolver};

use crate::error::PluginError;
use crate::manifest::PluginManifest;
use crate::protocol::{PluginContext, PluginRequest, PluginResult};

/// Tracing target for plugin execution.
const RUNNER_TARGET: &str = "winhome_plugins::runner";

/// Default wall-clock budget for one plugin invocation.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default cap on plugin stdout (10 MiB).
pub const DEFAULT_OUTPUT_LIMIT: usize = 10 * 1024 * 1024;

/// Environment variable carrying the plugin's own name into the child.
pub const PLUGIN_NAME_ENV: &str = "WINHOME_PLUGIN_NAME";

/// Trait abstracting plugin invocation so adapters can be tested without
/// spawning processes.
///
/// # Example
///
/// ```
/// use serde_json::{Value, json};
/// use winhome_plugins::{PluginContext, PluginExecutor, PluginManifest, PluginResult};
///
/// struct AlwaysInstalled;
///
/// impl PluginExecutor for AlwaysInstalled {
///     fn execute(
///         &self,
///         _plugin: &PluginManifest,
///         _command: &str,
///         _args: Value,
///         _context: PluginContext,
///     ) -> PluginResult {
///         PluginResult { success: true, data: json!(true), ..PluginResult::default() }
///     }
/// }
/// ```
pub trait PluginExecutor: Send + Sync {
    /// Runs `command` against `plugin` and returns its result.
    fn execute(
        &self,
        plugin: &PluginManifest,
        command: &str,
        args: Value,
        context: PluginContext,
    ) -> PluginResult;
}

/// Spawns plugin processes and speaks the stdio protocol with them.
#[derive(Debug, Clone)]
pub struct PluginRunner {
    resolver: RuntimeResolver,
    timeout: Duration,
    output_limit: usize,
}

impl PluginRunner {
    /// Creates a runner with the default timeout and output cap.
    #[must_use]
    pub const fn new(resolver: RuntimeResolver) -> Self {
        Self {
            resolver,
            timeout: DEFAULT_TIMEOUT,
            output_limit: DEFAULT_OUTPUT_LIMIT,
        }
    }

    /// Overrides the per-invocation timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Overrides the stdout cap.
    #[must_use]
    pub const fn with_output_limit(mut self, limit: usize) -> Self {
        self.output_limit = limit;
        self
    }

    /// Builds the process invocation for `plugin`.
    #[must_use]
    pub fn launch_command(&self, plugin: &PluginManifest) -> ProcessCommand {
        let entry = plugin.entry_point();
        let command = match plugin.kind().runtime() {
            Some(runtime) => ProcessCommand::new(self.resolver.resolve(runtime.tool()))
                .args(runtime.launch_args().iter().copied())
                .args([entry.into_os_string()]),
            None => ProcessCommand::new(entry),
        };
        command
            .current_dir(plugin.directory())
            .env(PLUGIN_NAME_ENV, plugin.name())
            .timeout(self.timeout)
            .output_limit(self.output_limit)
            .label(plugin.name())
            .stderr_as_warning(true)
    }

    fn run(&self, plugin: &PluginManifest, request: &PluginRequest) -> Result<PluginResult, PluginError> {
        let name = plugin.name();
        let mut line = serde_json::to_string(request).map_err(|error| {
            PluginError::SerializeRequest {
                message: error.to_string(),
            }
        })?;
        line.push('\n');

        let command = self.launch_command(plugin).stdin(line);
        info!(
            target: RUNNER_TARGET,
            plugin = name,
            command = request.command(),
            program = %command.program().display(),
            "starting plugin"
        );

        let output = winhome_process::run(&command).map_err(|error| match error {
            ProcessError::Timeout { timeout, .. } => PluginError::Timeout {
                name: name.to_owned(),
                timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
            },
            ProcessError::OutputLimit { limit, .. } => PluginError::OutputLimit {
                name: name.to_owned(),
                limit,
            },
            ProcessError::Spawn { source, .. } => PluginError::SpawnFailed {
                name: name.to_owned(),
                message: source.to_string(),
            },
            ProcessError::Io { source, .. } => PluginError::Io {
                name: name.to_owned(),
                message: source.to_string(),
            },
        })?;

        if !output.success() {
            return Err(PluginError::NonZeroExit {
                name: name.to_owned(),
                status: output.code.unwrap_or(-1),
            });
        }

        let mut result = parse_response(name, &output.stdout_text())?;
        if result.request_id.is_empty() {
            result.request_id = request.request_id().to_owned();
        } else if result.request_id != request.request_id() {
            warn!(
                target: RUNNER_TARGET,
                plugin = name,
                expected = request.request_id(),
                received = %result.request_id,
                "plugin answered with a different request id"
            );
        }
        Ok(result)
    }
}

impl PluginExecutor for PluginRunner {
    fn execute(
        &self,
        plugin: &PluginManifest,
        command: &str,
        args: Value,
        context: PluginContext,
    ) -> PluginResult {
        let request = PluginRequest::new(command, args, context);
        match self.run(plugin, &request) {
            Ok(result) => {
                debug!(
                    target: RUNNER_TARGET,
                    plugin = plugin.name(),
                    success = result.success,
                    changed = result.changed,
                    "plugin finished"
                );
                result
            }
            Err(error) => {
                warn!(target: RUNNER_TARGET, plugin = plugin.name(), %error, "plugin call failed");
                PluginResult::failure(request.request_id(), error.to_string())
            }
        }
    }
}

/// Extracts the result from raw plugin stdout.
///
/// The last line that starts with `{` and ends with `}` is parsed; when no
/// line qualifies the whole output is tried, so a pretty-printed object still
/// parses.
///
/// # Errors
///
/// Returns [`PluginError::EmptyResponse`] for blank output and
/// [`PluginError::InvalidResponse`] when the chosen text is not a result.
pub fn parse_response(name: &str, output: &str) -> Result<PluginResult, PluginError> {
    if output.trim().is_empty() {
        return Err(PluginError::EmptyResponse {
            name: name.to_owned(),
        });
    }

    let candidate = output
        .lines()
        .rev()
        .map(str::trim)
        .find(|line| line.starts_with('{') && line.ends_with('}'))
        .unwrap_or(output);

    serde_json::from_str(candidate).map_err(|error| PluginError::InvalidResponse {
        name: name.to_owned(),
        message: error.to_string(),
        output: output.trim().to_owned(),
    })
}
