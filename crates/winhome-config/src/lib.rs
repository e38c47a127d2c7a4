//! Shared configuration for the `winhome` reconciler.
//!
//! [`Config`] gathers the knobs that do not belong to the desired-state
//! descriptor itself: where the state file and plugins live, how verbose the
//! logs are, and the budgets applied to plugin processes, the network probe,
//! and fanned-out phases. Every field can be supplied on the command line or
//! through a `WINHOME_*` environment variable, with command-line values
//! taking precedence.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Args, Parser};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod defaults;
mod logging;

pub use defaults::{
    DEFAULT_LOG_FILTER, DEFAULT_NETWORK_INTERVAL_SECS, DEFAULT_NETWORK_PROBE_HOST,
    DEFAULT_NETWORK_TIMEOUT_SECS, DEFAULT_PLUGIN_OUTPUT_LIMIT, DEFAULT_PLUGIN_TIMEOUT_SECS,
    DEFAULT_STATE_FILE, LOG_FILTER_ENV, LOG_FORMAT_ENV, PLUGINS_DIR_ENV, STATE_FILE_ENV,
    default_log_filter, default_log_format, default_max_parallelism, default_plugins_dir,
    default_state_file,
};
pub use logging::{LogFormat, LogFormatParseError};

/// Runtime configuration shared by the CLI and the engine wiring.
#[derive(Args, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Path of the JSON file recording what the last run applied.
    #[arg(long, env = STATE_FILE_ENV, default_value_os_t = default_state_file())]
    pub state_file: PathBuf,
    /// Directory scanned for `<plugin>/plugin.yaml` manifests.
    #[arg(long, env = PLUGINS_DIR_ENV, default_value_os_t = default_plugins_dir())]
    pub plugins_dir: PathBuf,
    /// Tracing filter expression (for example `info,winhome_plugins=debug`).
    #[arg(long, env = LOG_FILTER_ENV, default_value_t = default_log_filter())]
    pub log_filter: String,
    /// Log output format.
    #[arg(long, env = LOG_FORMAT_ENV, default_value_t = default_log_format())]
    pub log_format: LogFormat,
    /// Seconds a plugin may run before it is killed.
    #[arg(long, default_value_t = DEFAULT_PLUGIN_TIMEOUT_SECS)]
    pub plugin_timeout_secs: u64,
    /// Bytes a plugin may write to stdout before it is killed.
    #[arg(long, default_value_t = DEFAULT_PLUGIN_OUTPUT_LIMIT)]
    pub plugin_output_limit: usize,
    /// Total seconds to wait for network reachability.
    #[arg(long, default_value_t = DEFAULT_NETWORK_TIMEOUT_SECS)]
    pub network_timeout_secs: u64,
    /// Seconds between network reachability attempts.
    #[arg(long, default_value_t = DEFAULT_NETWORK_INTERVAL_SECS)]
    pub network_interval_secs: u64,
    /// `host:port` endpoint used to probe network reachability.
    #[arg(long, default_value = DEFAULT_NETWORK_PROBE_HOST)]
    pub network_probe_host: String,
    /// Upper bound on concurrent workers in fanned-out phases.
    #[arg(long, default_value_t = default_max_parallelism())]
    pub max_parallelism: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            state_file: default_state_file(),
            plugins_dir: default_plugins_dir(),
            log_filter: default_log_filter(),
            log_format: default_log_format(),
            plugin_timeout_secs: DEFAULT_PLUGIN_TIMEOUT_SECS,
            plugin_output_limit: DEFAULT_PLUGIN_OUTPUT_LIMIT,
            network_timeout_secs: DEFAULT_NETWORK_TIMEOUT_SECS,
            network_interval_secs: DEFAULT_NETWORK_INTERVAL_SECS,
            network_probe_host: DEFAULT_NETWORK_PROBE_HOST.to_owned(),
            max_parallelism: default_max_parallelism(),
        }
    }
}

/// Errors raised while loading [`Config`] from arguments and environment.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Arguments or environment values failed to parse.
    #[error("failed to load configuration: {0}")]
    Parse(#[from] clap::Error),
}

#[derive(Parser, Debug)]
#[command(name = "winhome")]
struct ConfigCommand {
    #[command(flatten)]
    config: Config,
}

impl Config {
    /// Loads configuration from an argument vector and the process
    /// environment. The first element is treated as the program name.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] when an argument or environment value
    /// is malformed or unknown.
    pub fn load_from_iter<I, T>(args: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        Ok(ConfigCommand::try_parse_from(args)?.config)
    }

    /// Path of the state file.
    #[must_use]
    pub fn state_file(&self) -> &Path {
        &self.state_file
    }

    /// Directory holding plugin subdirectories.
    #[must_use]
    pub fn plugins_dir(&self) -> &Path {
        &self.plugins_dir
    }

    /// Tracing filter expression.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        &self.log_filter
    }

    /// Selected log format.
    #[must_use]
    pub const fn log_format(&self) -> LogFormat {
        self.log_format
    }

    /// Plugin wall-clock budget.
    #[must_use]
    pub const fn plugin_timeout(&self) -> Duration {
        Duration::from_secs(self.plugin_timeout_secs)
    }

    /// Plugin stdout cap in bytes.
    #[must_use]
    pub const fn plugin_output_limit(&self) -> usize {
        self.plugin_output_limit
    }

    /// Total wait for network reachability.
    #[must_use]
    pub const fn network_timeout(&self) -> Duration {
        Duration::from_secs(self.network_timeout_secs)
    }

    /// Pause between reachability attempts.
    #[must_use]
    pub const fn network_interval(&self) -> Duration {
        Duration::from_secs(self.network_interval_secs)
    }

    /// Endpoint used for the reachability probe.
    #[must_use]
    pub fn network_probe_host(&self) -> &str {
        &self.network_probe_host
    }

    /// Worker bound for fanned-out phases, never below one.
    #[must_use]
    pub fn max_parallelism(&self) -> usize {
        self.max_parallelism.max(1)
    }
}
