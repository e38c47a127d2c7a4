//! Default values and environment variable names.

use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::thread;

/// Environment variable overriding the state file location.
pub const STATE_FILE_ENV: &str = "WINHOME_STATE_FILE";

/// Environment variable overriding the plugins directory.
pub const PLUGINS_DIR_ENV: &str = "WINHOME_PLUGINS_DIR";

/// Environment variable overriding the log filter.
pub const LOG_FILTER_ENV: &str = "WINHOME_LOG_FILTER";

/// Environment variable overriding the log format.
pub const LOG_FORMAT_ENV: &str = "WINHOME_LOG_FORMAT";

/// State file written next to the working directory when not overridden.
pub const DEFAULT_STATE_FILE: &str = "winhome.state.json";

/// Default log filter expression used by the binary.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Default wall-clock budget for a single plugin invocation.
pub const DEFAULT_PLUGIN_TIMEOUT_SECS: u64 = 30;

/// Default cap on the bytes a plugin may write to stdout (10 MiB).
pub const DEFAULT_PLUGIN_OUTPUT_LIMIT: usize = 10 * 1024 * 1024;

/// Default total wait for network reachability before packages are touched.
pub const DEFAULT_NETWORK_TIMEOUT_SECS: u64 = 30;

/// Default pause between network reachability attempts.
pub const DEFAULT_NETWORK_INTERVAL_SECS: u64 = 2;

/// Endpoint probed to decide whether the network is reachable.
pub const DEFAULT_NETWORK_PROBE_HOST: &str = "github.com:443";

/// Default state file path.
pub fn default_state_file() -> PathBuf {
    PathBuf::from(DEFAULT_STATE_FILE)
}

/// Default plugins directory: `<local data dir>/WinHome/plugins`.
///
/// Falls back to a relative `plugins` directory when the platform exposes no
/// local data directory.
pub fn default_plugins_dir() -> PathBuf {
    dirs::data_local_dir().map_or_else(
        || PathBuf::from("plugins"),
        |base| base.join("WinHome").join("plugins"),
    )
}

/// Owned log filter value used where allocation is required (e.g. clap).
pub fn default_log_filter() -> String {
    DEFAULT_LOG_FILTER.to_owned()
}

/// Default logging format for the binary.
pub fn default_log_format() -> crate::logging::LogFormat {
    crate::logging::LogFormat::Compact
}

/// Number of workers used by fanned-out phases when not overridden.
pub fn default_max_parallelism() -> usize {
    thread::available_parallelism().map_or(1, NonZeroUsize::get)
}
