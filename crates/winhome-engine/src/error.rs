//! Error types for the reconciliation engine and its collaborators.

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;
use winhome_process::ProcessError;

/// Errors raised while loading or resolving a descriptor.
#[derive(Debug, Clone, Error)]
pub enum DescriptorError {
    /// The descriptor file could not be read.
    #[error("failed to read descriptor '{}': {source}", path.display())]
    Read {
        /// Descriptor path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: Arc<io::Error>,
    },

    /// The descriptor text is not valid YAML for the model.
    #[error("failed to parse descriptor: {message}")]
    Parse {
        /// Parser message.
        message: String,
    },

    /// The descriptor parsed but failed structural validation.
    #[error("descriptor is invalid: {}", problems.join("; "))]
    Invalid {
        /// One entry per violated rule.
        problems: Vec<String>,
    },

    /// A profile was requested that the descriptor does not define.
    #[error("profile '{name}' not found")]
    UnknownProfile {
        /// Requested profile name.
        name: String,
    },

    /// The descriptor could not be rendered as YAML.
    #[error("failed to render descriptor: {message}")]
    Render {
        /// Serialiser message.
        message: String,
    },
}

/// Errors raised by resource managers.
#[derive(Debug, Clone, Error)]
pub enum ManagerError {
    /// The manager tool could not be run.
    #[error("{manager}: failed to run command: {source}")]
    Process {
        /// Manager name.
        manager: String,
        /// Underlying process failure.
        #[source]
        source: ProcessError,
    },

    /// The manager tool ran but reported failure.
    #[error("{manager}: '{action}' for '{item}' failed with status {status}: {detail}")]
    CommandFailed {
        /// Manager name.
        manager: String,
        /// Operation attempted (`install`, `uninstall`, `bootstrap`).
        action: &'static str,
        /// Item the operation targeted.
        item: String,
        /// Exit status, `-1` when killed by a signal.
        status: i32,
        /// Trimmed stderr text.
        detail: String,
    },

    /// The manager cannot install itself.
    #[error("{manager} cannot be bootstrapped automatically: {hint}")]
    BootstrapUnsupported {
        /// Manager name.
        manager: String,
        /// Manual installation hint.
        hint: &'static str,
    },

    /// A plugin-backed manager returned a failed result.
    #[error("plugin '{manager}' failed to {action} '{item}': {message}")]
    Plugin {
        /// Plugin name.
        manager: String,
        /// Protocol command issued.
        action: &'static str,
        /// Item the command targeted.
        item: String,
        /// Error text from the plugin.
        message: String,
    },

    /// The manager cannot enumerate its installed packages.
    #[error("{manager} cannot list installed packages")]
    ListingUnsupported {
        /// Manager name.
        manager: String,
    },

    /// The package listing could not be read.
    #[error("{manager}: unreadable package listing: {message}")]
    Listing {
        /// Manager name.
        manager: String,
        /// Failure description.
        message: String,
    },

    /// The plugin runtime could not be prepared.
    #[error("plugin '{manager}' runtime is unavailable: {message}")]
    Runtime {
        /// Plugin name.
        manager: String,
        /// Failure description.
        message: String,
    },
}

/// Errors raised by host appliers.
#[derive(Debug, Clone, Error)]
pub enum ApplyError {
    /// The applier attempted the change and failed.
    #[error("{section} '{item}': {message}")]
    Failed {
        /// Descriptor section being applied.
        section: &'static str,
        /// Item identifier within the section.
        item: String,
        /// Failure description.
        message: String,
    },

    /// The section cannot be applied on this host.
    #[error("{section} '{item}' is not supported on this host")]
    Unsupported {
        /// Descriptor section being applied.
        section: &'static str,
        /// Item identifier within the section.
        item: String,
    },
}

/// Errors that abort a whole reconciliation run.
#[derive(Debug, Clone, Error)]
pub enum EngineError {
    /// Profile resolution failed outside dry-run mode.
    #[error(transparent)]
    Descriptor(#[from] DescriptorError),

    /// Writing the diff report failed.
    #[error("failed to write report: {source}")]
    Output {
        /// Underlying I/O error.
        #[source]
        source: Arc<io::Error>,
    },
}

impl From<io::Error> for EngineError {
    fn from(source: io::Error) -> Self {
        Self::Output {
            source: Arc::new(source),
        }
    }
}
