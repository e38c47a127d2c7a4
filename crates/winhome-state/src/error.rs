//! Errors raised by state persistence.

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

/// Errors returned by [`crate::StateStore`] operations that can fail.
#[derive(Debug, Clone, Error)]
pub enum StateError {
    /// The state file could not be written.
    #[error("failed to write state file '{}': {source}", path.display())]
    Write {
        /// Target file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: Arc<io::Error>,
    },

    /// The state set could not be serialised.
    #[error("failed to serialise state: {message}")]
    Serialize {
        /// Serializer message.
        message: String,
    },

    /// Copying the state file to or from a backup failed.
    #[error("failed to copy state from '{}' to '{}': {source}", from.display(), to.display())]
    Copy {
        /// Source file.
        from: PathBuf,
        /// Destination file.
        to: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: Arc<io::Error>,
    },

    /// A backup to restore from does not exist.
    #[error("backup file '{}' does not exist", path.display())]
    MissingBackup {
        /// Requested backup path.
        path: PathBuf,
    },
}

impl StateError {
    pub(crate) fn write(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Write {
            path: path.into(),
            source: Arc::new(source),
        }
    }
}
