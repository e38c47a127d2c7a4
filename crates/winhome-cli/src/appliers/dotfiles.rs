//! Dotfile linking.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, info};
use winhome_engine::descriptor::Dotfile;
use winhome_engine::{ApplyError, ItemApplier};

use super::APPLIERS_TARGET;

/// Links each dotfile target to its source with a symbolic link.
///
/// Links always point at the canonical source path.
/// An existing link at the target is replaced. Anything else at the target
/// is left alone and reported as a failure.
pub(crate) struct DotfileLinker {
    base_dir: PathBuf,
    home: Option<PathBuf>,
}

impl DotfileLinker {
    pub(crate) fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            home: dirs::home_dir(),
        }
    }

    #[cfg(test)]
    pub(crate) fn with_home(mut self, home: impl Into<PathBuf>) -> Self {
        self.home = Some(home.into());
        self
    }

    fn expand(&self, raw: &str) -> PathBuf {
        let path = match (raw.strip_prefix('~'), &self.home) {
            (Some(rest), Some(home)) if rest.is_empty() || rest.starts_with(['/', '\\']) => {
                home.join(rest.trim_start_matches(['/', '\\']))
            }
            _ => PathBuf::from(raw),
        };
        if path.is_relative() {
            self.base_dir.join(path)
        } else {
            path
        }
    }
}

impl ItemApplier<Dotfile> for DotfileLinker {
    fn apply(&self, item: &Dotfile, dry_run: bool) -> Result<(), ApplyError> {
        let failed = |message: String| ApplyError::Failed {
            section: "dotfiles",
            item: item.target.clone(),
            message,
        };
        let source = fs::canonicalize(self.expand(&item.src))
            .map_err(|error| failed(format!("source '{}' is unavailable: {error}", item.src)))?;
        let target = self.expand(&item.target);

        match fs::symlink_metadata(&target) {
            Ok(metadata) if metadata.file_type().is_symlink() => {
                if fs::read_link(&target).is_ok_and(|current| current == source) {
                    debug!(
                        target: APPLIERS_TARGET,
                        link = %target.display(),
                        "dotfile link already in place"
                    );
                    return Ok(());
                }
                if !dry_run {
                    unlink(&target)
                        .map_err(|error| failed(format!("cannot replace link: {error}")))?;
                }
            }
            Ok(_) => {
                return Err(failed(format!(
                    "'{}' exists and is not a link; refusing to overwrite it",
                    target.display()
                )));
            }
            Err(error) if error.kind() == io::ErrorKind::NotFound => {}
            Err(error) => return Err(failed(error.to_string())),
        }

        if dry_run {
            info!(
                target: APPLIERS_TARGET,
                source = %source.display(),
                link = %target.display(),
                "would link dotfile"
            );
            return Ok(());
        }
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|error| failed(error.to_string()))?;
        }
        link(&source, &target).map_err(|error| failed(error.to_string()))?;
        info!(
            target: APPLIERS_TARGET,
            source = %source.display(),
            link = %target.display(),
            "linked dotfile"
        );
        Ok(())
    }
}

fn unlink(target: &Path) -> io::Result<()> {
    fs::remove_file(target).or_else(|error| {
        if cfg!(windows) {
            fs::remove_dir(target)
        } else {
            Err(error)
        }
    })
}

#[cfg(unix)]
fn link(source: &Path, target: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(source, target)
}

#[cfg(windows)]
fn link(source: &Path, target: &Path) -> io::Result<()> {
    if source.is_dir() {
        std::os::windows::fs::symlink_dir(source, target)
    } else {
        std::os::windows::fs::symlink_file(source, target)
    }
}

#[cfg(not(any(unix, windows)))]
fn link(_source: &Path, _target: &Path) -> io::Result<()> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "symbolic links are not available on this platform",
    ))
}
