//! Host mutators wired into the engine by the binary.
//!
//! Dotfiles and git configuration are applied on every platform. The
//! remaining sections need Windows system APIs and are reported as
//! unsupported on this host.

mod dotfiles;
mod git;
mod unsupported;

use std::path::Path;
use std::sync::Arc;

use winhome_engine::Appliers;
use winhome_process::{ProcessRunner, RuntimeResolver};

pub(crate) use self::dotfiles::DotfileLinker;
pub(crate) use self::git::GitConfigurator;
pub(crate) use self::unsupported::UnsupportedApplier;

/// Tracing target for host appliers.
const APPLIERS_TARGET: &str = "winhome_cli::appliers";

/// Appliers for this host. Relative dotfile paths resolve against
/// `descriptor_dir`.
pub(crate) fn host_appliers(
    runner: &Arc<dyn ProcessRunner>,
    resolver: &RuntimeResolver,
    descriptor_dir: &Path,
) -> Appliers {
    Appliers::uniform(Arc::new(UnsupportedApplier))
        .with_dotfiles(Arc::new(DotfileLinker::new(descriptor_dir)))
        .with_git(Arc::new(GitConfigurator::new(
            Arc::clone(runner),
            resolver.clone(),
        )))
}
