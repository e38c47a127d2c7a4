//! Host mutators the engine delegates to.
//!
//! The engine decides *what* to apply; these traits do the applying. Each
//! item-level call returns its own error so the engine can log and move on.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value;

use crate::descriptor::{
    Dotfile, EnvVar, GitConfig, RegistryTweak, ScheduledTask, ServiceConfig, WslConfig,
};
use crate::error::ApplyError;

/// Applies one item of a descriptor section.
pub trait ItemApplier<T>: Send + Sync {
    /// Applies `item`. In dry-run mode only reports.
    ///
    /// # Errors
    ///
    /// Returns [`ApplyError`] when the change fails or is unsupported.
    fn apply(&self, item: &T, dry_run: bool) -> Result<(), ApplyError>;
}

/// Writes and reverts registry values.
pub trait RegistryApplier: Send + Sync {
    /// Writes `tweak`.
    ///
    /// # Errors
    ///
    /// Returns [`ApplyError`] when the value cannot be written.
    fn apply(&self, tweak: &RegistryTweak, dry_run: bool) -> Result<(), ApplyError>;

    /// Removes a value written by an earlier run. A missing value is not an
    /// error.
    ///
    /// # Errors
    ///
    /// Returns [`ApplyError`] when the value exists but cannot be removed.
    fn revert(&self, path: &str, name: &str, dry_run: bool) -> Result<(), ApplyError>;
}

/// Resolves free-form system settings.
pub trait SystemSettingsApplier: Send + Sync {
    /// Registry values implied by `settings`. They are tracked and applied
    /// like explicit registry tweaks.
    fn registry_tweaks(&self, settings: &BTreeMap<String, Value>) -> Vec<RegistryTweak>;

    /// Applies the settings that are not plain registry values.
    ///
    /// # Errors
    ///
    /// Returns [`ApplyError`] when any setting fails.
    fn apply_non_registry(
        &self,
        settings: &BTreeMap<String, Value>,
        dry_run: bool,
    ) -> Result<(), ApplyError>;

    /// Reads the host's current settings back in descriptor form. Settings
    /// the host cannot read are left out.
    fn capture(&self) -> BTreeMap<String, Value>;
}

/// Re-reads environment changes made by installers so later steps see them.
pub trait EnvironmentRefresher: Send + Sync {
    /// Refreshes the process view of the environment (for example `PATH`).
    fn refresh(&self);
}

/// One applier per descriptor section.
#[derive(Clone)]
pub struct Appliers {
    /// Registry values.
    pub registry: Arc<dyn RegistryApplier>,
    /// Free-form system settings.
    pub system_settings: Arc<dyn SystemSettingsApplier>,
    /// Dotfile links.
    pub dotfiles: Arc<dyn ItemApplier<Dotfile>>,
    /// Environment variables.
    pub env_vars: Arc<dyn ItemApplier<EnvVar>>,
    /// Service states.
    pub services: Arc<dyn ItemApplier<ServiceConfig>>,
    /// Scheduled tasks.
    pub scheduled_tasks: Arc<dyn ItemApplier<ScheduledTask>>,
    /// Global git configuration.
    pub git: Arc<dyn ItemApplier<GitConfig>>,
    /// WSL configuration.
    pub wsl: Arc<dyn ItemApplier<WslConfig>>,
    /// Environment refresh after each app install.
    pub environment: Arc<dyn EnvironmentRefresher>,
}

impl Appliers {
    /// Uses `applier` for every section.
    #[must_use]
    pub fn uniform<A>(applier: Arc<A>) -> Self
    where
        A: RegistryApplier
            + SystemSettingsApplier
            + ItemApplier<Dotfile>
            + ItemApplier<EnvVar>
            + ItemApplier<ServiceConfig>
            + ItemApplier<ScheduledTask>
            + ItemApplier<GitConfig>
            + ItemApplier<WslConfig>
            + EnvironmentRefresher
            + 'static,
    {
        Self {
            registry: applier.clone(),
            system_settings: applier.clone(),
            dotfiles: applier.clone(),
            env_vars: applier.clone(),
            services: applier.clone(),
            scheduled_tasks: applier.clone(),
            git: applier.clone(),
            wsl: applier.clone(),
            environment: applier,
        }
    }

    /// Replaces the dotfile applier.
    #[must_use]
    pub fn with_dotfiles(mut self, applier: Arc<dyn ItemApplier<Dotfile>>) -> Self {
        self.dotfiles = applier;
        self
    }

    /// Replaces the git applier.
    #[must_use]
    pub fn with_git(mut self, applier: Arc<dyn ItemApplier<GitConfig>>) -> Self {
        self.git = applier;
        self
    }
}
