//! Resource managers and their registry.
//!
//! A [`ResourceManager`] installs and removes packages for one ecosystem.
//! Built-in managers drive a command-line tool ([`CommandManager`]); plugin
//! managers speak the stdio protocol ([`PluginPackageManager`]). The
//! [`ManagerRegistry`] maps names to managers for one run.

mod command;
mod plugin;

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::debug;
use winhome_process::{ProcessRunner, RuntimeResolver};

use crate::descriptor::AppSpec;
use crate::error::ManagerError;

pub use self::command::{CommandManager, ManagerKind};
pub use self::plugin::{PluginPackageManager, RuntimeStatus};

/// Tracing target for manager operations.
const MANAGERS_TARGET: &str = "winhome_engine::managers";

/// Capability set every package manager provides.
pub trait ResourceManager: Send + Sync {
    /// Registry name (`winget`, or the plugin name).
    fn name(&self) -> &str;

    /// Returns `true` when the manager can be used right now.
    fn is_available(&self) -> bool;

    /// Installs the manager itself. In dry-run mode only reports.
    ///
    /// # Errors
    ///
    /// Returns [`ManagerError`] when installation fails or is unsupported.
    fn bootstrap(&self, dry_run: bool) -> Result<(), ManagerError>;

    /// Returns `true` when `id` is already installed.
    fn is_installed(&self, id: &str) -> bool;

    /// Installs `app`. In dry-run mode only reports.
    ///
    /// # Errors
    ///
    /// Returns [`ManagerError`] when the install fails.
    fn install(&self, app: &AppSpec, dry_run: bool) -> Result<(), ManagerError>;

    /// Removes `id`. In dry-run mode only reports.
    ///
    /// # Errors
    ///
    /// Returns [`ManagerError`] when the removal fails.
    fn uninstall(&self, id: &str, dry_run: bool) -> Result<(), ManagerError>;

    /// Ids of every package the manager currently has installed.
    ///
    /// # Errors
    ///
    /// Returns [`ManagerError::ListingUnsupported`] unless the manager can
    /// enumerate its packages, or any error from running the listing.
    fn installed_packages(&self) -> Result<Vec<String>, ManagerError> {
        Err(ManagerError::ListingUnsupported {
            manager: self.name().to_owned(),
        })
    }
}

/// Name-to-manager mapping for one run.
#[derive(Clone, Default)]
pub struct ManagerRegistry {
    managers: BTreeMap<String, Arc<dyn ResourceManager>>,
}

impl ManagerRegistry {
    /// Empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding `winget`, `choco`, `scoop` and `mise`.
    #[must_use]
    pub fn with_builtins(runner: &Arc<dyn ProcessRunner>, resolver: &RuntimeResolver) -> Self {
        let mut registry = Self::new();
        for kind in ManagerKind::ALL {
            registry.register(Arc::new(CommandManager::new(
                kind,
                Arc::clone(runner),
                resolver.clone(),
            )));
        }
        registry
    }

    /// Adds `manager` unless its name is taken. Returns whether it was added.
    pub fn register(&mut self, manager: Arc<dyn ResourceManager>) -> bool {
        let name = manager.name().to_owned();
        if self.managers.contains_key(&name) {
            debug!(target: MANAGERS_TARGET, manager = %name, "manager name already registered");
            return false;
        }
        self.managers.insert(name, manager);
        true
    }

    /// Looks up a manager by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<dyn ResourceManager>> {
        self.managers.get(name).cloned()
    }

    /// Returns `true` when `name` is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.managers.contains_key(name)
    }

    /// Registered names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.managers.keys().map(String::as_str)
    }

    /// Number of registered managers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.managers.len()
    }

    /// Returns `true` when nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.managers.is_empty()
    }
}

#[cfg(test)]
mod tests;
