//! Resource manager backed by a `package_manager` plugin.

use std::sync::{Arc, Mutex, PoisonError};

use serde_json::json;
use tracing::info;
use winhome_plugins::{PluginCatalog, PluginContext, PluginExecutor, PluginManifest, PluginResult};

use super::{MANAGERS_TARGET, ResourceManager};
use crate::descriptor::AppSpec;
use crate::error::ManagerError;

/// Cached knowledge about a plugin's interpreter runtime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RuntimeStatus {
    /// Not checked yet this run.
    #[default]
    Unchecked,
    /// The runtime answered its version query, or was just installed.
    Available,
    /// The runtime is absent.
    Missing,
}

/// Adapts a plugin manifest to the [`ResourceManager`] contract.
///
/// Each operation is one protocol call: `check_installed`, `install` or
/// `uninstall`, with the package id (and version and params for install) as
/// arguments and the dry-run flag as context.
pub struct PluginPackageManager {
    manifest: PluginManifest,
    executor: Arc<dyn PluginExecutor>,
    catalog: Arc<dyn PluginCatalog>,
    status: Mutex<RuntimeStatus>,
}

impl PluginPackageManager {
    /// Wraps `manifest`. Nothing is executed until the first operation.
    #[must_use]
    pub fn new(
        manifest: PluginManifest,
        executor: Arc<dyn PluginExecutor>,
        catalog: Arc<dyn PluginCatalog>,
    ) -> Self {
        Self {
            manifest,
            executor,
            catalog,
            status: Mutex::new(RuntimeStatus::Unchecked),
        }
    }

    /// Current cached runtime status.
    #[must_use]
    pub fn runtime_status(&self) -> RuntimeStatus {
        *self.status.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_status(&self, status: RuntimeStatus) {
        *self.status.lock().unwrap_or_else(PoisonError::into_inner) = status;
    }

    fn ensure_runtime(&self) -> Result<(), ManagerError> {
        if self.runtime_status() == RuntimeStatus::Available {
            return Ok(());
        }
        match self.catalog.ensure_runtime(&self.manifest) {
            Ok(()) => {
                self.set_status(RuntimeStatus::Available);
                Ok(())
            }
            Err(error) => {
                self.set_status(RuntimeStatus::Missing);
                Err(ManagerError::Runtime {
                    manager: self.manifest.name().to_owned(),
                    message: error.to_string(),
                })
            }
        }
    }

    /// Makes sure the runtime is present before a mutating call. A dry run
    /// only looks: it returns `false` when the runtime is missing and never
    /// installs it.
    fn runtime_ready(&self, dry_run: bool) -> Result<bool, ManagerError> {
        if dry_run {
            return Ok(self.is_available());
        }
        self.ensure_runtime().map(|()| true)
    }

    fn call(
        &self,
        action: &'static str,
        item: &str,
        args: serde_json::Value,
        dry_run: bool,
    ) -> Result<PluginResult, ManagerError> {
        let result = self
            .executor
            .execute(&self.manifest, action, args, PluginContext::new(dry_run));
        if result.success {
            return Ok(result);
        }
        Err(ManagerError::Plugin {
            manager: self.manifest.name().to_owned(),
            action,
            item: item.to_owned(),
            message: result.error_message().to_owned(),
        })
    }
}

impl ResourceManager for PluginPackageManager {
    fn name(&self) -> &str {
        self.manifest.name()
    }

    fn is_available(&self) -> bool {
        let mut status = self.status.lock().unwrap_or_else(PoisonError::into_inner);
        if *status == RuntimeStatus::Unchecked {
            *status = if self.catalog.runtime_available(&self.manifest) {
                RuntimeStatus::Available
            } else {
                RuntimeStatus::Missing
            };
        }
        *status == RuntimeStatus::Available
    }

    fn bootstrap(&self, dry_run: bool) -> Result<(), ManagerError> {
        if dry_run {
            info!(
                target: MANAGERS_TARGET,
                manager = self.manifest.name(),
                kind = %self.manifest.kind(),
                dry_run,
                "would install plugin runtime"
            );
            return Ok(());
        }
        self.ensure_runtime()
    }

    fn is_installed(&self, id: &str) -> bool {
        self.call("check_installed", id, json!({ "packageId": id }), false)
            .is_ok_and(|result| result.data_is_true())
    }

    fn install(&self, app: &AppSpec, dry_run: bool) -> Result<(), ManagerError> {
        if !self.runtime_ready(dry_run)? {
            info!(
                target: MANAGERS_TARGET,
                manager = self.manifest.name(),
                item = %app.id,
                dry_run,
                "would install once the plugin runtime is present"
            );
            return Ok(());
        }
        let args = json!({
            "packageId": app.id,
            "version": app.version,
            "params": app.params,
        });
        let result = self.call("install", &app.id, args, dry_run)?;
        info!(
            target: MANAGERS_TARGET,
            manager = self.manifest.name(),
            item = %app.id,
            changed = result.changed,
            dry_run,
            "plugin install finished"
        );
        Ok(())
    }

    fn uninstall(&self, id: &str, dry_run: bool) -> Result<(), ManagerError> {
        if !self.runtime_ready(dry_run)? {
            info!(
                target: MANAGERS_TARGET,
                manager = self.manifest.name(),
                item = id,
                dry_run,
                "would uninstall once the plugin runtime is present"
            );
            return Ok(());
        }
        let result = self.call("uninstall", id, json!({ "packageId": id }), dry_run)?;
        info!(
            target: MANAGERS_TARGET,
            manager = self.manifest.name(),
            item = id,
            changed = result.changed,
            dry_run,
            "plugin uninstall finished"
        );
        Ok(())
    }
}
