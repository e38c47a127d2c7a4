//! Sections that need Windows system APIs.

use std::collections::BTreeMap;

use serde_json::Value;
use tracing::debug;
use winhome_engine::descriptor::{
    Dotfile, EnvVar, GitConfig, RegistryTweak, ScheduledTask, ServiceConfig, WslConfig,
};
use winhome_engine::identifiers::registry_item;
use winhome_engine::{
    ApplyError, EnvironmentRefresher, ItemApplier, RegistryApplier, SystemSettingsApplier,
};

use super::APPLIERS_TARGET;

/// Reports every item it is given as unsupported on this host.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct UnsupportedApplier;

fn unsupported(section: &'static str, item: impl Into<String>) -> Result<(), ApplyError> {
    Err(ApplyError::Unsupported {
        section,
        item: item.into(),
    })
}

impl RegistryApplier for UnsupportedApplier {
    fn apply(&self, tweak: &RegistryTweak, _dry_run: bool) -> Result<(), ApplyError> {
        unsupported("registry", registry_item(&tweak.path, &tweak.name))
    }

    fn revert(&self, path: &str, name: &str, _dry_run: bool) -> Result<(), ApplyError> {
        unsupported("registry", registry_item(path, name))
    }
}

impl SystemSettingsApplier for UnsupportedApplier {
    fn registry_tweaks(&self, _settings: &BTreeMap<String, Value>) -> Vec<RegistryTweak> {
        Vec::new()
    }

    fn apply_non_registry(
        &self,
        settings: &BTreeMap<String, Value>,
        _dry_run: bool,
    ) -> Result<(), ApplyError> {
        let keys: Vec<&str> = settings.keys().map(String::as_str).collect();
        unsupported("systemSettings", keys.join(", "))
    }

    fn capture(&self) -> BTreeMap<String, Value> {
        debug!(target: APPLIERS_TARGET, "system settings cannot be read on this host");
        BTreeMap::new()
    }
}

impl ItemApplier<EnvVar> for UnsupportedApplier {
    fn apply(&self, item: &EnvVar, _dry_run: bool) -> Result<(), ApplyError> {
        unsupported("envVars", item.variable.as_str())
    }
}

impl ItemApplier<ServiceConfig> for UnsupportedApplier {
    fn apply(&self, item: &ServiceConfig, _dry_run: bool) -> Result<(), ApplyError> {
        unsupported("services", item.name.as_str())
    }
}

impl ItemApplier<ScheduledTask> for UnsupportedApplier {
    fn apply(&self, item: &ScheduledTask, _dry_run: bool) -> Result<(), ApplyError> {
        unsupported("scheduledTasks", item.name.as_str())
    }
}

impl ItemApplier<WslConfig> for UnsupportedApplier {
    fn apply(&self, _item: &WslConfig, _dry_run: bool) -> Result<(), ApplyError> {
        unsupported("wsl", "wsl")
    }
}

impl ItemApplier<Dotfile> for UnsupportedApplier {
    fn apply(&self, item: &Dotfile, _dry_run: bool) -> Result<(), ApplyError> {
        unsupported("dotfiles", item.target.as_str())
    }
}

impl ItemApplier<GitConfig> for UnsupportedApplier {
    fn apply(&self, _item: &GitConfig, _dry_run: bool) -> Result<(), ApplyError> {
        unsupported("git", "global")
    }
}

impl EnvironmentRefresher for UnsupportedApplier {
    fn refresh(&self) {
        debug!(target: APPLIERS_TARGET, "environment refresh is not needed on this host");
    }
}
