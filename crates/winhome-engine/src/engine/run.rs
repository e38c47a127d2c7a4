//! Phases of a single reconciliation run.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use serde_json::Value;
use tracing::debug;
use winhome_plugins::{PACKAGE_MANAGER_CAPABILITY, PluginContext, PluginManifest};

use super::{Engine, RunSummary};
use crate::descriptor::{Descriptor, RegistryTweak};
use crate::error::ApplyError;
use crate::identifiers::{ItemId, app_item, registry_item};
use crate::managers::{ManagerRegistry, PluginPackageManager};
use crate::pool::fan_out;

const ENGINE_TARGET: &str = "winhome_engine::engine";

/// Desired identifiers plus the registry values behind them.
pub(super) struct DesiredState {
    pub(super) items: BTreeSet<String>,
    pub(super) registry_tweaks: Vec<RegistryTweak>,
}

#[derive(Default)]
struct Tally {
    removed: AtomicUsize,
    installed: AtomicUsize,
    unchanged: AtomicUsize,
    applied: AtomicUsize,
    skipped: AtomicUsize,
    failed: AtomicUsize,
}

fn bump(counter: &AtomicUsize) {
    counter.fetch_add(1, Ordering::Relaxed);
}

impl Tally {
    fn summary(&self, state_saved: bool) -> RunSummary {
        RunSummary {
            removed: self.removed.load(Ordering::Relaxed),
            installed: self.installed.load(Ordering::Relaxed),
            unchanged: self.unchanged.load(Ordering::Relaxed),
            applied: self.applied.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            state_saved,
        }
    }
}

/// Mutable state of one run: its own manager registry and the counters.
pub(super) struct RunContext<'e> {
    engine: &'e Engine,
    registry: ManagerRegistry,
    dry_run: bool,
    tally: Tally,
}

impl<'e> RunContext<'e> {
    pub(super) fn new(engine: &'e Engine, dry_run: bool) -> Self {
        Self {
            engine,
            registry: engine.registry.clone(),
            dry_run,
            tally: Tally::default(),
        }
    }

    /// Discovers plugins and registers the package managers among them.
    /// Names already registered keep their manager.
    pub(super) fn register_plugins(&mut self) -> Vec<PluginManifest> {
        let plugins = self.engine.catalog.discover();
        for plugin in &plugins {
            if !plugin.has_capability(PACKAGE_MANAGER_CAPABILITY) {
                continue;
            }
            let adapter = PluginPackageManager::new(
                plugin.clone(),
                Arc::clone(&self.engine.executor),
                Arc::clone(&self.engine.catalog),
            );
            if self.registry.register(Arc::new(adapter)) {
                debug!(target: ENGINE_TARGET, plugin = plugin.name(), "registered plugin manager");
            } else {
                self.engine.reporter.warning(&format!(
                    "Plugin '{}' is named like an existing manager and was not registered.",
                    plugin.name()
                ));
            }
        }
        plugins
    }

    pub(super) fn desired_state(&self, descriptor: &Descriptor) -> DesiredState {
        let mut registry_tweaks = descriptor.registry_tweaks.clone();
        registry_tweaks.extend(
            self.engine
                .appliers
                .system_settings
                .registry_tweaks(&descriptor.system_settings),
        );
        let items = descriptor
            .apps
            .iter()
            .map(|app| app_item(&app.manager, &app.id))
            .chain(
                registry_tweaks
                    .iter()
                    .map(|tweak| registry_item(&tweak.path, &tweak.name)),
            )
            .collect();
        DesiredState {
            items,
            registry_tweaks,
        }
    }

    /// Removes recorded items absent from `desired`.
    pub(super) fn remove_stale(&self, previous: &BTreeSet<String>, desired: &BTreeSet<String>) {
        let stale: Vec<&String> = previous.difference(desired).collect();
        if stale.is_empty() {
            return;
        }
        self.engine.reporter.info("--- Cleaning up removed items ---");
        fan_out(&stale, self.engine.max_parallelism, |item| {
            self.remove_item(item);
        });
    }

    fn remove_item(&self, item: &str) {
        let reporter = &self.engine.reporter;
        let outcome = match ItemId::parse(item) {
            Some(ItemId::Registry { path, name }) => {
                match self.engine.appliers.registry.revert(path, name, self.dry_run) {
                    Err(error @ ApplyError::Unsupported { .. }) => {
                        reporter.warning(&format!("Skipped: {error}"));
                        bump(&self.tally.skipped);
                        return;
                    }
                    outcome => outcome.map_err(|error| error.to_string()),
                }
            }
            Some(ItemId::App { manager, id }) => {
                let Some(resolved) = self.registry.get(manager) else {
                    reporter.warning(&format!(
                        "Unknown manager '{manager}'; cannot remove {item}."
                    ));
                    bump(&self.tally.skipped);
                    return;
                };
                resolved
                    .uninstall(id, self.dry_run)
                    .map_err(|error| error.to_string())
            }
            None => {
                reporter.warning(&format!("Ignoring malformed state entry '{item}'."));
                bump(&self.tally.skipped);
                return;
            }
        };
        match outcome {
            Ok(()) if self.dry_run => {
                reporter.info(&format!("[Dry Run] Would remove {item}"));
                bump(&self.tally.removed);
            }
            Ok(()) => {
                reporter.success(&format!("Removed {item}"));
                bump(&self.tally.removed);
            }
            Err(message) => {
                reporter.error(&format!("Failed to remove {item}: {message}"));
                bump(&self.tally.failed);
            }
        }
    }

    /// Bootstraps each referenced manager that is unavailable. Returns the
    /// names of managers that are usable afterwards.
    pub(super) fn bootstrap_managers(&self, descriptor: &Descriptor) -> BTreeSet<String> {
        let reporter = &self.engine.reporter;
        let mut usable = BTreeSet::new();
        for name in descriptor.referenced_managers() {
            let Some(manager) = self.registry.get(name) else {
                reporter.error(&format!("Unknown manager '{name}'; its apps are skipped."));
                continue;
            };
            if manager.is_available() {
                usable.insert(name.to_owned());
                continue;
            }
            reporter.warning(&format!("Manager '{name}' is not available. Bootstrapping..."));
            if let Err(error) = manager.bootstrap(self.dry_run) {
                reporter.error(&format!("Failed to bootstrap '{name}': {error}"));
                continue;
            }
            if self.dry_run {
                reporter.info(&format!(
                    "[Dry Run] Would bootstrap '{name}'; its apps are skipped."
                ));
                continue;
            }
            if manager.is_available() {
                reporter.success(&format!("Manager '{name}' is ready."));
                usable.insert(name.to_owned());
            } else {
                reporter.error(&format!(
                    "Manager '{name}' is still unavailable; its apps are skipped."
                ));
            }
        }
        usable
    }

    /// Installs apps one at a time in descriptor order.
    pub(super) fn install_apps(&self, descriptor: &Descriptor, usable: &BTreeSet<String>) {
        if descriptor.apps.is_empty() {
            return;
        }
        let engine = self.engine;
        engine.reporter.info("--- Installing apps ---");
        for app in &descriptor.apps {
            let item = app_item(&app.manager, &app.id);
            let manager = match self.registry.get(&app.manager) {
                Some(manager) if usable.contains(&app.manager) => manager,
                _ => {
                    bump(&self.tally.skipped);
                    continue;
                }
            };
            if manager.is_installed(&app.id) {
                engine.reporter.info(&format!("{item} is already installed."));
                bump(&self.tally.unchanged);
                self.record(&item);
                continue;
            }
            match manager.install(app, self.dry_run) {
                Ok(()) if self.dry_run => {
                    engine.reporter.info(&format!("[Dry Run] Would install {item}"));
                    bump(&self.tally.installed);
                }
                Ok(()) => {
                    engine.reporter.success(&format!("Installed {item}"));
                    bump(&self.tally.installed);
                    self.record(&item);
                    engine.appliers.environment.refresh();
                }
                Err(error) => {
                    engine.reporter.error(&format!("Failed to install {item}: {error}"));
                    bump(&self.tally.failed);
                }
            }
        }
    }

    /// Applies every non-empty configuration section in a fixed order.
    pub(super) fn apply_sections(
        &self,
        descriptor: &Descriptor,
        registry_tweaks: &[RegistryTweak],
        plugins: &[PluginManifest],
    ) {
        let appliers = &self.engine.appliers;
        let dry_run = self.dry_run;

        if let Some(git) = &descriptor.git {
            self.apply_each("Git", std::slice::from_ref(git), |_| String::from("global"), |git| {
                appliers.git.apply(git, dry_run)
            });
        }
        if let Some(wsl) = &descriptor.wsl {
            self.apply_each("WSL", std::slice::from_ref(wsl), |_| String::from("wsl"), |wsl| {
                appliers.wsl.apply(wsl, dry_run)
            });
        }
        self.apply_each(
            "Environment",
            &descriptor.env_vars,
            |var| var.variable.clone(),
            |var| appliers.env_vars.apply(var, dry_run),
        );
        self.apply_extensions(descriptor, plugins);
        self.apply_each(
            "Registry",
            registry_tweaks,
            |tweak| registry_item(&tweak.path, &tweak.name),
            |tweak| {
                appliers.registry.apply(tweak, dry_run)?;
                self.record(&registry_item(&tweak.path, &tweak.name));
                Ok(())
            },
        );
        if !descriptor.system_settings.is_empty() {
            self.apply_each(
                "System Settings",
                std::slice::from_ref(&descriptor.system_settings),
                |_| String::from("settings"),
                |settings| appliers.system_settings.apply_non_registry(settings, dry_run),
            );
        }
        self.apply_each(
            "Dotfiles",
            &descriptor.dotfiles,
            |dotfile| dotfile.target.clone(),
            |dotfile| appliers.dotfiles.apply(dotfile, dry_run),
        );
        self.apply_each(
            "Services",
            &descriptor.services,
            |service| service.name.clone(),
            |service| appliers.services.apply(service, dry_run),
        );
        self.apply_each(
            "Scheduled Tasks",
            &descriptor.scheduled_tasks,
            |task| task.name.clone(),
            |task| appliers.scheduled_tasks.apply(task, dry_run),
        );
    }

    /// Sends each extension block to the plugin of the same name as an
    /// `apply` command. Blocks naming no discovered plugin are skipped.
    fn apply_extensions(&self, descriptor: &Descriptor, plugins: &[PluginManifest]) {
        let mut targets: Vec<(&PluginManifest, &Value)> = Vec::new();
        for (name, config) in &descriptor.extensions {
            match plugins.iter().find(|plugin| plugin.name() == name.as_str()) {
                Some(plugin) => targets.push((plugin, config)),
                None => {
                    self.engine.reporter.warning(&format!(
                        "No plugin named '{name}' is installed; extension skipped."
                    ));
                    bump(&self.tally.skipped);
                }
            }
        }
        let catalog = &self.engine.catalog;
        let executor = &self.engine.executor;
        let dry_run = self.dry_run;
        self.apply_each(
            "Extensions",
            &targets,
            |(plugin, _)| plugin.name().to_owned(),
            |(plugin, config)| {
                let failed = |message: String| ApplyError::Failed {
                    section: "extensions",
                    item: plugin.name().to_owned(),
                    message,
                };
                if !dry_run {
                    catalog
                        .ensure_runtime(plugin)
                        .map_err(|error| failed(error.to_string()))?;
                } else if !catalog.runtime_available(plugin) {
                    debug!(
                        target: ENGINE_TARGET,
                        plugin = plugin.name(),
                        "runtime missing; extension not invoked during dry run"
                    );
                    return Ok(());
                }
                let result = executor.execute(
                    plugin,
                    "apply",
                    (*config).clone(),
                    PluginContext::new(dry_run),
                );
                if result.success {
                    Ok(())
                } else {
                    Err(failed(result.error_message().to_owned()))
                }
            },
        );
    }

    /// Applies `items` on the worker pool, reporting and counting each.
    fn apply_each<T, L, A>(&self, section: &str, items: &[T], label: L, apply: A)
    where
        T: Sync,
        L: Fn(&T) -> String + Sync,
        A: Fn(&T) -> Result<(), ApplyError> + Sync,
    {
        if items.is_empty() {
            return;
        }
        let reporter = &self.engine.reporter;
        reporter.info(&format!("--- Applying {section} ---"));
        fan_out(items, self.engine.max_parallelism, |item| {
            let name = label(item);
            match apply(item) {
                Ok(()) if self.dry_run => {
                    reporter.info(&format!("[Dry Run] Would apply {section} '{name}'"));
                    bump(&self.tally.applied);
                }
                Ok(()) => {
                    reporter.success(&format!("Applied {section} '{name}'"));
                    bump(&self.tally.applied);
                }
                Err(error @ ApplyError::Unsupported { .. }) => {
                    reporter.warning(&format!("Skipped: {error}"));
                    bump(&self.tally.skipped);
                }
                Err(error) => {
                    reporter.error(&format!("Failed: {error}"));
                    bump(&self.tally.failed);
                }
            }
        });
    }

    /// Records `item` in the state store outside dry runs.
    fn record(&self, item: &str) {
        if self.dry_run {
            return;
        }
        if let Err(error) = self.engine.state.mark_applied(item) {
            self.engine
                .reporter
                .error(&format!("Failed to record {item}: {error}"));
            bump(&self.tally.failed);
        }
    }

    /// Replaces the recorded set with `desired` outside dry runs.
    pub(super) fn persist(&self, desired: &BTreeSet<String>) -> RunSummary {
        let reporter = &self.engine.reporter;
        if self.dry_run {
            reporter.info("[Dry Run] State was NOT saved.");
            return self.tally.summary(false);
        }
        match self.engine.state.save(desired) {
            Ok(()) => {
                reporter.success("[State Saved] Configuration synced.");
                self.tally.summary(true)
            }
            Err(error) => {
                reporter.error(&format!("Failed to save state: {error}"));
                bump(&self.tally.failed);
                self.tally.summary(false)
            }
        }
    }
}
