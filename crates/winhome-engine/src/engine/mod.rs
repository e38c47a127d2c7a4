//! The reconciliation engine.
//!
//! [`Engine::run`] drives one reconciliation in a fixed phase order:
//!
//! 1. discover plugins and register `package_manager` plugins as managers;
//! 2. merge the requested profile;
//! 3. for a diff-only run, print the diff and stop;
//! 4. wait for the network when anything will be downloaded;
//! 5. compute the desired identifier set and load the recorded one;
//! 6. remove recorded items that are no longer desired (fanned out);
//! 7. bootstrap every referenced manager that is unavailable;
//! 8. install apps strictly in descriptor order, then apply each
//!    configuration section (items within a section fanned out);
//! 9. save the desired set unless this is a dry run.
//!
//! Item failures are reported and counted but never stop a run. Only a
//! missing profile outside dry-run mode aborts.

mod run;

use std::borrow::Cow;
use std::io::Write;
use std::sync::Arc;

use winhome_plugins::{PluginCatalog, PluginExecutor};
use winhome_state::StateStore;

use crate::appliers::Appliers;
use crate::descriptor::Descriptor;
use crate::diff::StateDiff;
use crate::error::EngineError;
use crate::managers::ManagerRegistry;
use crate::network::NetworkCheck;
use crate::reporter::{Reporter, TracingReporter};

use self::run::RunContext;

/// Worker bound used when none is configured.
const DEFAULT_PARALLELISM: usize = 4;

/// Per-run switches.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunOptions {
    /// Evaluate everything, change nothing, save nothing.
    pub dry_run: bool,
    /// Profile to merge over the base descriptor.
    pub profile: Option<String>,
    /// Print the state diff and stop.
    pub diff_only: bool,
}

/// Counts of what a run did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Recorded items removed or reverted.
    pub removed: usize,
    /// Apps installed (or that would be, in dry run).
    pub installed: usize,
    /// Apps found already installed.
    pub unchanged: usize,
    /// Configuration items applied.
    pub applied: usize,
    /// Items skipped as unsupported or unmanageable.
    pub skipped: usize,
    /// Items that failed.
    pub failed: usize,
    /// Whether the state file was written.
    pub state_saved: bool,
}

/// Orchestrates managers, plugins, appliers and the state store.
pub struct Engine {
    registry: ManagerRegistry,
    catalog: Arc<dyn PluginCatalog>,
    executor: Arc<dyn PluginExecutor>,
    state: Arc<StateStore>,
    appliers: Appliers,
    reporter: Arc<dyn Reporter>,
    network: Option<NetworkCheck>,
    max_parallelism: usize,
}

impl Engine {
    /// Creates an engine with no built-in managers, no network check and a
    /// tracing reporter.
    #[must_use]
    pub fn new(
        state: Arc<StateStore>,
        catalog: Arc<dyn PluginCatalog>,
        executor: Arc<dyn PluginExecutor>,
        appliers: Appliers,
    ) -> Self {
        Self {
            registry: ManagerRegistry::new(),
            catalog,
            executor,
            state,
            appliers,
            reporter: Arc::new(TracingReporter),
            network: None,
            max_parallelism: DEFAULT_PARALLELISM,
        }
    }

    /// Managers registered before plugins are discovered. Plugin managers
    /// never replace these.
    #[must_use]
    pub fn with_registry(mut self, registry: ManagerRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Replaces the reporter.
    #[must_use]
    pub fn with_reporter(mut self, reporter: Arc<dyn Reporter>) -> Self {
        self.reporter = reporter;
        self
    }

    /// Enables the reachability wait before downloads.
    #[must_use]
    pub fn with_network_check(mut self, check: NetworkCheck) -> Self {
        self.network = Some(check);
        self
    }

    /// Bounds the workers used by fanned-out phases.
    #[must_use]
    pub fn with_max_parallelism(mut self, workers: usize) -> Self {
        self.max_parallelism = workers.max(1);
        self
    }

    /// Reconciles the host with `descriptor`.
    ///
    /// The diff of a diff-only run is written to `out`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Descriptor`] when the requested profile does
    /// not exist outside dry-run mode, and [`EngineError::Output`] when the
    /// diff cannot be written.
    pub fn run(
        &self,
        descriptor: &Descriptor,
        options: &RunOptions,
        out: &mut dyn Write,
    ) -> Result<RunSummary, EngineError> {
        self.reporter
            .info(&format!("--- WinHome v{} ---", descriptor.version));

        let mut context = RunContext::new(self, options.dry_run);
        let plugins = context.register_plugins();
        let descriptor = self.resolve_profile(descriptor, options)?;
        let desired = context.desired_state(&descriptor);

        if options.diff_only {
            let previous = self.state.load();
            StateDiff::between(&previous, &desired.items).render(out)?;
            return Ok(RunSummary::default());
        }

        if descriptor.needs_network() && !options.dry_run {
            self.wait_for_network();
        }

        let previous = self.state.load();
        context.remove_stale(&previous, &desired.items);
        let usable = context.bootstrap_managers(&descriptor);
        context.install_apps(&descriptor, &usable);
        context.apply_sections(&descriptor, &desired.registry_tweaks, &plugins);
        Ok(context.persist(&desired.items))
    }

    fn resolve_profile<'d>(
        &self,
        descriptor: &'d Descriptor,
        options: &RunOptions,
    ) -> Result<Cow<'d, Descriptor>, EngineError> {
        let Some(name) = options.profile.as_deref() else {
            return Ok(Cow::Borrowed(descriptor));
        };
        match descriptor.with_profile(name) {
            Ok(merged) => {
                self.reporter.info(&format!("[Profile] Activating '{name}'..."));
                Ok(Cow::Owned(merged))
            }
            Err(error) => {
                self.reporter.error(&format!("[Error] {error}"));
                if options.dry_run {
                    Ok(Cow::Borrowed(descriptor))
                } else {
                    Err(error.into())
                }
            }
        }
    }

    fn wait_for_network(&self) {
        let Some(check) = &self.network else {
            return;
        };
        self.reporter.info("Checking network connectivity...");
        if !check.wait() {
            self.reporter
                .warning("Network is unreachable; downloads may fail.");
        }
    }
}

#[cfg(test)]
mod tests;
