//! Subcommand handlers and engine wiring.

use std::fs;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info, warn};
use winhome_config::Config;
use winhome_engine::{
    Descriptor, Engine, ManagerRegistry, NetworkCheck, RunOptions, RunSummary, TcpProbe,
    TokenResolver, TracingReporter, snapshot,
};
use winhome_plugins::{PluginCatalog, PluginManager, PluginRunner};
use winhome_process::{ProcessRunner, RuntimeResolver, SystemProcessRunner};
use winhome_state::StateStore;

use crate::appliers::{GitConfigurator, UnsupportedApplier, host_appliers};
use crate::cli::{ApplyArgs, GenerateArgs, PluginsAction, StateAction};
use crate::errors::CliError;

const CLI_TARGET: &str = "winhome_cli";

/// Loads the descriptor and runs the engine over it.
pub(crate) fn apply(
    config: &Config,
    args: &ApplyArgs,
    stdout: &mut dyn Write,
) -> Result<(), CliError> {
    if !args.config.is_file() {
        return Err(CliError::DescriptorMissing {
            path: args.config.clone(),
        });
    }
    debug!(target: CLI_TARGET, path = %args.config.display(), "reading descriptor");
    let mut descriptor = Descriptor::load(&args.config)?;
    TokenResolver::new().resolve_descriptor(&mut descriptor);
    log_descriptor(&descriptor);

    if args.dry_run {
        warn!(target: CLI_TARGET, "--- DRY RUN MODE: No changes will be made ---");
    }

    let options = RunOptions {
        dry_run: args.dry_run,
        profile: args.profile.clone(),
        diff_only: args.diff,
    };
    let engine = build_engine(config, descriptor_dir(&args.config));
    let summary = engine.run(&descriptor, &options, stdout)?;
    if !args.diff {
        writeln!(stdout, "{}", render_summary(&summary))?;
    }
    Ok(())
}

pub(crate) fn state(
    config: &Config,
    action: &StateAction,
    stdout: &mut dyn Write,
) -> Result<(), CliError> {
    let store = StateStore::new(config.state_file());
    match action {
        StateAction::List => {
            let items = store.list();
            if items.is_empty() {
                writeln!(stdout, "No managed items recorded.")?;
            }
            for item in items {
                writeln!(stdout, "{item}")?;
            }
        }
        StateAction::Backup { path } => {
            store.backup(path)?;
            writeln!(stdout, "State backed up to {}", path.display())?;
        }
        StateAction::Restore { path } => {
            store.restore(path)?;
            writeln!(stdout, "State restored from {}", path.display())?;
        }
    }
    Ok(())
}

pub(crate) fn plugins(
    config: &Config,
    action: &PluginsAction,
    stdout: &mut dyn Write,
) -> Result<(), CliError> {
    match action {
        PluginsAction::List => {
            let plugins = PluginManager::with_default_installer(config.plugins_dir()).discover();
            if plugins.is_empty() {
                writeln!(
                    stdout,
                    "No plugins found in {}",
                    config.plugins_dir().display()
                )?;
            }
            for plugin in plugins {
                writeln!(
                    stdout,
                    "{} {} ({}) [{}]",
                    plugin.name(),
                    plugin.version(),
                    plugin.kind(),
                    plugin.capabilities().join(", ")
                )?;
            }
        }
    }
    Ok(())
}

/// Captures installed packages, settings and the git identity as YAML.
pub(crate) fn generate(args: &GenerateArgs, stdout: &mut dyn Write) -> Result<(), CliError> {
    let resolver = RuntimeResolver::new();
    let runner: Arc<dyn ProcessRunner> = Arc::new(SystemProcessRunner);
    let registry = ManagerRegistry::with_builtins(&runner, &resolver);
    let mut descriptor = snapshot::capture(&registry, &UnsupportedApplier, &TracingReporter);
    descriptor.git = GitConfigurator::new(runner, resolver).capture();
    let yaml = descriptor.to_yaml()?;
    match &args.output {
        Some(path) => {
            fs::write(path, yaml).map_err(|source| CliError::WriteFile {
                path: path.clone(),
                source,
            })?;
            writeln!(stdout, "Configuration written to {}", path.display())?;
        }
        None => write!(stdout, "{yaml}")?,
    }
    Ok(())
}

fn build_engine(config: &Config, descriptor_dir: &Path) -> Engine {
    let resolver = RuntimeResolver::new();
    let runner: Arc<dyn ProcessRunner> = Arc::new(SystemProcessRunner);
    let executor = PluginRunner::new(resolver.clone())
        .with_timeout(config.plugin_timeout())
        .with_output_limit(config.plugin_output_limit());
    let network = NetworkCheck::new(
        Arc::new(TcpProbe::new(config.network_probe_host())),
        config.network_timeout(),
        config.network_interval(),
    );
    Engine::new(
        Arc::new(StateStore::new(config.state_file())),
        Arc::new(PluginManager::with_default_installer(config.plugins_dir())),
        Arc::new(executor),
        host_appliers(&runner, &resolver, descriptor_dir),
    )
    .with_registry(ManagerRegistry::with_builtins(&runner, &resolver))
    .with_network_check(network)
    .with_max_parallelism(config.max_parallelism())
}

fn descriptor_dir(path: &Path) -> &Path {
    path.parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."))
}

fn log_descriptor(descriptor: &Descriptor) {
    debug!(
        target: CLI_TARGET,
        version = %descriptor.version,
        apps = descriptor.apps.len(),
        dotfiles = descriptor.dotfiles.len(),
        env_vars = descriptor.env_vars.len(),
        registry_tweaks = descriptor.registry_tweaks.len(),
        services = descriptor.services.len(),
        scheduled_tasks = descriptor.scheduled_tasks.len(),
        wsl = descriptor.wsl.is_some(),
        git = descriptor.git.is_some(),
        profiles = descriptor.profiles.len(),
        extensions = descriptor.extensions.len(),
        "descriptor loaded"
    );
    for (key, value) in &descriptor.system_settings {
        debug!(target: CLI_TARGET, setting = %key, %value, "system setting");
    }
    info!(target: CLI_TARGET, apps = descriptor.apps.len(), "descriptor ready");
}

fn render_summary(summary: &RunSummary) -> String {
    format!(
        "Summary: {} installed, {} unchanged, {} applied, {} removed, {} skipped, {} failed",
        summary.installed,
        summary.unchanged,
        summary.applied,
        summary.removed,
        summary.skipped,
        summary.failed
    )
}
