//! Plugin discovery and runtime bootstrapping.
//!
//! [`PluginManager`] scans the immediate subdirectories of the plugins root
//! for `plugin.yaml` files. Each manifest is parsed independently; a broken
//! one is logged and skipped. Manifests are reloaded on every call so a run
//! always sees the plugins currently on disk.
//!
//! [`RuntimeInstaller`] is the seam used to check for and install the
//! interpreter (`uv` or `bun`) a plugin type requires.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};
use winhome_process::{ProcessCommand, ProcessRunner, RuntimeResolver, SystemProcessRunner};

use crate::error::PluginError;
use crate::manifest::{MANIFEST_FILE_NAME, PluginManifest, RuntimeFamily};

/// Tracing target for discovery and bootstrap events.
const MANAGER_TARGET: &str = "winhome_plugins::manager";

/// Budget for a `--version` probe.
const PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// Budget for a runtime installer script.
const INSTALL_TIMEOUT: Duration = Duration::from_secs(600);

/// Checks for and installs interpreter runtimes.
pub trait RuntimeInstaller: Send + Sync {
    /// Returns `true` when the runtime is present and answers `--version`.
    fn is_installed(&self, family: RuntimeFamily) -> bool;

    /// Installs the runtime.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::RuntimeUnavailable`] when the installer fails.
    fn install(&self, family: RuntimeFamily) -> Result<(), PluginError>;
}

/// Installs runtimes with their official install scripts.
pub struct ScriptRuntimeInstaller {
    resolver: RuntimeResolver,
    runner: Arc<dyn ProcessRunner>,
}

impl ScriptRuntimeInstaller {
    /// Creates an installer using `resolver` to locate tools.
    #[must_use]
    pub fn new(resolver: RuntimeResolver, runner: Arc<dyn ProcessRunner>) -> Self {
        Self { resolver, runner }
    }

    fn installer_command(family: RuntimeFamily) -> ProcessCommand {
        let command = if cfg!(windows) {
            let script = match family {
                RuntimeFamily::Uv => "irm https://astral.sh/uv/install.ps1 | iex",
                RuntimeFamily::Bun => "irm bun.sh/install.ps1 | iex",
            };
            ProcessCommand::new("powershell.exe").args([
                "-NoProfile",
                "-ExecutionPolicy",
                "Bypass",
                "-Command",
                script,
            ])
        } else {
            let script = match family {
                RuntimeFamily::Uv => "curl -LsSf https://astral.sh/uv/install.sh | sh",
                RuntimeFamily::Bun => "curl -fsSL https://bun.sh/install | bash",
            };
            ProcessCommand::new("/bin/sh").args(["-c", script])
        };
        command
            .timeout(INSTALL_TIMEOUT)
            .label(format!("{family}-installer"))
    }
}

impl RuntimeInstaller for ScriptRuntimeInstaller {
    fn is_installed(&self, family: RuntimeFamily) -> bool {
        let Some(tool) = self.resolver.resolve_existing(family.tool()) else {
            return false;
        };
        let probe = ProcessCommand::new(tool).args(["--version"]).timeout(PROBE_TIMEOUT);
        self.runner.run(&probe).is_ok_and(|output| output.success())
    }

    fn install(&self, family: RuntimeFamily) -> Result<(), PluginError> {
        let unavailable = |message: String| PluginError::RuntimeUnavailable {
            name: String::from("*"),
            runtime: family.tool().to_owned(),
            message,
        };
        let output = self
            .runner
            .run(&Self::installer_command(family))
            .map_err(|error| unavailable(error.to_string()))?;
        if !output.success() {
            return Err(unavailable(format!(
                "installer exited with status {}: {}",
                output.code.unwrap_or(-1),
                output.stderr.trim()
            )));
        }
        if !self.is_installed(family) {
            return Err(unavailable(String::from(
                "installer finished but the runtime is still not resolvable",
            )));
        }
        Ok(())
    }
}

/// Discovery and runtime management, as seen by the engine.
pub trait PluginCatalog: Send + Sync {
    /// Loads every valid manifest under the plugins root.
    fn discover(&self) -> Vec<PluginManifest>;

    /// Installs the runtime `plugin` needs when it is absent.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::RuntimeUnavailable`] when installation fails.
    fn ensure_runtime(&self, plugin: &PluginManifest) -> Result<(), PluginError>;

    /// Returns `true` when `plugin` can run without bootstrapping.
    fn runtime_available(&self, plugin: &PluginManifest) -> bool;
}

/// Filesystem-backed [`PluginCatalog`].
pub struct PluginManager {
    plugins_dir: PathBuf,
    installer: Arc<dyn RuntimeInstaller>,
}

impl PluginManager {
    /// Creates a manager over `plugins_dir` using `installer` for runtimes.
    #[must_use]
    pub fn new(plugins_dir: impl Into<PathBuf>, installer: Arc<dyn RuntimeInstaller>) -> Self {
        Self {
            plugins_dir: plugins_dir.into(),
            installer,
        }
    }

    /// Creates a manager that installs runtimes with their official scripts.
    #[must_use]
    pub fn with_default_installer(plugins_dir: impl Into<PathBuf>) -> Self {
        let installer = ScriptRuntimeInstaller::new(RuntimeResolver::new(), Arc::new(SystemProcessRunner));
        Self::new(plugins_dir, Arc::new(installer))
    }

    /// Root directory scanned for plugins.
    #[must_use]
    pub fn plugins_dir(&self) -> &Path {
        &self.plugins_dir
    }

    /// Lists plugin subdirectories in name order.
    fn plugin_directories(&self) -> Result<Vec<PathBuf>, PluginError> {
        let entries = fs::read_dir(&self.plugins_dir).map_err(|source| PluginError::Discovery {
            path: self.plugins_dir.clone(),
            source: Arc::new(source),
        })?;
        let mut dirs: Vec<PathBuf> = entries
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| path.is_dir())
            .collect();
        dirs.sort();
        Ok(dirs)
    }
}

impl PluginCatalog for PluginManager {
    fn discover(&self) -> Vec<PluginManifest> {
        if !self.plugins_dir.is_dir() {
            debug!(
                target: MANAGER_TARGET,
                dir = %self.plugins_dir.display(),
                "plugins directory does not exist"
            );
            return Vec::new();
        }

        let dirs = match self.plugin_directories() {
            Ok(dirs) => dirs,
            Err(error) => {
                warn!(target: MANAGER_TARGET, %error, "plugin discovery failed");
                return Vec::new();
            }
        };

        dirs.iter()
            .filter(|dir| dir.join(MANIFEST_FILE_NAME).is_file())
            .filter_map(|dir| match PluginManifest::load(dir) {
                Ok(manifest) => {
                    info!(
                        target: MANAGER_TARGET,
                        plugin = manifest.name(),
                        kind = %manifest.kind(),
                        version = manifest.version(),
                        "discovered plugin"
                    );
                    Some(manifest)
                }
                Err(error) => {
                    warn!(target: MANAGER_TARGET, %error, "skipping plugin with invalid manifest");
                    None
                }
            })
            .collect()
    }

    fn ensure_runtime(&self, plugin: &PluginManifest) -> Result<(), PluginError> {
        let Some(family) = plugin.kind().runtime() else {
            return Ok(());
        };
        if self.installer.is_installed(family) {
            return Ok(());
        }
        info!(
            target: MANAGER_TARGET,
            plugin = plugin.name(),
            runtime = family.tool(),
            "plugin runtime missing, installing"
        );
        self.installer.install(family).map_err(|error| match error {
            PluginError::RuntimeUnavailable { runtime, message, .. } => {
                PluginError::RuntimeUnavailable {
                    name: plugin.name().to_owned(),
                    runtime,
                    message,
                }
            }
            other => other,
        })
    }

    fn runtime_available(&self, plugin: &PluginManifest) -> bool {
        plugin
            .kind()
            .runtime()
            .is_none_or(|family| self.installer.is_installed(family))
    }
}
