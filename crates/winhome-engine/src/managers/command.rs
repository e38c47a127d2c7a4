//! Built-in managers backed by a package manager command line.

use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use serde_json::Value;
use tracing::{info, warn};
use winhome_process::{ProcessCommand, ProcessOutput, ProcessRunner, RuntimeResolver};

use super::{MANAGERS_TARGET, ResourceManager};
use crate::descriptor::AppSpec;
use crate::error::ManagerError;

/// Budget for version probes and list queries.
const QUERY_TIMEOUT: Duration = Duration::from_secs(60);

/// Budget for installs, removals and bootstraps.
const CHANGE_TIMEOUT: Duration = Duration::from_secs(30 * 60);

/// File name winget exports its package list to.
const WINGET_EXPORT_FILE: &str = "winget-export.json";

/// How a manager gets itself onto the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Bootstrap {
    /// Cannot be automated; carries a hint for the user.
    Manual(&'static str),
    /// A PowerShell script.
    PowerShell(&'static str),
    /// Another tool's install command.
    Via {
        tool: &'static str,
        args: &'static [&'static str],
    },
}

/// The command-line package managers known out of the box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ManagerKind {
    /// Windows Package Manager.
    Winget,
    /// Chocolatey.
    Choco,
    /// Scoop.
    Scoop,
    /// mise (global tool versions).
    Mise,
}

impl ManagerKind {
    /// Every built-in kind.
    pub const ALL: [Self; 4] = [Self::Winget, Self::Choco, Self::Scoop, Self::Mise];

    /// Registry name, also the executable name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Winget => "winget",
            Self::Choco => "choco",
            Self::Scoop => "scoop",
            Self::Mise => "mise",
        }
    }

    const fn probe_args(self) -> &'static [&'static str] {
        match self {
            Self::Choco => &["-v"],
            Self::Winget | Self::Scoop | Self::Mise => &["--version"],
        }
    }

    fn install_args(self, app: &AppSpec) -> Vec<String> {
        let id = app.id.clone();
        match self {
            Self::Winget => {
                let mut args = strings(&["install", "--id"]);
                args.push(id);
                args.extend(strings(&[
                    "-e",
                    "--silent",
                    "--accept-package-agreements",
                    "--accept-source-agreements",
                ]));
                if let Some(source) = app.source.as_deref().filter(|source| !source.is_empty()) {
                    args.push(String::from("--source"));
                    args.push(source.to_owned());
                }
                args
            }
            Self::Choco => vec![String::from("install"), id, String::from("-y")],
            Self::Scoop => vec![String::from("install"), id],
            Self::Mise => vec![
                String::from("use"),
                String::from("--global"),
                id,
                String::from("-y"),
            ],
        }
    }

    fn uninstall_args(self, id: &str) -> Vec<String> {
        let id = id.to_owned();
        match self {
            Self::Winget => vec![
                String::from("uninstall"),
                String::from("--id"),
                id,
                String::from("-e"),
                String::from("--silent"),
                String::from("--accept-source-agreements"),
            ],
            Self::Choco => vec![String::from("uninstall"), id, String::from("-y")],
            Self::Scoop => vec![String::from("uninstall"), id],
            Self::Mise => vec![String::from("unuse"), String::from("--global"), id],
        }
    }

    fn list_args(self, id: &str) -> Vec<String> {
        match self {
            Self::Winget => vec![String::from("list"), String::from("-q"), id.to_owned()],
            Self::Choco => vec![
                String::from("list"),
                String::from("-l"),
                String::from("-r"),
                id.to_owned(),
            ],
            Self::Scoop => strings(&["list"]),
            Self::Mise => strings(&["ls", "--global", "--current"]),
        }
    }

    /// Arguments that print every installed package. Winget writes to the
    /// file named by one more trailing argument instead.
    const fn export_args(self) -> &'static [&'static str] {
        match self {
            Self::Winget => &[
                "export",
                "--source",
                "winget",
                "--accept-source-agreements",
                "-o",
            ],
            Self::Choco => &["list", "-l", "-r"],
            Self::Scoop => &["export"],
            Self::Mise => &["ls", "--global", "--current", "--json"],
        }
    }

    /// Package ids from the output of [`Self::export_args`].
    fn parse_export(self, text: &str) -> Result<Vec<String>, String> {
        if self == Self::Choco {
            return Ok(text
                .lines()
                .filter_map(|line| line.split_once('|'))
                .map(|(id, _)| id.trim())
                .filter(|id| !id.is_empty())
                .map(str::to_owned)
                .collect());
        }
        let value: Value = serde_json::from_str(text).map_err(|error| error.to_string())?;
        let ids = match self {
            Self::Winget => value
                .get("Sources")
                .and_then(Value::as_array)
                .into_iter()
                .flatten()
                .filter_map(|source| source.get("Packages").and_then(Value::as_array))
                .flatten()
                .filter_map(|package| package.get("PackageIdentifier").and_then(Value::as_str))
                .map(str::to_owned)
                .collect(),
            Self::Scoop => value
                .get("apps")
                .and_then(Value::as_array)
                .into_iter()
                .flatten()
                .filter_map(|app| app.get("Name").and_then(Value::as_str))
                .map(str::to_owned)
                .collect(),
            Self::Mise | Self::Choco => value
                .as_object()
                .map(|tools| tools.keys().cloned().collect())
                .unwrap_or_default(),
        };
        Ok(ids)
    }

    const fn bootstrap(self) -> Bootstrap {
        match self {
            Self::Winget => Bootstrap::Manual(
                "install App Installer from the Microsoft Store or the winget-cli releases page",
            ),
            Self::Choco => Bootstrap::PowerShell(
                "[System.Net.ServicePointManager]::SecurityProtocol = [System.Net.ServicePointManager]::SecurityProtocol -bor 3072; iex ((New-Object System.Net.WebClient).DownloadString('https://community.chocolatey.org/install.ps1'))",
            ),
            Self::Scoop => Bootstrap::PowerShell(
                "Set-ExecutionPolicy RemoteSigned -Scope CurrentUser; irm get.scoop.sh | iex",
            ),
            Self::Mise => Bootstrap::Via {
                tool: "scoop",
                args: &["install", "mise"],
            },
        }
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|item| (*item).to_owned()).collect()
}

/// A [`ResourceManager`] that shells out to a package manager.
///
/// The resolved executable is cached on the instance for the run and
/// forgotten after a bootstrap so a freshly installed tool is picked up.
pub struct CommandManager {
    kind: ManagerKind,
    runner: Arc<dyn ProcessRunner>,
    resolver: RuntimeResolver,
    executable: Mutex<Option<PathBuf>>,
}

impl CommandManager {
    /// Creates a manager of `kind` running commands through `runner`.
    #[must_use]
    pub fn new(kind: ManagerKind, runner: Arc<dyn ProcessRunner>, resolver: RuntimeResolver) -> Self {
        Self {
            kind,
            runner,
            resolver,
            executable: Mutex::new(None),
        }
    }

    /// Which built-in this is.
    #[must_use]
    pub const fn kind(&self) -> ManagerKind {
        self.kind
    }

    fn executable(&self) -> PathBuf {
        let mut cached = self.executable.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(path) = cached.as_ref() {
            return path.clone();
        }
        match self.resolver.resolve_existing(self.kind.name()) {
            Some(path) => {
                *cached = Some(path.clone());
                path
            }
            None => PathBuf::from(self.kind.name()),
        }
    }

    fn forget_executable(&self) {
        *self.executable.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }

    fn run(
        &self,
        program: PathBuf,
        args: Vec<String>,
        timeout: Duration,
    ) -> Result<ProcessOutput, ManagerError> {
        let command = ProcessCommand::new(program)
            .args(args)
            .timeout(timeout)
            .label(self.kind.name());
        self.runner
            .run(&command)
            .map_err(|source| ManagerError::Process {
                manager: self.kind.name().to_owned(),
                source,
            })
    }

    fn change(&self, action: &'static str, item: &str, args: Vec<String>) -> Result<(), ManagerError> {
        let output = self.run(self.executable(), args, CHANGE_TIMEOUT)?;
        if output.success() {
            return Ok(());
        }
        Err(ManagerError::CommandFailed {
            manager: self.kind.name().to_owned(),
            action,
            item: item.to_owned(),
            status: output.code.unwrap_or(-1),
            detail: output.stderr.trim().to_owned(),
        })
    }
}

impl ResourceManager for CommandManager {
    fn name(&self) -> &str {
        self.kind.name()
    }

    fn is_available(&self) -> bool {
        let args = strings(self.kind.probe_args());
        self.run(self.executable(), args, QUERY_TIMEOUT)
            .is_ok_and(|output| output.success())
    }

    fn bootstrap(&self, dry_run: bool) -> Result<(), ManagerError> {
        let manager = self.kind.name();
        let (program, args) = match self.kind.bootstrap() {
            Bootstrap::Manual(hint) => {
                return Err(ManagerError::BootstrapUnsupported {
                    manager: manager.to_owned(),
                    hint,
                });
            }
            Bootstrap::PowerShell(script) => (
                PathBuf::from("powershell.exe"),
                vec![
                    String::from("-NoProfile"),
                    String::from("-ExecutionPolicy"),
                    String::from("Bypass"),
                    String::from("-Command"),
                    script.to_owned(),
                ],
            ),
            Bootstrap::Via { tool, args } => (self.resolver.resolve(tool), strings(args)),
        };
        if dry_run {
            info!(target: MANAGERS_TARGET, manager, dry_run, "would install package manager");
            return Ok(());
        }
        info!(target: MANAGERS_TARGET, manager, "installing package manager");
        let output = self.run(program, args, CHANGE_TIMEOUT)?;
        self.forget_executable();
        if output.success() {
            return Ok(());
        }
        Err(ManagerError::CommandFailed {
            manager: manager.to_owned(),
            action: "bootstrap",
            item: manager.to_owned(),
            status: output.code.unwrap_or(-1),
            detail: output.stderr.trim().to_owned(),
        })
    }

    fn is_installed(&self, id: &str) -> bool {
        match self.run(self.executable(), self.kind.list_args(id), QUERY_TIMEOUT) {
            Ok(output) => output
                .stdout_text()
                .to_lowercase()
                .contains(&id.to_lowercase()),
            Err(error) => {
                warn!(target: MANAGERS_TARGET, manager = self.kind.name(), %error, "list query failed");
                false
            }
        }
    }

    fn install(&self, app: &AppSpec, dry_run: bool) -> Result<(), ManagerError> {
        let manager = self.kind.name();
        if self.is_installed(&app.id) {
            info!(target: MANAGERS_TARGET, manager, item = %app.id, "already installed");
            return Ok(());
        }
        if dry_run {
            info!(target: MANAGERS_TARGET, manager, item = %app.id, dry_run, "would install");
            return Ok(());
        }
        info!(target: MANAGERS_TARGET, manager, item = %app.id, "installing");
        self.change("install", &app.id, self.kind.install_args(app))
    }

    fn uninstall(&self, id: &str, dry_run: bool) -> Result<(), ManagerError> {
        let manager = self.kind.name();
        if dry_run {
            info!(target: MANAGERS_TARGET, manager, item = id, dry_run, "would uninstall");
            return Ok(());
        }
        info!(target: MANAGERS_TARGET, manager, item = id, "uninstalling");
        self.change("uninstall", id, self.kind.uninstall_args(id))
    }

    fn installed_packages(&self) -> Result<Vec<String>, ManagerError> {
        let manager = self.kind.name();
        let unreadable = |message: String| ManagerError::Listing {
            manager: manager.to_owned(),
            message,
        };
        let mut args = strings(self.kind.export_args());
        let export_dir = if self.kind == ManagerKind::Winget {
            let dir = tempfile::tempdir().map_err(|error| unreadable(error.to_string()))?;
            args.push(
                dir.path()
                    .join(WINGET_EXPORT_FILE)
                    .to_string_lossy()
                    .into_owned(),
            );
            Some(dir)
        } else {
            None
        };
        let output = self.run(self.executable(), args, QUERY_TIMEOUT)?;
        if !output.success() {
            return Err(ManagerError::CommandFailed {
                manager: manager.to_owned(),
                action: "list",
                item: String::from("installed packages"),
                status: output.code.unwrap_or(-1),
                detail: output.stderr.trim().to_owned(),
            });
        }
        let text = match &export_dir {
            Some(dir) => fs::read_to_string(dir.path().join(WINGET_EXPORT_FILE))
                .map_err(|error| unreadable(error.to_string()))?,
            None => output.stdout_text().into_owned(),
        };
        let mut ids = self.kind.parse_export(&text).map_err(unreadable)?;
        ids.sort_unstable_by_key(|id| id.to_lowercase());
        ids.dedup_by(|left, right| left.eq_ignore_ascii_case(right));
        info!(target: MANAGERS_TARGET, manager, count = ids.len(), "listed installed packages");
        Ok(ids)
    }
}
