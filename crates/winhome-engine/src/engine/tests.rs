//! Unit tests for reconciliation runs.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use rstest::{fixture, rstest};
use serde_json::{Value, json};
use tempfile::TempDir;
use winhome_plugins::{
    PluginCatalog, PluginContext, PluginError, PluginExecutor, PluginKind, PluginManifest,
    PluginResult,
};
use winhome_state::StateStore;

use super::*;
use crate::appliers::{EnvironmentRefresher, ItemApplier, RegistryApplier, SystemSettingsApplier};
use crate::descriptor::{
    AppSpec, Dotfile, EnvVar, GitConfig, RegistryTweak, ScheduledTask, ServiceConfig, WslConfig,
};
use crate::error::{ApplyError, DescriptorError, ManagerError};
use crate::managers::ResourceManager;

/// Ordered log shared by every double in a test.
#[derive(Default)]
struct Journal(Mutex<Vec<String>>);

impl Journal {
    fn push(&self, entry: String) {
        self.0.lock().expect("journal lock").push(entry);
    }

    fn entries(&self) -> Vec<String> {
        self.0.lock().expect("journal lock").clone()
    }

    fn contains(&self, entry: &str) -> bool {
        self.entries().iter().any(|logged| logged == entry)
    }

    fn count_prefix(&self, prefix: &str) -> usize {
        self.entries()
            .iter()
            .filter(|logged| logged.starts_with(prefix))
            .count()
    }
}

fn suffix(dry_run: bool) -> &'static str {
    if dry_run { " (dry)" } else { "" }
}

struct FakeManager {
    name: &'static str,
    available: AtomicBool,
    bootstrappable: bool,
    installed: Mutex<BTreeSet<String>>,
    failing: BTreeSet<String>,
    journal: Arc<Journal>,
}

impl FakeManager {
    fn new(name: &'static str, journal: &Arc<Journal>) -> Self {
        Self {
            name,
            available: AtomicBool::new(true),
            bootstrappable: true,
            installed: Mutex::new(BTreeSet::new()),
            failing: BTreeSet::new(),
            journal: Arc::clone(journal),
        }
    }

    fn unavailable(self, bootstrappable: bool) -> Self {
        self.available.store(false, Ordering::SeqCst);
        Self {
            bootstrappable,
            ..self
        }
    }

    fn failing_on(mut self, id: &str) -> Self {
        self.failing.insert(id.to_owned());
        self
    }

    fn with_installed(self, id: &str) -> Self {
        self.installed.lock().expect("lock").insert(id.to_owned());
        self
    }

    fn installed(&self) -> BTreeSet<String> {
        self.installed.lock().expect("lock").clone()
    }
}

impl ResourceManager for FakeManager {
    fn name(&self) -> &str {
        self.name
    }

    fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    fn bootstrap(&self, dry_run: bool) -> Result<(), ManagerError> {
        self.journal
            .push(format!("bootstrap:{}{}", self.name, suffix(dry_run)));
        if !self.bootstrappable {
            return Err(ManagerError::BootstrapUnsupported {
                manager: self.name.to_owned(),
                hint: "install it by hand",
            });
        }
        if !dry_run {
            self.available.store(true, Ordering::SeqCst);
        }
        Ok(())
    }

    fn is_installed(&self, id: &str) -> bool {
        self.installed.lock().expect("lock").contains(id)
    }

    fn install(&self, app: &AppSpec, dry_run: bool) -> Result<(), ManagerError> {
        self.journal
            .push(format!("install:{}:{}{}", self.name, app.id, suffix(dry_run)));
        if self.failing.contains(&app.id) {
            return Err(ManagerError::CommandFailed {
                manager: self.name.to_owned(),
                action: "install",
                item: app.id.clone(),
                status: 1,
                detail: String::from("boom"),
            });
        }
        if !dry_run {
            self.installed.lock().expect("lock").insert(app.id.clone());
        }
        Ok(())
    }

    fn uninstall(&self, id: &str, dry_run: bool) -> Result<(), ManagerError> {
        self.journal
            .push(format!("uninstall:{}:{id}{}", self.name, suffix(dry_run)));
        if !dry_run {
            self.installed.lock().expect("lock").remove(id);
        }
        Ok(())
    }
}

/// Applier for every section. Services are unsupported; a dotfile whose
/// target is `fail` fails.
struct FakeApplier {
    journal: Arc<Journal>,
}

impl FakeApplier {
    fn log(&self, entry: String, dry_run: bool) {
        self.journal.push(format!("{entry}{}", suffix(dry_run)));
    }
}

impl RegistryApplier for FakeApplier {
    fn apply(&self, tweak: &RegistryTweak, dry_run: bool) -> Result<(), ApplyError> {
        self.log(format!("registry:{}|{}", tweak.path, tweak.name), dry_run);
        Ok(())
    }

    fn revert(&self, path: &str, name: &str, dry_run: bool) -> Result<(), ApplyError> {
        self.log(format!("revert:{path}|{name}"), dry_run);
        Ok(())
    }
}

impl SystemSettingsApplier for FakeApplier {
    fn registry_tweaks(&self, settings: &BTreeMap<String, Value>) -> Vec<RegistryTweak> {
        settings
            .get("darkMode")
            .map(|dark| RegistryTweak {
                path: String::from(r"HKCU\Theme"),
                name: String::from("AppsUseLightTheme"),
                value: json!(u8::from(dark != &json!(true))),
                kind: String::from("dword"),
            })
            .into_iter()
            .collect()
    }

    fn apply_non_registry(
        &self,
        settings: &BTreeMap<String, Value>,
        dry_run: bool,
    ) -> Result<(), ApplyError> {
        let keys: Vec<&str> = settings.keys().map(String::as_str).collect();
        self.log(format!("settings:{}", keys.join(",")), dry_run);
        Ok(())
    }

    fn capture(&self) -> BTreeMap<String, Value> {
        BTreeMap::new()
    }
}

impl ItemApplier<Dotfile> for FakeApplier {
    fn apply(&self, item: &Dotfile, dry_run: bool) -> Result<(), ApplyError> {
        self.log(format!("dotfile:{}", item.target), dry_run);
        if item.target == "fail" {
            return Err(ApplyError::Failed {
                section: "dotfiles",
                item: item.target.clone(),
                message: String::from("target exists"),
            });
        }
        Ok(())
    }
}

impl ItemApplier<EnvVar> for FakeApplier {
    fn apply(&self, item: &EnvVar, dry_run: bool) -> Result<(), ApplyError> {
        self.log(format!("env:{}={}", item.variable, item.value), dry_run);
        Ok(())
    }
}

impl ItemApplier<ServiceConfig> for FakeApplier {
    fn apply(&self, item: &ServiceConfig, _dry_run: bool) -> Result<(), ApplyError> {
        Err(ApplyError::Unsupported {
            section: "services",
            item: item.name.clone(),
        })
    }
}

impl ItemApplier<ScheduledTask> for FakeApplier {
    fn apply(&self, item: &ScheduledTask, dry_run: bool) -> Result<(), ApplyError> {
        self.log(format!("task:{}", item.name), dry_run);
        Ok(())
    }
}

impl ItemApplier<GitConfig> for FakeApplier {
    fn apply(&self, item: &GitConfig, dry_run: bool) -> Result<(), ApplyError> {
        self.log(format!("git:{}", item.entries().len()), dry_run);
        Ok(())
    }
}

impl ItemApplier<WslConfig> for FakeApplier {
    fn apply(&self, item: &WslConfig, dry_run: bool) -> Result<(), ApplyError> {
        self.log(format!("wsl:{}", item.default_version), dry_run);
        Ok(())
    }
}

impl EnvironmentRefresher for FakeApplier {
    fn refresh(&self) {
        self.journal.push(String::from("refresh"));
    }
}

struct FakeCatalog {
    plugins: Vec<PluginManifest>,
    runtimes_present: bool,
    journal: Arc<Journal>,
}

impl PluginCatalog for FakeCatalog {
    fn discover(&self) -> Vec<PluginManifest> {
        self.plugins.clone()
    }

    fn ensure_runtime(&self, plugin: &PluginManifest) -> Result<(), PluginError> {
        if !self.runtimes_present {
            self.journal.push(format!("runtime:{}", plugin.name()));
        }
        Ok(())
    }

    fn runtime_available(&self, _plugin: &PluginManifest) -> bool {
        self.runtimes_present
    }
}

/// Executor answering every call successfully; `check_installed` is false.
struct FakeExecutor {
    journal: Arc<Journal>,
}

impl PluginExecutor for FakeExecutor {
    fn execute(
        &self,
        plugin: &PluginManifest,
        command: &str,
        args: Value,
        context: PluginContext,
    ) -> PluginResult {
        self.journal.push(format!(
            "plugin:{}:{command}:{args}{}",
            plugin.name(),
            suffix(context.dry_run)
        ));
        PluginResult {
            success: true,
            data: json!(false),
            ..PluginResult::default()
        }
    }
}

#[derive(Default)]
struct RecordingReporter(Mutex<Vec<String>>);

impl RecordingReporter {
    fn lines(&self) -> Vec<String> {
        self.0.lock().expect("reporter lock").clone()
    }

    fn has(&self, level: &str, fragment: &str) -> bool {
        let prefix = format!("{level}: ");
        self.lines()
            .iter()
            .any(|line| line.starts_with(&prefix) && line.contains(fragment))
    }

    fn record(&self, level: &str, message: &str) {
        self.0
            .lock()
            .expect("reporter lock")
            .push(format!("{level}: {message}"));
    }
}

impl Reporter for RecordingReporter {
    fn info(&self, message: &str) {
        self.record("info", message);
    }

    fn success(&self, message: &str) {
        self.record("success", message);
    }

    fn warning(&self, message: &str) {
        self.record("warning", message);
    }

    fn error(&self, message: &str) {
        self.record("error", message);
    }
}

struct Harness {
    _dir: TempDir,
    state: Arc<StateStore>,
    journal: Arc<Journal>,
    reporter: Arc<RecordingReporter>,
    managers: Vec<Arc<FakeManager>>,
    plugins: Vec<PluginManifest>,
    runtimes_present: bool,
}

impl Harness {
    fn with_manager(mut self, manager: FakeManager) -> Self {
        self.managers.retain(|existing| existing.name != manager.name);
        self.managers.push(Arc::new(manager));
        self
    }

    fn with_plugin(mut self, name: &str, capabilities: &[&str]) -> Self {
        self.plugins.push(
            PluginManifest::new(name, PluginKind::Executable, "run", "/plugins")
                .with_capabilities(capabilities.iter().copied()),
        );
        self
    }

    /// Adds a python plugin whose `uv` runtime is not installed yet.
    fn with_python_plugin_without_runtime(mut self, name: &str, capabilities: &[&str]) -> Self {
        self.plugins.push(
            PluginManifest::new(name, PluginKind::Python, "main.py", "/plugins")
                .with_capabilities(capabilities.iter().copied()),
        );
        self.runtimes_present = false;
        self
    }

    fn manager(&self, name: &str) -> Arc<FakeManager> {
        self.managers
            .iter()
            .find(|manager| manager.name == name)
            .cloned()
            .expect("manager registered")
    }

    fn engine(&self) -> Engine {
        let mut registry = ManagerRegistry::new();
        for manager in &self.managers {
            registry.register(manager.clone());
        }
        let applier = Arc::new(FakeApplier {
            journal: Arc::clone(&self.journal),
        });
        Engine::new(
            Arc::clone(&self.state),
            Arc::new(FakeCatalog {
                plugins: self.plugins.clone(),
                runtimes_present: self.runtimes_present,
                journal: Arc::clone(&self.journal),
            }),
            Arc::new(FakeExecutor {
                journal: Arc::clone(&self.journal),
            }),
            Appliers::uniform(applier),
        )
        .with_registry(registry)
        .with_reporter(self.reporter.clone())
        .with_max_parallelism(3)
    }

    fn run(&self, yaml: &str, options: &RunOptions) -> RunSummary {
        let descriptor = Descriptor::from_yaml(yaml).expect("descriptor");
        self.engine()
            .run(&descriptor, options, &mut Vec::new())
            .expect("run succeeds")
    }

    fn seed(&self, items: &[&str]) {
        let set: BTreeSet<String> = items.iter().map(|item| (*item).to_owned()).collect();
        self.state.save(&set).expect("seed state");
    }
}

#[fixture]
fn harness() -> Harness {
    let dir = TempDir::new().expect("temp dir");
    let state = Arc::new(StateStore::new(dir.path().join("state.json")));
    let journal = Arc::new(Journal::default());
    let managers = vec![
        Arc::new(FakeManager::new("winget", &journal)),
        Arc::new(FakeManager::new("scoop", &journal)),
    ];
    Harness {
        _dir: dir,
        state,
        journal,
        reporter: Arc::new(RecordingReporter::default()),
        managers,
        plugins: Vec::new(),
        runtimes_present: true,
    }
}

fn apply() -> RunOptions {
    RunOptions::default()
}

fn dry_run() -> RunOptions {
    RunOptions {
        dry_run: true,
        ..RunOptions::default()
    }
}

const THREE_APPS: &str = r"
apps:
  - id: Git.Git
  - id: jq
    manager: scoop
  - id: Mozilla.Firefox
";

#[rstest]
fn first_run_installs_in_order_and_saves_state(harness: Harness) {
    let summary = harness.run(THREE_APPS, &apply());

    let installs: Vec<String> = harness
        .journal
        .entries()
        .into_iter()
        .filter(|entry| entry.starts_with("install:"))
        .collect();
    assert_eq!(
        installs,
        [
            "install:winget:Git.Git",
            "install:scoop:jq",
            "install:winget:Mozilla.Firefox"
        ]
    );
    assert_eq!(harness.journal.count_prefix("refresh"), 3);
    assert_eq!(summary.installed, 3);
    assert!(summary.state_saved);
    assert_eq!(
        harness.state.list(),
        ["scoop:jq", "winget:Git.Git", "winget:Mozilla.Firefox"]
    );
    assert!(harness.reporter.has("success", "[State Saved]"));
}

#[rstest]
fn second_run_installs_nothing(harness: Harness) {
    harness.run(THREE_APPS, &apply());
    let summary = harness.run(THREE_APPS, &apply());

    assert_eq!(harness.journal.count_prefix("install:"), 3);
    assert_eq!(summary.installed, 0);
    assert_eq!(summary.unchanged, 3);
    assert_eq!(summary.failed, 0);
}

#[rstest]
fn dry_run_changes_nothing_on_disk(harness: Harness) {
    harness.seed(&["winget:Old.App"]);
    let path = harness.state.path().to_path_buf();
    let before = fs::read(&path).expect("seeded state");

    let summary = harness.run(THREE_APPS, &dry_run());

    assert_eq!(fs::read(&path).expect("state"), before);
    assert!(!summary.state_saved);
    assert_eq!(summary.installed, 3);
    assert_eq!(summary.removed, 1);
    assert!(harness.journal.contains("uninstall:winget:Old.App (dry)"));
    assert!(harness.journal.contains("install:scoop:jq (dry)"));
    assert_eq!(harness.journal.count_prefix("refresh"), 0);
    assert!(harness.manager("winget").installed().is_empty());
    assert!(harness.reporter.has("info", "[Dry Run] State was NOT saved."));
}

#[rstest]
fn dropped_items_are_removed_and_forgotten(harness: Harness) {
    harness.seed(&["scoop:old", r"reg:HKCU\Demo|Enabled", "winget:Git.Git"]);

    let summary = harness.run("apps:\n  - id: Git.Git\n", &apply());

    assert!(harness.journal.contains("uninstall:scoop:old"));
    assert!(harness.journal.contains(r"revert:HKCU\Demo|Enabled"));
    assert!(!harness.journal.contains("uninstall:winget:Git.Git"));
    assert_eq!(summary.removed, 2);
    assert_eq!(harness.state.list(), ["winget:Git.Git"]);
}

#[rstest]
fn removal_with_an_unknown_manager_is_skipped(harness: Harness) {
    harness.seed(&["pacman:htop", "not-an-identifier"]);

    let summary = harness.run("", &apply());

    assert_eq!(summary.skipped, 2);
    assert_eq!(summary.removed, 0);
    assert!(harness.reporter.has("warning", "Unknown manager 'pacman'"));
    assert!(harness.state.list().is_empty());
}

#[rstest]
fn apps_of_unknown_managers_are_skipped(harness: Harness) {
    let summary = harness.run(
        "apps:\n  - id: thing\n    manager: nope\n  - id: Git.Git\n",
        &apply(),
    );

    assert!(harness.reporter.has("error", "Unknown manager 'nope'"));
    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.installed, 1);
    assert!(harness.journal.contains("install:winget:Git.Git"));
}

#[rstest]
fn unavailable_manager_is_bootstrapped_before_installs(harness: Harness) {
    let journal = Arc::clone(&harness.journal);
    let harness = harness.with_manager(FakeManager::new("scoop", &journal).unavailable(true));

    let summary = harness.run("apps:\n  - id: jq\n    manager: scoop\n", &apply());

    let entries = harness.journal.entries();
    assert_eq!(entries.first().map(String::as_str), Some("bootstrap:scoop"));
    assert!(harness.journal.contains("install:scoop:jq"));
    assert_eq!(summary.installed, 1);
}

#[rstest]
fn manager_that_cannot_bootstrap_skips_its_apps(harness: Harness) {
    let journal = Arc::clone(&harness.journal);
    let harness = harness.with_manager(FakeManager::new("winget", &journal).unavailable(false));

    let summary = harness.run(THREE_APPS, &apply());

    assert!(harness.reporter.has("error", "Failed to bootstrap 'winget'"));
    assert_eq!(harness.journal.count_prefix("install:winget"), 0);
    assert!(harness.journal.contains("install:scoop:jq"));
    assert_eq!(summary.skipped, 2);
    assert_eq!(summary.installed, 1);
}

#[rstest]
fn failed_install_does_not_stop_the_run(harness: Harness) {
    let journal = Arc::clone(&harness.journal);
    let harness =
        harness.with_manager(FakeManager::new("scoop", &journal).failing_on("jq"));

    let summary = harness.run(THREE_APPS, &apply());

    assert_eq!(summary.failed, 1);
    assert_eq!(summary.installed, 2);
    assert!(harness.journal.contains("install:winget:Mozilla.Firefox"));
    assert!(harness.reporter.has("error", "Failed to install scoop:jq"));
    assert_eq!(harness.state.list().len(), 3);
}

#[rstest]
fn already_installed_apps_are_recorded_without_install(harness: Harness) {
    let journal = Arc::clone(&harness.journal);
    let harness =
        harness.with_manager(FakeManager::new("winget", &journal).with_installed("Git.Git"));

    let summary = harness.run("apps:\n  - id: Git.Git\n", &apply());

    assert_eq!(summary.unchanged, 1);
    assert_eq!(harness.journal.count_prefix("install:"), 0);
    assert_eq!(harness.state.list(), ["winget:Git.Git"]);
}

#[rstest]
fn package_manager_plugins_become_managers(harness: Harness) {
    let harness = harness
        .with_plugin("pipx", &["package_manager"])
        .with_plugin("winget", &["package_manager"])
        .with_plugin("vscode", &[]);

    let summary = harness.run("apps:\n  - id: black\n    manager: pipx\n", &apply());

    assert!(harness.journal.contains(r#"plugin:pipx:check_installed:{"packageId":"black"}"#));
    assert_eq!(harness.journal.count_prefix("plugin:pipx:install:"), 1);
    assert!(harness.reporter.has("warning", "Plugin 'winget'"));
    assert_eq!(summary.installed, 1);
    assert_eq!(harness.state.list(), ["pipx:black"]);
}

#[rstest]
fn dry_run_leaves_missing_plugin_runtimes_uninstalled(harness: Harness) {
    let harness = harness
        .with_python_plugin_without_runtime("pipx", &["package_manager"])
        .with_python_plugin_without_runtime("vscode", &[]);
    harness.seed(&["pipx:black"]);
    let yaml = "apps:\n  - id: ruff\n    manager: pipx\nextensions:\n  vscode:\n    theme: dark\n";

    let summary = harness.run(yaml, &dry_run());

    assert_eq!(harness.journal.count_prefix("runtime:"), 0);
    assert_eq!(harness.journal.count_prefix("plugin:"), 0);
    assert_eq!(summary.removed, 1);
    assert_eq!(harness.state.list(), ["pipx:black"]);
}

#[rstest]
fn real_run_installs_missing_plugin_runtime_once(harness: Harness) {
    let harness = harness.with_python_plugin_without_runtime("pipx", &["package_manager"]);
    harness.seed(&["pipx:black"]);

    let summary = harness.run("", &apply());

    assert_eq!(harness.journal.count_prefix("runtime:pipx"), 1);
    assert!(harness.journal.contains(r#"plugin:pipx:uninstall:{"packageId":"black"}"#));
    assert_eq!(summary.removed, 1);
}

#[rstest]
fn extensions_are_sent_to_the_plugin_of_the_same_name(harness: Harness) {
    let harness = harness.with_plugin("vscode", &[]);
    let yaml = "extensions:\n  vscode:\n    theme: dark\n  missing:\n    x: 1\n";

    let summary = harness.run(yaml, &dry_run());

    assert!(harness.journal.contains(r#"plugin:vscode:apply:{"theme":"dark"} (dry)"#));
    assert_eq!(summary.applied, 1);
    assert_eq!(summary.skipped, 1);
    assert!(harness.reporter.has("warning", "No plugin named 'missing'"));
}

const SECTIONS: &str = r"
registryTweaks:
  - path: HKCU\Demo
    name: Enabled
    value: 1
    type: dword
systemSettings:
  darkMode: true
dotfiles:
  - src: a
    target: ~/.a
  - src: b
    target: fail
envVars:
  - variable: EDITOR
    value: vim
services:
  - name: Spooler
git:
  userName: Jo
wsl:
  defaultVersion: 2
";

#[rstest]
fn every_section_reaches_its_applier(harness: Harness) {
    let summary = harness.run(SECTIONS, &apply());

    for entry in [
        r"registry:HKCU\Demo|Enabled",
        r"registry:HKCU\Theme|AppsUseLightTheme",
        "settings:darkMode",
        "dotfile:~/.a",
        "dotfile:fail",
        "env:EDITOR=vim",
        "git:1",
        "wsl:2",
    ] {
        assert!(harness.journal.contains(entry), "missing {entry}");
    }
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.skipped, 1);
    assert!(harness.reporter.has("warning", "services 'Spooler'"));
    assert_eq!(
        harness.state.list(),
        [r"reg:HKCU\Demo|Enabled", r"reg:HKCU\Theme|AppsUseLightTheme"]
    );
}

#[rstest]
fn diff_only_prints_the_report_and_touches_nothing(harness: Harness) {
    harness.seed(&["winget:Old.App", "winget:Git.Git"]);
    let descriptor =
        Descriptor::from_yaml("apps:\n  - id: Git.Git\n  - id: New.App\n").expect("descriptor");
    let options = RunOptions {
        diff_only: true,
        ..RunOptions::default()
    };
    let mut out = Vec::new();

    let summary = harness
        .engine()
        .run(&descriptor, &options, &mut out)
        .expect("diff");

    let report = String::from_utf8(out).expect("utf8");
    assert!(report.starts_with("--- State Diff ---\n"));
    assert!(report.contains("[-] Items to Remove:\n  - winget:Old.App\n"));
    assert!(report.contains("[+] Items to Add:\n  + winget:New.App\n"));
    assert!(report.contains("[=] Unchanged Items:\n  = winget:Git.Git\n"));
    assert_eq!(summary, RunSummary::default());
    assert!(harness.journal.entries().is_empty());
    assert_eq!(harness.state.list().len(), 2);
}

const PROFILED: &str = r"
apps:
  - id: Git.Git
profiles:
  work:
    apps:
      - id: Slack.Slack
";

#[rstest]
fn profile_apps_are_installed_after_base_apps(harness: Harness) {
    let options = RunOptions {
        profile: Some(String::from("work")),
        ..RunOptions::default()
    };

    harness.run(PROFILED, &options);

    let installs: Vec<String> = harness
        .journal
        .entries()
        .into_iter()
        .filter(|entry| entry.starts_with("install:"))
        .collect();
    assert_eq!(installs, ["install:winget:Git.Git", "install:winget:Slack.Slack"]);
    assert!(harness.reporter.has("info", "[Profile] Activating 'work'"));
}

#[rstest]
fn unknown_profile_aborts_a_real_run(harness: Harness) {
    let descriptor = Descriptor::from_yaml(PROFILED).expect("descriptor");
    let options = RunOptions {
        profile: Some(String::from("home")),
        ..RunOptions::default()
    };

    let error = harness
        .engine()
        .run(&descriptor, &options, &mut Vec::new())
        .expect_err("unknown profile");

    assert!(matches!(
        error,
        EngineError::Descriptor(DescriptorError::UnknownProfile { ref name }) if name == "home"
    ));
    assert_eq!(harness.journal.count_prefix("install:"), 0);
    assert!(!harness.state.path().exists());
}

#[rstest]
fn unknown_profile_is_reported_during_a_dry_run(harness: Harness) {
    let options = RunOptions {
        dry_run: true,
        profile: Some(String::from("home")),
        ..RunOptions::default()
    };

    let summary = harness.run(PROFILED, &options);

    assert!(harness.reporter.has("error", "profile 'home' not found"));
    assert_eq!(summary.installed, 1);
    assert!(harness.journal.contains("install:winget:Git.Git (dry)"));
}
