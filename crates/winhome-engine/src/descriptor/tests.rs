//! Unit tests for descriptor loading, validation and profiles.

use rstest::rstest;
use serde_json::json;

use super::*;

const FULL: &str = r#"
version: "2.0"
apps:
  - id: Git.Git
  - id: jq
    manager: scoop
  - id: node
    manager: mise
    version: "20"
registryTweaks:
  - path: HKCU\Software\Demo
    name: Enabled
    value: 1
    type: dword
dotfiles:
  - src: ./dotfiles/.gitconfig
    target: ~/.gitconfig
envVars:
  - variable: EDITOR
    value: code
services:
  - name: Spooler
    state: stopped
wsl:
  update: true
git:
  userName: Jo
  settings:
    core.editor: code --wait
systemSettings:
  darkMode: true
profiles:
  work:
    git:
      userEmail: jo@work.example
    apps:
      - id: Slack.Slack
    systemSettings:
      darkMode: false
      taskbarAlignment: left
extensions:
  vscode:
    extensions: [rust-lang.rust-analyzer]
"#;

fn full() -> Descriptor {
    Descriptor::from_yaml(FULL).expect("valid descriptor")
}

#[test]
fn parses_every_section_with_defaults() {
    let descriptor = full();
    assert_eq!(descriptor.version, "2.0");
    assert_eq!(descriptor.apps.len(), 3);
    assert_eq!(descriptor.apps[0].manager, DEFAULT_MANAGER);
    assert_eq!(descriptor.apps[2].version.as_deref(), Some("20"));
    assert_eq!(descriptor.registry_tweaks[0].kind, "dword");
    assert_eq!(descriptor.registry_tweaks[0].value, json!(1));
    assert_eq!(descriptor.env_vars[0].action, "set");
    assert_eq!(descriptor.services[0].state, "stopped");
    let wsl = descriptor.wsl.as_ref().expect("wsl section");
    assert_eq!(wsl.default_version, 2);
    assert!(wsl.update);
    assert_eq!(descriptor.system_settings["darkMode"], json!(true));
    assert_eq!(
        descriptor.extensions["vscode"]["extensions"][0],
        json!("rust-lang.rust-analyzer")
    );
}

#[test]
fn empty_text_is_an_empty_descriptor() {
    let descriptor = Descriptor::from_yaml("  \n").expect("empty descriptor");
    assert_eq!(descriptor, Descriptor::default());
    assert!(!descriptor.needs_network());
}

#[test]
fn malformed_yaml_is_a_parse_error() {
    let error = Descriptor::from_yaml("apps: [unterminated").expect_err("parse error");
    assert!(matches!(error, DescriptorError::Parse { .. }));
}

#[rstest]
#[case::empty_app_id("apps:\n  - id: ''\n", "apps[0]: id must not be empty")]
#[case::empty_manager("apps:\n  - id: x\n    manager: ' '\n", "apps[0]: manager must not be empty")]
#[case::empty_registry_name(
    "registryTweaks:\n  - path: HKCU\\X\n    name: ''\n",
    "registryTweaks[0]: name must not be empty"
)]
#[case::empty_dotfile("dotfiles:\n  - src: a\n    target: ''\n", "dotfiles[0]: src and target")]
#[case::empty_profile_app(
    "profiles:\n  work:\n    apps:\n      - id: ''\n        manager: ''\n",
    "profiles.work.apps[0]: manager must not be empty"
)]
#[case::empty_profile_variable(
    "profiles:\n  work:\n    envVars:\n      - variable: ''\n        value: x\n",
    "profiles.work.envVars[0]: variable must not be empty"
)]
fn validation_reports_problems(#[case] text: &str, #[case] expected: &str) {
    let error = Descriptor::from_yaml(text).expect_err("invalid descriptor");
    assert!(error.to_string().contains(expected), "{error}");
}

#[test]
fn load_reports_missing_file() {
    let error = Descriptor::load(Path::new("/nonexistent/winhome.yaml")).expect_err("missing");
    assert!(matches!(error, DescriptorError::Read { .. }));
}

#[test]
fn profile_merges_over_base() {
    let merged = full().with_profile("work").expect("profile exists");

    let git = merged.git.expect("git section");
    assert_eq!(git.user_email.as_deref(), Some("jo@work.example"));
    assert_eq!(git.user_name, None, "profile git replaces the base section");

    let ids: Vec<&str> = merged.apps.iter().map(|app| app.id.as_str()).collect();
    assert_eq!(ids, ["Git.Git", "jq", "node", "Slack.Slack"]);

    assert_eq!(merged.system_settings["darkMode"], json!(false));
    assert_eq!(merged.system_settings["taskbarAlignment"], json!("left"));
}

#[test]
fn unknown_profile_is_an_error() {
    let error = full().with_profile("home").expect_err("unknown profile");
    assert_eq!(error.to_string(), "profile 'home' not found");
}

#[test]
fn referenced_managers_are_unique_and_ordered() {
    let mut descriptor = full();
    descriptor.apps.push(AppSpec::new("scoop", "ripgrep"));
    assert_eq!(descriptor.referenced_managers(), ["winget", "scoop", "mise"]);
}

#[test]
fn git_entries_flatten_named_and_free_form_keys() {
    let git = GitConfig {
        user_name: Some(String::from("Jo")),
        commit_gpg_sign: Some(true),
        settings: BTreeMap::from([(String::from("core.autocrlf"), String::from("input"))]),
        ..GitConfig::default()
    };
    assert_eq!(
        git.entries(),
        [
            (String::from("user.name"), String::from("Jo")),
            (String::from("commit.gpgsign"), String::from("true")),
            (String::from("core.autocrlf"), String::from("input")),
        ]
    );
}

#[test]
fn rendered_yaml_reloads_and_omits_empty_sections() {
    let mut captured = Descriptor::default();
    captured.apps.push(AppSpec::new("winget", "Git.Git"));
    captured.apps.push(AppSpec::new("scoop", "jq"));
    captured.git = Some(GitConfig {
        user_name: Some(String::from("Jo")),
        ..GitConfig::default()
    });
    captured
        .system_settings
        .insert(String::from("darkMode"), json!(true));

    let yaml = captured.to_yaml().expect("render");

    assert!(!yaml.contains("dotfiles"), "{yaml}");
    assert!(!yaml.contains("source"), "{yaml}");
    assert_eq!(Descriptor::from_yaml(&yaml).expect("reload"), captured);
}
