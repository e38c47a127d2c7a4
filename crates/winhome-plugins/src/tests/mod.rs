//! End-to-end tests that run real shell-script plugins.

#![cfg(unix)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::time::{Duration, Instant};

use serde_json::{Value, json};
use tempfile::TempDir;
use winhome_process::RuntimeResolver;

use crate::{PluginContext, PluginExecutor, PluginKind, PluginManifest, PluginRunner};

/// Reads the request line and echoes `args.message` back with the same id.
const ECHO_SCRIPT: &str = r#"#!/bin/sh
line=$(cat)
id=$(printf '%s' "$line" | sed -n 's/.*"requestId":"\([^"]*\)".*/\1/p')
message=$(printf '%s' "$line" | sed -n 's/.*"message":"\([^"]*\)".*/\1/p')
printf '{"requestId":"%s","success":true,"changed":true,"data":{"echo":"%s"}}\n' "$id" "$message"
"#;

fn install_script(dir: &TempDir, body: &str) -> PluginManifest {
    let path = dir.path().join("plugin.sh");
    fs::write(&path, body).expect("write plugin script");
    let mut permissions = fs::metadata(&path).expect("stat script").permissions();
    permissions.set_mode(0o755);
    fs::set_permissions(&path, permissions).expect("chmod script");
    PluginManifest::new("script", PluginKind::Executable, "plugin.sh", dir.path())
}

fn runner() -> PluginRunner {
    PluginRunner::new(RuntimeResolver::new())
}

#[test]
fn echo_plugin_round_trips_a_request() {
    let dir = TempDir::new().expect("temp dir");
    let plugin = install_script(&dir, ECHO_SCRIPT);

    let result = runner().execute(&plugin, "echo", json!({"message": "hi"}), PluginContext::default());

    assert!(result.success, "{}", result.error_message());
    assert!(result.changed);
    assert_eq!(result.data["echo"], "hi");
    assert!(!result.request_id.is_empty());
}

#[test]
fn diagnostic_lines_before_the_result_are_ignored() {
    let dir = TempDir::new().expect("temp dir");
    let plugin = install_script(
        &dir,
        "#!/bin/sh\ncat >/dev/null\necho 'Installed 3 packages in 12ms'\necho '{\"success\":true,\"data\":true}'\n",
    );

    let result = runner().execute(&plugin, "check_installed", Value::Null, PluginContext::default());

    assert!(result.success);
    assert!(result.data_is_true());
}

#[test]
fn plugin_sees_its_name_and_directory() {
    let dir = TempDir::new().expect("temp dir");
    let plugin = install_script(
        &dir,
        "#!/bin/sh\ncat >/dev/null\nprintf '{\"success\":true,\"data\":{\"name\":\"%s\",\"cwd\":\"%s\"}}\\n' \"$WINHOME_PLUGIN_NAME\" \"$(pwd -P)\"\n",
    );

    let result = runner().execute(&plugin, "whoami", Value::Null, PluginContext::default());

    assert!(result.success, "{}", result.error_message());
    assert_eq!(result.data["name"], "script");
    let expected = dir.path().canonicalize().expect("canonical dir");
    assert_eq!(result.data["cwd"], expected.display().to_string());
}

#[test]
fn non_zero_exit_is_a_failure() {
    let dir = TempDir::new().expect("temp dir");
    let plugin = install_script(&dir, "#!/bin/sh\ncat >/dev/null\necho '{\"success\":true}'\nexit 4\n");

    let result = runner().execute(&plugin, "install", Value::Null, PluginContext::default());

    assert!(!result.success);
    assert!(result.error_message().contains("non-zero status 4"), "{}", result.error_message());
}

#[test]
fn silent_plugin_is_a_failure() {
    let dir = TempDir::new().expect("temp dir");
    let plugin = install_script(&dir, "#!/bin/sh\ncat >/dev/null\n");

    let result = runner().execute(&plugin, "install", Value::Null, PluginContext::default());

    assert!(!result.success);
    assert!(result.error_message().contains("empty response"));
}

#[test]
fn hung_plugin_is_killed_at_the_timeout() {
    let dir = TempDir::new().expect("temp dir");
    let plugin = install_script(&dir, "#!/bin/sh\nexec sleep 60\n");
    let runner = runner().with_timeout(Duration::from_millis(500));

    let started = Instant::now();
    let result = runner.execute(&plugin, "install", Value::Null, PluginContext::default());

    assert!(!result.success);
    assert!(result.error_message().contains("timed out"), "{}", result.error_message());
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[test]
fn runaway_output_is_rejected() {
    let dir = TempDir::new().expect("temp dir");
    let plugin = install_script(&dir, "#!/bin/sh\nexec yes overflow\n");
    let runner = runner().with_output_limit(64 * 1024);

    let result = runner.execute(&plugin, "install", Value::Null, PluginContext::default());

    assert!(!result.success);
    assert!(result.error_message().contains("size limit"), "{}", result.error_message());
}
