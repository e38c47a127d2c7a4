//! Unit tests for the state store.

use std::collections::BTreeSet;
use std::fs;
use std::sync::Arc;
use std::thread;

use rstest::{fixture, rstest};
use tempfile::TempDir;

use super::*;

struct Workspace {
    _dir: TempDir,
    state: PathBuf,
}

#[fixture]
fn workspace() -> Workspace {
    let dir = TempDir::new().expect("temp dir");
    let state = dir.path().join("winhome.state.json");
    Workspace { _dir: dir, state }
}

fn set(items: &[&str]) -> BTreeSet<String> {
    items.iter().map(|item| (*item).to_owned()).collect()
}

#[rstest]
fn missing_file_loads_empty(workspace: Workspace) {
    let store = StateStore::new(&workspace.state);
    assert!(store.load().is_empty());
    assert!(!workspace.state.exists());
}

#[rstest]
#[case::not_json("not json at all")]
#[case::wrong_shape(r#"{"items": ["a"]}"#)]
#[case::mixed_types(r#"["a", 1]"#)]
#[case::blank("   \n")]
fn unusable_file_loads_empty(workspace: Workspace, #[case] content: &str) {
    fs::write(&workspace.state, content).expect("seed state");
    let store = StateStore::new(&workspace.state);
    assert!(store.load().is_empty());
}

#[rstest]
fn save_then_load_from_fresh_store(workspace: Workspace) {
    let items = set(&["winget:A", "reg:HKCU\\Software\\X|Y"]);
    StateStore::new(&workspace.state).save(&items).expect("save");

    assert_eq!(StateStore::new(&workspace.state).load(), items);
    let raw: Vec<String> =
        serde_json::from_str(&fs::read_to_string(&workspace.state).expect("read")).expect("array");
    assert_eq!(raw.len(), 2);
}

#[rstest]
fn save_replaces_previous_contents(workspace: Workspace) {
    let store = StateStore::new(&workspace.state);
    store.save(&set(&["a", "b"])).expect("first save");
    store.save(&set(&["c"])).expect("second save");
    assert_eq!(store.list(), ["c"]);
    assert_eq!(StateStore::new(&workspace.state).load(), set(&["c"]));
}

#[rstest]
fn mark_applied_writes_through_without_save(workspace: Workspace) {
    StateStore::new(&workspace.state)
        .mark_applied("x")
        .expect("mark applied");
    assert!(StateStore::new(&workspace.state).load().contains("x"));
}

#[rstest]
fn mark_applied_keeps_existing_items(workspace: Workspace) {
    fs::write(&workspace.state, r#"["winget:A"]"#).expect("seed state");
    let store = StateStore::new(&workspace.state);
    store.mark_applied("winget:B").expect("mark applied");
    assert_eq!(store.list(), ["winget:A", "winget:B"]);
}

#[rstest]
fn mark_applied_is_a_no_op_for_known_items(workspace: Workspace) {
    let store = StateStore::new(&workspace.state);
    store.save(&set(&["x"])).expect("save");
    let before = fs::read(&workspace.state).expect("read");
    fs::write(&workspace.state, &before).expect("rewrite");
    let modified = fs::metadata(&workspace.state).and_then(|meta| meta.modified()).expect("mtime");

    store.mark_applied("x").expect("mark applied");

    let after = fs::metadata(&workspace.state).and_then(|meta| meta.modified()).expect("mtime");
    assert_eq!(modified, after);
    assert_eq!(fs::read(&workspace.state).expect("read"), before);
}

#[rstest]
fn concurrent_mark_applied_records_every_item(workspace: Workspace) {
    let store = Arc::new(StateStore::new(&workspace.state));
    let handles: Vec<_> = (0..16)
        .map(|index| {
            let store = Arc::clone(&store);
            thread::spawn(move || store.mark_applied(&format!("item:{index:02}")))
        })
        .collect();
    for handle in handles {
        handle.join().expect("join").expect("mark applied");
    }

    let loaded = StateStore::new(&workspace.state).load();
    assert_eq!(loaded.len(), 16);
    assert!(loaded.contains("item:00"));
    assert!(loaded.contains("item:15"));
}

#[rstest]
fn backup_and_restore_round_trip(workspace: Workspace) {
    let backup = workspace.state.with_file_name("backup.json");
    let store = StateStore::new(&workspace.state);
    store.save(&set(&["keep"])).expect("save");
    store.backup(&backup).expect("backup");

    store.save(&set(&["other"])).expect("overwrite");
    store.restore(&backup).expect("restore");

    assert_eq!(store.list(), ["keep"]);
    assert_eq!(StateStore::new(&workspace.state).load(), set(&["keep"]));
}

#[rstest]
fn backup_without_state_writes_empty_array(workspace: Workspace) {
    let backup = workspace.state.with_file_name("backup.json");
    StateStore::new(&workspace.state)
        .backup(&backup)
        .expect("backup");
    let raw: Vec<String> =
        serde_json::from_str(&fs::read_to_string(&backup).expect("read")).expect("array");
    assert!(raw.is_empty());
}

#[rstest]
fn restore_from_missing_backup_fails(workspace: Workspace) {
    let store = StateStore::new(&workspace.state);
    let error = store
        .restore(&workspace.state.with_file_name("absent.json"))
        .expect_err("missing backup");
    assert!(matches!(error, StateError::MissingBackup { .. }));
}
