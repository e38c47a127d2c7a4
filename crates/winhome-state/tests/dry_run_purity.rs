//! Behavioural checks across store instances sharing one file.

use std::collections::BTreeSet;
use std::fs;

use tempfile::TempDir;
use winhome_state::StateStore;

#[test]
fn reading_never_rewrites_the_file() {
    let dir = TempDir::new().expect("temp dir");
    let path = dir.path().join("state.json");
    fs::write(&path, "[\n  \"b\",\n  \"a\"\n]").expect("seed");
    let before = fs::read(&path).expect("read");

    let store = StateStore::new(&path);
    let loaded = store.load();
    let listed = store.list();

    assert_eq!(loaded, BTreeSet::from([String::from("a"), String::from("b")]));
    assert_eq!(listed, ["a", "b"]);
    assert_eq!(fs::read(&path).expect("read"), before);
}

#[test]
fn nested_state_directory_is_created_on_first_write() {
    let dir = TempDir::new().expect("temp dir");
    let path = dir.path().join("nested").join("deeper").join("state.json");

    StateStore::new(&path).mark_applied("first").expect("mark applied");

    assert!(path.is_file());
    assert_eq!(StateStore::new(&path).list(), ["first"]);
}
