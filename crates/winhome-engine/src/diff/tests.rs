//! Unit tests for state diffing.

use super::*;

fn set(items: &[&str]) -> BTreeSet<String> {
    items.iter().map(|item| (*item).to_owned()).collect()
}

fn rendered(diff: &StateDiff) -> String {
    let mut out = Vec::new();
    diff.render(&mut out).expect("render");
    String::from_utf8(out).expect("utf8")
}

#[test]
fn partitions_previous_and_desired() {
    let diff = StateDiff::between(
        &set(&["winget:A", "winget:B"]),
        &set(&["winget:A", "winget:C"]),
    );
    assert_eq!(diff.to_remove, set(&["winget:B"]));
    assert_eq!(diff.to_add, set(&["winget:C"]));
    assert_eq!(diff.unchanged, set(&["winget:A"]));
    assert!(diff.has_changes());
}

#[test]
fn report_lists_each_section_with_markers() {
    let diff = StateDiff::between(
        &set(&["winget:A", "winget:B"]),
        &set(&["winget:A", "winget:C"]),
    );
    let text = rendered(&diff);
    assert!(text.contains("[-] Items to Remove:\n  - winget:B\n"));
    assert!(text.contains("[+] Items to Add:\n  + winget:C\n"));
    assert!(text.contains("[=] Unchanged Items:\n  = winget:A\n"));
}

#[test]
fn identical_sets_report_no_changes() {
    let items = set(&["winget:A", "reg:HKCU\\X|Y"]);
    let diff = StateDiff::between(&items, &items);
    assert!(!diff.has_changes());
    let text = rendered(&diff);
    assert!(text.contains("No changes detected"));
    assert!(!text.contains("Unchanged"));
}

#[test]
fn empty_sections_are_omitted() {
    let diff = StateDiff::between(&BTreeSet::new(), &set(&["scoop:jq"]));
    let text = rendered(&diff);
    assert!(text.contains("+ scoop:jq"));
    assert!(!text.contains("Items to Remove"));
    assert!(!text.contains("Unchanged Items"));
}
