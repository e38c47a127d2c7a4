//! Set difference between recorded and desired state.

use std::collections::BTreeSet;
use std::io::{self, Write};

/// Partition of identifiers into removals, additions and unchanged items.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StateDiff {
    /// Recorded previously, no longer desired.
    pub to_remove: BTreeSet<String>,
    /// Desired, not recorded previously.
    pub to_add: BTreeSet<String>,
    /// Recorded and still desired.
    pub unchanged: BTreeSet<String>,
}

impl StateDiff {
    /// Computes the diff from `previous` to `desired`.
    #[must_use]
    pub fn between(previous: &BTreeSet<String>, desired: &BTreeSet<String>) -> Self {
        Self {
            to_remove: previous.difference(desired).cloned().collect(),
            to_add: desired.difference(previous).cloned().collect(),
            unchanged: previous.intersection(desired).cloned().collect(),
        }
    }

    /// Returns `true` when anything would be added or removed.
    #[must_use]
    pub fn has_changes(&self) -> bool {
        !self.to_remove.is_empty() || !self.to_add.is_empty()
    }

    /// Writes the human-readable report.
    ///
    /// # Errors
    ///
    /// Propagates write failures from `out`.
    pub fn render(&self, out: &mut dyn Write) -> io::Result<()> {
        writeln!(out, "--- State Diff ---")?;
        if !self.has_changes() {
            writeln!(out, "No changes detected. System is up to date.")?;
            return Ok(());
        }
        render_section(out, "[-] Items to Remove:", '-', &self.to_remove)?;
        render_section(out, "[+] Items to Add:", '+', &self.to_add)?;
        render_section(out, "[=] Unchanged Items:", '=', &self.unchanged)
    }
}

fn render_section(
    out: &mut dyn Write,
    heading: &str,
    marker: char,
    items: &BTreeSet<String>,
) -> io::Result<()> {
    if items.is_empty() {
        return Ok(());
    }
    writeln!(out)?;
    writeln!(out, "{heading}")?;
    for item in items {
        writeln!(out, "  {marker} {item}")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests;
