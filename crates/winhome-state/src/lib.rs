//! Persisted record of what the last reconciliation applied.
//!
//! The state file is a UTF-8 JSON array of managed item identifiers. A
//! missing or empty file means "no prior state". [`StateStore`] caches the
//! set in memory, replaces it wholesale on [`StateStore::save`], and extends
//! it write-through with [`StateStore::mark_applied`] so a run that fails
//! part-way still remembers what it finished.

mod error;
mod store;

pub use self::error::StateError;
pub use self::store::StateStore;
