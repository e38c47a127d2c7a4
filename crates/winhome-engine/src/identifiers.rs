//! Managed item identifiers.
//!
//! Identifiers are namespaced strings: `"<manager>:<appId>"` for packages and
//! `"reg:<path>|<name>"` for registry values. They must stay byte-stable
//! across runs because set membership drives add and remove decisions.

/// Prefix of registry value identifiers.
pub const REGISTRY_PREFIX: &str = "reg:";

/// Identifier for an app installed by `manager`.
#[must_use]
pub fn app_item(manager: &str, id: &str) -> String {
    format!("{manager}:{id}")
}

/// Identifier for a registry value.
#[must_use]
pub fn registry_item(path: &str, name: &str) -> String {
    format!("{REGISTRY_PREFIX}{path}|{name}")
}

/// Parsed form of an identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemId<'a> {
    /// Package managed by a resource manager.
    App {
        /// Manager name.
        manager: &'a str,
        /// Manager-specific package id.
        id: &'a str,
    },
    /// Registry value.
    Registry {
        /// Key path.
        path: &'a str,
        /// Value name.
        name: &'a str,
    },
}

impl<'a> ItemId<'a> {
    /// Splits `raw` into its kind and parts. Returns `None` for malformed
    /// identifiers.
    #[must_use]
    pub fn parse(raw: &'a str) -> Option<Self> {
        if let Some(rest) = raw.strip_prefix(REGISTRY_PREFIX) {
            let (path, name) = rest.split_once('|')?;
            return Some(Self::Registry { path, name });
        }
        let (manager, id) = raw.split_once(':')?;
        if manager.is_empty() || id.is_empty() {
            return None;
        }
        Some(Self::App { manager, id })
    }
}
