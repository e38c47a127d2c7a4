//! Out-of-process plugin support for the `winhome` reconciler.
//!
//! Plugins are trusted local programs written in any language. Each lives in
//! its own directory under the plugins root and is described by a
//! `plugin.yaml` [`PluginManifest`]. The reconciler talks to a plugin with a
//! one-shot protocol over standard I/O: one [`PluginRequest`] JSON line is
//! written to stdin, stdin is closed, and the last JSON object line on stdout
//! is parsed as the [`PluginResult`].
//!
//! # Architecture
//!
//! - [`PluginRunner`] spawns one plugin process per call through the shared
//!   [`winhome_process`] primitive, resolving the interpreter for python and
//!   javascript plugins with [`winhome_process::RuntimeResolver`]. It never
//!   returns an error: every failure is encoded in the returned result.
//! - [`PluginManager`] discovers manifests on disk and bootstraps the
//!   interpreter runtime a plugin type needs.
//!
//! # Example
//!
//! ```rust,no_run
//! use serde_json::json;
//! use winhome_plugins::{PluginCatalog, PluginContext, PluginExecutor, PluginManager, PluginRunner};
//! use winhome_process::RuntimeResolver;
//!
//! let manager = PluginManager::with_default_installer("/opt/winhome/plugins");
//! let runner = PluginRunner::new(RuntimeResolver::new());
//! for plugin in manager.discover() {
//!     let result = runner.execute(&plugin, "check_installed", json!({"packageId": "ripgrep"}),
//!         PluginContext::default());
//!     println!("{}: {}", plugin.name(), result.success);
//! }
//! ```

pub mod error;
pub mod manager;
pub mod manifest;
pub mod protocol;
pub mod runner;

#[cfg(test)]
mod tests;

pub use self::error::PluginError;
pub use self::manager::{PluginCatalog, PluginManager, RuntimeInstaller, ScriptRuntimeInstaller};
pub use self::manifest::{
    MANIFEST_FILE_NAME, PACKAGE_MANAGER_CAPABILITY, PluginKind, PluginManifest, RuntimeFamily,
};
pub use self::protocol::{PluginContext, PluginRequest, PluginResult};
pub use self::runner::{PluginExecutor, PluginRunner, parse_response};
