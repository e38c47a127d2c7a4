//! Declarative machine-state reconciliation.
//!
//! A [`Descriptor`] states which apps, registry values and configuration a
//! host should carry. The [`Engine`] compares the descriptor's managed items
//! with the set recorded by the previous run, removes what was dropped,
//! installs what is missing and applies every configuration section. The
//! recorded set lives in a [`winhome_state::StateStore`].
//!
//! # Architecture
//!
//! - [`descriptor`] parses and validates the YAML descriptor and merges
//!   profiles. [`tokens`] expands `{{provider:key}}` placeholders in it.
//! - [`managers`] holds the [`ResourceManager`] contract, the built-in
//!   command-line managers and the adapter that turns a `package_manager`
//!   plugin into a manager.
//! - [`appliers`] declares the host mutators the engine delegates to for
//!   non-package sections.
//! - [`engine`] sequences a run; [`diff`] renders the add/remove/unchanged
//!   report; [`pool`] bounds concurrent work within a phase.
//! - [`snapshot`] goes the other way and captures the host as a descriptor.

pub mod appliers;
pub mod descriptor;
pub mod diff;
pub mod engine;
pub mod error;
pub mod identifiers;
pub mod managers;
pub mod network;
pub mod pool;
pub mod reporter;
pub mod snapshot;
pub mod tokens;

pub use self::appliers::{
    Appliers, EnvironmentRefresher, ItemApplier, RegistryApplier, SystemSettingsApplier,
};
pub use self::descriptor::{AppSpec, Descriptor};
pub use self::diff::StateDiff;
pub use self::engine::{Engine, RunOptions, RunSummary};
pub use self::error::{ApplyError, DescriptorError, EngineError, ManagerError};
pub use self::managers::{ManagerRegistry, ResourceManager};
pub use self::network::{NetworkCheck, NetworkProbe, TcpProbe};
pub use self::reporter::{Reporter, TracingReporter};
pub use self::tokens::TokenResolver;
