//! Command-line grammar.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use winhome_config::Config;

/// Environment variable naming the descriptor file.
const DESCRIPTOR_ENV: &str = "WINHOME_CONFIG_PATH";

#[derive(Parser, Debug)]
#[command(
    name = "winhome",
    version,
    about = "Reconcile this machine with a declarative descriptor"
)]
pub(crate) struct Cli {
    #[command(flatten)]
    pub(crate) config: Config,
    /// Enable verbose logging and print full error details.
    #[arg(long, global = true)]
    pub(crate) debug: bool,
    #[command(subcommand)]
    pub(crate) command: Command,
}

#[derive(Subcommand, Debug)]
pub(crate) enum Command {
    /// Bring the machine in line with a descriptor.
    Apply(ApplyArgs),
    /// Inspect, back up or restore the recorded state.
    State {
        #[command(subcommand)]
        action: StateAction,
    },
    /// Inspect installed plugins.
    Plugins {
        #[command(subcommand)]
        action: PluginsAction,
    },
    /// Write a descriptor describing what this machine has installed.
    Generate(GenerateArgs),
}

#[derive(Args, Debug)]
pub(crate) struct GenerateArgs {
    /// Write the descriptor here instead of to standard output.
    #[arg(long, short = 'o')]
    pub(crate) output: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub(crate) struct ApplyArgs {
    /// Path to the YAML descriptor.
    #[arg(long, short = 'c', env = DESCRIPTOR_ENV, default_value = "config.yaml")]
    pub(crate) config: PathBuf,
    /// Preview changes without applying them.
    #[arg(long, short = 'd')]
    pub(crate) dry_run: bool,
    /// Activate a profile from the descriptor (for example `work`).
    #[arg(long, short = 'p')]
    pub(crate) profile: Option<String>,
    /// Show what would be added and removed, then stop.
    #[arg(long)]
    pub(crate) diff: bool,
}

#[derive(Subcommand, Debug)]
pub(crate) enum StateAction {
    /// Print every recorded item.
    List,
    /// Copy the state file to `path`.
    Backup { path: PathBuf },
    /// Replace the state file with the copy at `path`.
    Restore { path: PathBuf },
}

#[derive(Subcommand, Debug)]
pub(crate) enum PluginsAction {
    /// Print every discovered plugin.
    List,
}
