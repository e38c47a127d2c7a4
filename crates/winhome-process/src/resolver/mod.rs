//! Executable lookup that does not depend on the inherited `PATH` alone.
//!
//! Resolution order:
//!
//! 1. the OS path search (`which`), which honours `PATHEXT` on Windows;
//! 2. well-known install locations for the tools the reconciler bootstraps;
//! 3. the shim directories maintained by `scoop` and `mise`;
//! 4. the bare name, so a later spawn failure can trigger bootstrapping.

use std::env;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use tracing::debug;

const RESOLVER_TARGET: &str = "winhome_process::resolver";

/// Locates executables for named tools.
#[derive(Debug, Clone, Default)]
pub struct RuntimeResolver {
    search_path: Option<OsString>,
    home: Option<PathBuf>,
    local_data: Option<PathBuf>,
    program_data: Option<PathBuf>,
}

impl RuntimeResolver {
    /// Creates a resolver rooted at the current user's directories.
    #[must_use]
    pub fn new() -> Self {
        Self {
            search_path: None,
            home: dirs::home_dir(),
            local_data: dirs::data_local_dir(),
            program_data: env::var_os("ProgramData").map(PathBuf::from),
        }
    }

    /// Replaces the `PATH` value searched in step one.
    #[must_use]
    pub fn with_search_path(mut self, search_path: impl Into<OsString>) -> Self {
        self.search_path = Some(search_path.into());
        self
    }

    /// Replaces the home directory used for well-known locations.
    #[must_use]
    pub fn with_home(mut self, home: impl Into<PathBuf>) -> Self {
        self.home = Some(home.into());
        self
    }

    /// Replaces the local application data directory.
    #[must_use]
    pub fn with_local_data(mut self, local_data: impl Into<PathBuf>) -> Self {
        self.local_data = Some(local_data.into());
        self
    }

    /// Replaces the machine-wide program data directory.
    #[must_use]
    pub fn with_program_data(mut self, program_data: impl Into<PathBuf>) -> Self {
        self.program_data = Some(program_data.into());
        self
    }

    /// Resolves `name` to an executable path, falling back to the bare name.
    #[must_use]
    pub fn resolve(&self, name: &str) -> PathBuf {
        self.resolve_existing(name).unwrap_or_else(|| {
            debug!(target: RESOLVER_TARGET, tool = name, "falling back to bare tool name");
            PathBuf::from(name)
        })
    }

    /// Resolves `name` only when an executable was actually found.
    #[must_use]
    pub fn resolve_existing(&self, name: &str) -> Option<PathBuf> {
        if let Some(found) = self.search_os_path(name) {
            debug!(target: RESOLVER_TARGET, tool = name, path = %found.display(), "found on PATH");
            return Some(found);
        }

        let found = self
            .known_locations(name)
            .into_iter()
            .chain(self.shim_candidates(name))
            .find(|candidate| candidate.is_file());
        if let Some(path) = &found {
            debug!(target: RESOLVER_TARGET, tool = name, path = %path.display(), "found outside PATH");
        }
        found
    }

    fn search_os_path(&self, name: &str) -> Option<PathBuf> {
        match &self.search_path {
            Some(paths) => {
                let cwd = env::current_dir().unwrap_or_default();
                which::which_in(name, Some(paths), cwd).ok()
            }
            None => which::which(name).ok(),
        }
    }

    /// Install locations used by the official installers of known tools.
    fn known_locations(&self, name: &str) -> Vec<PathBuf> {
        let home = self.home.as_deref();
        let local = self.local_data.as_deref();
        let program_data = self.program_data.as_deref();
        let mut locations = Vec::new();
        let mut push = |base: Option<&Path>, parts: &[&str]| {
            if let Some(base) = base {
                let dir = parts.iter().fold(base.to_path_buf(), |acc, part| acc.join(part));
                locations.extend(executable_names(name).into_iter().map(|file| dir.join(file)));
            }
        };

        match name {
            "uv" => {
                push(local, &["uv"]);
                push(home, &[".local", "bin"]);
                push(home, &[".cargo", "bin"]);
            }
            "bun" => push(home, &[".bun", "bin"]),
            "mise" => {
                push(local, &["mise", "bin"]);
                push(home, &[".local", "bin"]);
            }
            "scoop" => {
                push(home, &["scoop", "shims"]);
                push(program_data, &["scoop", "shims"]);
            }
            "choco" => push(program_data, &["chocolatey", "bin"]),
            "winget" => push(local, &["Microsoft", "WindowsApps"]),
            _ => {}
        }
        locations
    }

    /// Candidate paths inside package-manager shim directories.
    fn shim_candidates(&self, name: &str) -> Vec<PathBuf> {
        let mut dirs = Vec::new();
        if let Some(home) = &self.home {
            dirs.push(home.join("scoop").join("shims"));
        }
        if let Some(local) = &self.local_data {
            dirs.push(local.join("mise").join("shims"));
        }
        dirs.iter()
            .flat_map(|dir| executable_names(name).into_iter().map(move |file| dir.join(file)))
            .collect()
    }
}

/// File names a tool may be installed under on this platform.
fn executable_names(name: &str) -> Vec<String> {
    if cfg!(windows) {
        vec![
            format!("{name}.exe"),
            format!("{name}.cmd"),
            format!("{name}.bat"),
            name.to_owned(),
        ]
    } else {
        vec![name.to_owned()]
    }
}
