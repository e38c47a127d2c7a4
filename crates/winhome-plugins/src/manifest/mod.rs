//! Plugin manifest types describing plugin identity and launch details.
//!
//! A [`PluginManifest`] is read from `<plugins>/<name>/plugin.yaml` and
//! declares the plugin name, version, execution type, entry point relative to
//! the plugin directory, and capability tags. The directory the manifest was
//! found in is attached at load time and is not part of the file.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::PluginError;

/// File name of a plugin manifest inside its directory.
pub const MANIFEST_FILE_NAME: &str = "plugin.yaml";

/// Capability tag marking a plugin that can stand in for a package manager.
pub const PACKAGE_MANAGER_CAPABILITY: &str = "package_manager";

const DEFAULT_VERSION: &str = "1.0.0";

/// How a plugin entry point is executed.
///
/// # Example
///
/// ```
/// use winhome_plugins::{PluginKind, RuntimeFamily};
///
/// assert_eq!(PluginKind::Python.runtime(), Some(RuntimeFamily::Uv));
/// assert_eq!(PluginKind::Executable.runtime(), None);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PluginKind {
    /// Python script run through `uv`.
    Python,
    /// JavaScript module run through `bun`.
    JavaScript,
    /// TypeScript module run through `bun`.
    TypeScript,
    /// Native executable launched directly.
    #[default]
    Executable,
}

impl PluginKind {
    /// Returns the canonical manifest spelling.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Python => "python",
            Self::JavaScript => "javascript",
            Self::TypeScript => "typescript",
            Self::Executable => "executable",
        }
    }

    /// Interpreter family needed to run this kind, if any.
    #[must_use]
    pub const fn runtime(self) -> Option<RuntimeFamily> {
        match self {
            Self::Python => Some(RuntimeFamily::Uv),
            Self::JavaScript | Self::TypeScript => Some(RuntimeFamily::Bun),
            Self::Executable => None,
        }
    }
}

impl std::fmt::Display for PluginKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Interpreter runtimes the reconciler knows how to bootstrap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuntimeFamily {
    /// Astral `uv`, used for python plugins.
    Uv,
    /// `bun`, used for javascript and typescript plugins.
    Bun,
}

impl RuntimeFamily {
    /// Executable name of the runtime tool.
    #[must_use]
    pub const fn tool(self) -> &'static str {
        match self {
            Self::Uv => "uv",
            Self::Bun => "bun",
        }
    }

    /// Arguments placed before the entry point when launching a plugin.
    #[must_use]
    pub const fn launch_args(self) -> &'static [&'static str] {
        match self {
            Self::Uv => &["run", "--quiet"],
            Self::Bun => &["run"],
        }
    }
}

impl std::fmt::Display for RuntimeFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.tool())
    }
}

/// Declarative description of one discovered plugin.
///
/// # Example
///
/// ```
/// use std::path::Path;
/// use winhome_plugins::{PluginKind, PluginManifest};
///
/// let manifest = PluginManifest::from_yaml(
///     "name: vim\ntype: python\nmain: src/main.py\ncapabilities: [package_manager]\n",
///     Path::new("/plugins/vim"),
/// )?;
/// assert_eq!(manifest.name(), "vim");
/// assert_eq!(manifest.version(), "1.0.0");
/// assert_eq!(manifest.kind(), PluginKind::Python);
/// assert_eq!(manifest.entry_point(), Path::new("/plugins/vim/src/main.py"));
/// # Ok::<(), winhome_plugins::PluginError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginManifest {
    name: String,
    #[serde(default = "default_version")]
    version: String,
    #[serde(rename = "type", default)]
    kind: PluginKind,
    main: PathBuf,
    #[serde(default)]
    capabilities: Vec<String>,
    #[serde(skip)]
    directory: PathBuf,
}

fn default_version() -> String {
    DEFAULT_VERSION.to_owned()
}

impl PluginManifest {
    /// Creates a manifest with the default version and no capabilities.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        kind: PluginKind,
        main: impl Into<PathBuf>,
        directory: impl Into<PathBuf>,
    ) -> Self {
        Self {
            name: name.into(),
            version: default_version(),
            kind,
            main: main.into(),
            capabilities: Vec::new(),
            directory: directory.into(),
        }
    }

    /// Overrides the version string.
    #[must_use]
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// Declares the capability tags.
    #[must_use]
    pub fn with_capabilities<I, S>(mut self, capabilities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.capabilities = capabilities.into_iter().map(Into::into).collect();
        self
    }

    /// Parses manifest text found in `directory`.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::Manifest`] when the text is not valid YAML for
    /// a manifest or fails [`PluginManifest::validate`].
    pub fn from_yaml(text: &str, directory: &Path) -> Result<Self, PluginError> {
        let manifest_path = directory.join(MANIFEST_FILE_NAME);
        let mut manifest: Self =
            serde_saphyr::from_str(text).map_err(|error| PluginError::Manifest {
                path: manifest_path.clone(),
                message: error.to_string(),
            })?;
        manifest.directory = directory.to_path_buf();
        manifest.validate().map_err(|message| PluginError::Manifest {
            path: manifest_path,
            message,
        })?;
        Ok(manifest)
    }

    /// Reads and parses `<directory>/plugin.yaml`.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::Manifest`] when the file cannot be read or
    /// parsed.
    pub fn load(directory: &Path) -> Result<Self, PluginError> {
        let path = directory.join(MANIFEST_FILE_NAME);
        let text = std::fs::read_to_string(&path).map_err(|error| PluginError::Manifest {
            path: path.clone(),
            message: error.to_string(),
        })?;
        Self::from_yaml(&text, directory)
    }

    /// Checks the fields YAML parsing cannot enforce.
    fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err(String::from("plugin name must not be empty"));
        }
        if self.main.as_os_str().is_empty() {
            return Err(String::from("plugin entry point `main` must not be empty"));
        }
        if self.main.is_absolute() {
            return Err(format!(
                "plugin entry point must be relative to the plugin directory, got '{}'",
                self.main.display()
            ));
        }
        Ok(())
    }

    /// Returns the plugin name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the plugin version.
    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Returns the execution type.
    #[must_use]
    pub const fn kind(&self) -> PluginKind {
        self.kind
    }

    /// Returns the entry point relative to the plugin directory.
    #[must_use]
    pub fn main(&self) -> &Path {
        &self.main
    }

    /// Returns the directory the manifest was loaded from.
    #[must_use]
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Absolute entry point path.
    #[must_use]
    pub fn entry_point(&self) -> PathBuf {
        self.directory.join(&self.main)
    }

    /// Returns the declared capability tags.
    #[must_use]
    pub fn capabilities(&self) -> &[String] {
        &self.capabilities
    }

    /// Returns `true` when the plugin declares `capability`.
    #[must_use]
    pub fn has_capability(&self, capability: &str) -> bool {
        self.capabilities.iter().any(|tag| tag == capability)
    }
}
