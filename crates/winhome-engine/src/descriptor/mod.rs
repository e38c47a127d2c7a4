//! Desired-state descriptor model and loader.
//!
//! The descriptor is user-authored YAML with camelCase keys. Every section is
//! optional. Opaque payloads (registry values, system settings, extension
//! configuration, scheduled task triggers and actions) are kept as
//! [`serde_json::Value`] so they can be forwarded to appliers and plugins
//! untouched.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::DescriptorError;

/// Manager used when an app does not name one.
pub const DEFAULT_MANAGER: &str = "winget";

fn default_version() -> String {
    String::from("1.0")
}

fn default_manager() -> String {
    String::from(DEFAULT_MANAGER)
}

fn default_registry_type() -> String {
    String::from("string")
}

fn default_env_action() -> String {
    String::from("set")
}

fn default_service_state() -> String {
    String::from("running")
}

const fn default_wsl_version() -> u8 {
    2
}

/// Root of a desired-state descriptor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Descriptor {
    /// Descriptor format version, informational only.
    #[serde(default = "default_version")]
    pub version: String,
    /// Packages, installed in list order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub apps: Vec<AppSpec>,
    /// Explicit registry values.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub registry_tweaks: Vec<RegistryTweak>,
    /// Files linked into place.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dotfiles: Vec<Dotfile>,
    /// Environment variable changes.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub env_vars: Vec<EnvVar>,
    /// Service states.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub services: Vec<ServiceConfig>,
    /// Scheduled task definitions.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub scheduled_tasks: Vec<ScheduledTask>,
    /// WSL configuration.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wsl: Option<WslConfig>,
    /// Global git configuration.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub git: Option<GitConfig>,
    /// Free-form settings resolved by the system settings applier.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub system_settings: BTreeMap<String, Value>,
    /// Named overrides selectable at run time.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub profiles: BTreeMap<String, Profile>,
    /// Per-plugin configuration sent with the `apply` command.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extensions: BTreeMap<String, Value>,
}

impl Default for Descriptor {
    fn default() -> Self {
        Self {
            version: default_version(),
            apps: Vec::new(),
            registry_tweaks: Vec::new(),
            dotfiles: Vec::new(),
            env_vars: Vec::new(),
            services: Vec::new(),
            scheduled_tasks: Vec::new(),
            wsl: None,
            git: None,
            system_settings: BTreeMap::new(),
            profiles: BTreeMap::new(),
            extensions: BTreeMap::new(),
        }
    }
}

/// One package to install.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppSpec {
    /// Manager-specific package id.
    pub id: String,
    /// Package source, where the manager supports one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// Name of the resource manager.
    #[serde(default = "default_manager")]
    pub manager: String,
    /// Requested version.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Extra installer parameters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<String>,
}

impl AppSpec {
    /// App with the given manager and id and no optional fields.
    #[must_use]
    pub fn new(manager: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            source: None,
            manager: manager.into(),
            version: None,
            params: None,
        }
    }
}

/// A registry value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryTweak {
    /// Key path, including the hive.
    pub path: String,
    /// Value name.
    pub name: String,
    /// Value data.
    #[serde(default)]
    pub value: Value,
    /// Registry value type (`string`, `dword`, ...).
    #[serde(rename = "type", default = "default_registry_type")]
    pub kind: String,
}

/// A file linked from the descriptor's tree into place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dotfile {
    /// Source file.
    pub src: String,
    /// Link location.
    pub target: String,
}

/// An environment variable change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvVar {
    /// Variable name.
    pub variable: String,
    /// Value to set, append or prepend.
    #[serde(default)]
    pub value: String,
    /// `set`, `append` or `prepend`.
    #[serde(default = "default_env_action")]
    pub action: String,
}

/// Desired state of a service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceConfig {
    /// Service name.
    pub name: String,
    /// `running` or `stopped`.
    #[serde(default = "default_service_state")]
    pub state: String,
    /// Startup type (`automatic`, `manual`, `disabled`).
    #[serde(default)]
    pub startup: Option<String>,
}

/// A scheduled task definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledTask {
    /// Task name.
    pub name: String,
    /// Task folder.
    #[serde(default)]
    pub path: String,
    /// Task description.
    #[serde(default)]
    pub description: Option<String>,
    /// Task author.
    #[serde(default)]
    pub author: Option<String>,
    /// Trigger definitions, forwarded as-is.
    #[serde(default)]
    pub triggers: Vec<Value>,
    /// Action definitions, forwarded as-is.
    #[serde(default)]
    pub actions: Vec<Value>,
}

/// WSL configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WslConfig {
    /// Default WSL version for new distributions.
    #[serde(default = "default_wsl_version")]
    pub default_version: u8,
    /// Default distribution.
    #[serde(default)]
    pub default_distro: Option<String>,
    /// Whether to update the WSL kernel.
    #[serde(default)]
    pub update: bool,
    /// Distributions to install.
    #[serde(default)]
    pub distros: Vec<WslDistro>,
}

/// A WSL distribution to install.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WslDistro {
    /// Distribution name.
    pub name: String,
    /// Script run inside the distribution after install.
    #[serde(default)]
    pub setup_script: Option<String>,
}

/// Global git configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GitConfig {
    /// `user.name`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,
    /// `user.email`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_email: Option<String>,
    /// `user.signingkey`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signing_key: Option<String>,
    /// `commit.gpgsign`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commit_gpg_sign: Option<bool>,
    /// Any other `key = value` pairs.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub settings: BTreeMap<String, String>,
}

impl GitConfig {
    /// Flattens the configuration into `git config` key/value pairs.
    #[must_use]
    pub fn entries(&self) -> Vec<(String, String)> {
        let mut entries = Vec::new();
        let named = [
            ("user.name", self.user_name.clone()),
            ("user.email", self.user_email.clone()),
            ("user.signingkey", self.signing_key.clone()),
            ("commit.gpgsign", self.commit_gpg_sign.map(|flag| flag.to_string())),
        ];
        for (key, value) in named {
            if let Some(value) = value {
                entries.push((key.to_owned(), value));
            }
        }
        entries.extend(
            self.settings
                .iter()
                .map(|(key, value)| (key.clone(), value.clone())),
        );
        entries
    }
}

/// Overrides applied when a profile is selected.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    /// Replaces the base git configuration.
    #[serde(default)]
    pub git: Option<GitConfig>,
    /// Appended after the base apps.
    #[serde(default)]
    pub apps: Vec<AppSpec>,
    /// Appended after the base environment variables.
    #[serde(default)]
    pub env_vars: Vec<EnvVar>,
    /// Merged over the base settings; profile values win.
    #[serde(default)]
    pub system_settings: BTreeMap<String, Value>,
}

impl Descriptor {
    /// Parses and validates descriptor text.
    ///
    /// # Errors
    ///
    /// Returns [`DescriptorError::Parse`] for malformed YAML and
    /// [`DescriptorError::Invalid`] when validation fails.
    pub fn from_yaml(text: &str) -> Result<Self, DescriptorError> {
        let descriptor: Self = if text.trim().is_empty() {
            Self::default()
        } else {
            serde_saphyr::from_str(text).map_err(|error| DescriptorError::Parse {
                message: error.to_string(),
            })?
        };
        descriptor.validate()?;
        Ok(descriptor)
    }

    /// Reads, parses and validates the descriptor at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`DescriptorError::Read`] when the file cannot be read, or any
    /// error from [`Descriptor::from_yaml`].
    pub fn load(path: &Path) -> Result<Self, DescriptorError> {
        let text = fs::read_to_string(path).map_err(|source| DescriptorError::Read {
            path: path.to_path_buf(),
            source: Arc::new(source),
        })?;
        Self::from_yaml(&text)
    }

    /// Renders the descriptor as YAML. Empty sections are left out.
    ///
    /// # Errors
    ///
    /// Returns [`DescriptorError::Render`] when serialisation fails.
    pub fn to_yaml(&self) -> Result<String, DescriptorError> {
        serde_saphyr::to_string(self).map_err(|error| DescriptorError::Render {
            message: error.to_string(),
        })
    }

    /// Checks the structural rules the YAML model cannot express.
    ///
    /// # Errors
    ///
    /// Returns [`DescriptorError::Invalid`] listing every violation.
    pub fn validate(&self) -> Result<(), DescriptorError> {
        let mut problems = Vec::new();
        check_apps("apps", &self.apps, &mut problems);
        for (index, tweak) in self.registry_tweaks.iter().enumerate() {
            if tweak.path.trim().is_empty() {
                problems.push(format!("registryTweaks[{index}]: path must not be empty"));
            }
            if tweak.name.trim().is_empty() {
                problems.push(format!("registryTweaks[{index}]: name must not be empty"));
            }
        }
        for (index, dotfile) in self.dotfiles.iter().enumerate() {
            if dotfile.src.trim().is_empty() || dotfile.target.trim().is_empty() {
                problems.push(format!("dotfiles[{index}]: src and target must not be empty"));
            }
        }
        check_env_vars("envVars", &self.env_vars, &mut problems);
        for (name, profile) in &self.profiles {
            check_apps(&format!("profiles.{name}.apps"), &profile.apps, &mut problems);
            check_env_vars(
                &format!("profiles.{name}.envVars"),
                &profile.env_vars,
                &mut problems,
            );
        }
        if problems.is_empty() {
            Ok(())
        } else {
            Err(DescriptorError::Invalid { problems })
        }
    }

    /// Returns a copy with the named profile merged in.
    ///
    /// # Errors
    ///
    /// Returns [`DescriptorError::UnknownProfile`] when no such profile
    /// exists.
    pub fn with_profile(&self, name: &str) -> Result<Self, DescriptorError> {
        let profile = self
            .profiles
            .get(name)
            .ok_or_else(|| DescriptorError::UnknownProfile {
                name: name.to_owned(),
            })?;
        let mut merged = self.clone();
        if let Some(git) = &profile.git {
            merged.git = Some(git.clone());
        }
        merged.apps.extend(profile.apps.iter().cloned());
        merged.env_vars.extend(profile.env_vars.iter().cloned());
        merged.system_settings.extend(
            profile
                .system_settings
                .iter()
                .map(|(key, value)| (key.clone(), value.clone())),
        );
        Ok(merged)
    }

    /// Returns `true` when the run will download anything.
    #[must_use]
    pub fn needs_network(&self) -> bool {
        !self.apps.is_empty() || self.wsl.as_ref().is_some_and(|wsl| wsl.update)
    }

    /// Manager names used by apps, in order of first use.
    #[must_use]
    pub fn referenced_managers(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for app in &self.apps {
            if !names.contains(&app.manager.as_str()) {
                names.push(&app.manager);
            }
        }
        names
    }
}

fn check_apps(section: &str, apps: &[AppSpec], problems: &mut Vec<String>) {
    for (index, app) in apps.iter().enumerate() {
        if app.id.trim().is_empty() {
            problems.push(format!("{section}[{index}]: id must not be empty"));
        }
        if app.manager.trim().is_empty() {
            problems.push(format!("{section}[{index}]: manager must not be empty"));
        }
    }
}

fn check_env_vars(section: &str, variables: &[EnvVar], problems: &mut Vec<String>) {
    for (index, variable) in variables.iter().enumerate() {
        if variable.variable.trim().is_empty() {
            problems.push(format!("{section}[{index}]: variable must not be empty"));
        }
    }
}

#[cfg(test)]
mod tests;
