//! Explicit string traversal over descriptor types.
//!
//! Each descriptor type lists its own string-bearing fields; opaque
//! [`Value`] payloads are walked over their closed set of node kinds. Map
//! keys are never rewritten.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::descriptor::{
    AppSpec, Descriptor, Dotfile, EnvVar, GitConfig, Profile, RegistryTweak, ScheduledTask,
    ServiceConfig, WslConfig, WslDistro,
};

/// Callback receiving every visited string.
pub trait StringVisitor {
    /// Called once per string; may rewrite it in place.
    fn visit(&mut self, value: &mut String);
}

impl<F> StringVisitor for F
where
    F: FnMut(&mut String),
{
    fn visit(&mut self, value: &mut String) {
        self(value);
    }
}

/// Types whose strings can be visited.
pub trait Visit {
    /// Passes every string reachable from `self` to `visitor`.
    fn visit_strings(&mut self, visitor: &mut dyn StringVisitor);
}

impl Visit for String {
    fn visit_strings(&mut self, visitor: &mut dyn StringVisitor) {
        visitor.visit(self);
    }
}

impl<T: Visit> Visit for Option<T> {
    fn visit_strings(&mut self, visitor: &mut dyn StringVisitor) {
        if let Some(inner) = self {
            inner.visit_strings(visitor);
        }
    }
}

impl<T: Visit> Visit for Vec<T> {
    fn visit_strings(&mut self, visitor: &mut dyn StringVisitor) {
        for item in self {
            item.visit_strings(visitor);
        }
    }
}

impl<T: Visit> Visit for BTreeMap<String, T> {
    fn visit_strings(&mut self, visitor: &mut dyn StringVisitor) {
        for value in self.values_mut() {
            value.visit_strings(visitor);
        }
    }
}

impl Visit for Value {
    fn visit_strings(&mut self, visitor: &mut dyn StringVisitor) {
        match self {
            Self::String(text) => visitor.visit(text),
            Self::Array(items) => {
                for item in items {
                    item.visit_strings(visitor);
                }
            }
            Self::Object(map) => {
                for value in map.values_mut() {
                    value.visit_strings(visitor);
                }
            }
            Self::Null | Self::Bool(_) | Self::Number(_) => {}
        }
    }
}

impl Visit for Descriptor {
    fn visit_strings(&mut self, visitor: &mut dyn StringVisitor) {
        self.apps.visit_strings(visitor);
        self.registry_tweaks.visit_strings(visitor);
        self.dotfiles.visit_strings(visitor);
        self.env_vars.visit_strings(visitor);
        self.services.visit_strings(visitor);
        self.scheduled_tasks.visit_strings(visitor);
        self.wsl.visit_strings(visitor);
        self.git.visit_strings(visitor);
        self.system_settings.visit_strings(visitor);
        self.profiles.visit_strings(visitor);
        self.extensions.visit_strings(visitor);
    }
}

impl Visit for AppSpec {
    fn visit_strings(&mut self, visitor: &mut dyn StringVisitor) {
        self.id.visit_strings(visitor);
        self.source.visit_strings(visitor);
        self.version.visit_strings(visitor);
        self.params.visit_strings(visitor);
    }
}

impl Visit for RegistryTweak {
    fn visit_strings(&mut self, visitor: &mut dyn StringVisitor) {
        self.path.visit_strings(visitor);
        self.name.visit_strings(visitor);
        self.value.visit_strings(visitor);
    }
}

impl Visit for Dotfile {
    fn visit_strings(&mut self, visitor: &mut dyn StringVisitor) {
        self.src.visit_strings(visitor);
        self.target.visit_strings(visitor);
    }
}

impl Visit for EnvVar {
    fn visit_strings(&mut self, visitor: &mut dyn StringVisitor) {
        self.value.visit_strings(visitor);
    }
}

impl Visit for ServiceConfig {
    fn visit_strings(&mut self, visitor: &mut dyn StringVisitor) {
        self.name.visit_strings(visitor);
    }
}

impl Visit for ScheduledTask {
    fn visit_strings(&mut self, visitor: &mut dyn StringVisitor) {
        self.description.visit_strings(visitor);
        self.author.visit_strings(visitor);
        self.triggers.visit_strings(visitor);
        self.actions.visit_strings(visitor);
    }
}

impl Visit for WslConfig {
    fn visit_strings(&mut self, visitor: &mut dyn StringVisitor) {
        self.default_distro.visit_strings(visitor);
        self.distros.visit_strings(visitor);
    }
}

impl Visit for WslDistro {
    fn visit_strings(&mut self, visitor: &mut dyn StringVisitor) {
        self.setup_script.visit_strings(visitor);
    }
}

impl Visit for GitConfig {
    fn visit_strings(&mut self, visitor: &mut dyn StringVisitor) {
        self.user_name.visit_strings(visitor);
        self.user_email.visit_strings(visitor);
        self.signing_key.visit_strings(visitor);
        self.settings.visit_strings(visitor);
    }
}

impl Visit for Profile {
    fn visit_strings(&mut self, visitor: &mut dyn StringVisitor) {
        self.git.visit_strings(visitor);
        self.apps.visit_strings(visitor);
        self.env_vars.visit_strings(visitor);
        self.system_settings.visit_strings(visitor);
    }
}
