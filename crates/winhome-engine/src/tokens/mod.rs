//! `{{provider:key}}` token resolution.
//!
//! After a descriptor is loaded, every string it contains is passed through
//! [`TokenResolver`]. Supported providers:
//!
//! - `env`: the named environment variable. A missing variable resolves to
//!   an empty string and logs a warning.
//! - `file`: the trimmed contents of the named file, with a leading `~`
//!   expanded to the home directory. An unreadable file keeps the token and
//!   logs a warning.
//!
//! Tokens naming any other provider are left untouched.

mod visit;

use std::fs;
use std::path::PathBuf;

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use tracing::warn;

use crate::descriptor::Descriptor;

pub use self::visit::{StringVisitor, Visit};

/// Tracing target for token resolution.
const TOKENS_TARGET: &str = "winhome_engine::tokens";

#[expect(clippy::expect_used, reason = "pattern is a compile-time constant")]
static TOKEN_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\{\{\s*(\w+):(.+?)\s*\}\}").expect("token pattern is valid")
});

type EnvLookup = Box<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// Rewrites secret tokens in strings.
pub struct TokenResolver {
    env: EnvLookup,
    home: Option<PathBuf>,
}

impl Default for TokenResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenResolver {
    /// Resolver backed by the process environment and home directory.
    #[must_use]
    pub fn new() -> Self {
        Self {
            env: Box::new(|name| std::env::var(name).ok()),
            home: dirs::home_dir(),
        }
    }

    /// Replaces the environment lookup.
    #[must_use]
    pub fn with_env_lookup<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        self.env = Box::new(lookup);
        self
    }

    /// Replaces the directory `~` expands to.
    #[must_use]
    pub fn with_home(mut self, home: impl Into<PathBuf>) -> Self {
        self.home = Some(home.into());
        self
    }

    /// Returns `input` with every recognised token replaced.
    #[must_use]
    pub fn resolve(&self, input: &str) -> String {
        if !input.contains("{{") {
            return input.to_owned();
        }
        TOKEN_PATTERN
            .replace_all(input, |captures: &Captures<'_>| self.replace(captures))
            .into_owned()
    }

    /// Resolves tokens in every string of `descriptor` in place.
    pub fn resolve_descriptor(&self, descriptor: &mut Descriptor) {
        descriptor.visit_strings(&mut |value: &mut String| {
            if value.contains("{{") {
                *value = self.resolve(value);
            }
        });
    }

    fn replace(&self, captures: &Captures<'_>) -> String {
        let whole = captures.get(0).map_or("", |m| m.as_str());
        let provider = captures.get(1).map_or("", |m| m.as_str());
        let key = captures.get(2).map_or("", |m| m.as_str().trim());
        match provider.to_ascii_lowercase().as_str() {
            "env" => self.resolve_env(key),
            "file" => self.resolve_file(key).unwrap_or_else(|| whole.to_owned()),
            _ => whole.to_owned(),
        }
    }

    fn resolve_env(&self, name: &str) -> String {
        match (self.env)(name) {
            Some(value) if !value.is_empty() => value,
            _ => {
                warn!(target: TOKENS_TARGET, variable = name, "environment variable not found");
                String::new()
            }
        }
    }

    fn resolve_file(&self, raw: &str) -> Option<String> {
        let path = self.expand_home(raw);
        match fs::read_to_string(&path) {
            Ok(text) => Some(text.trim().to_owned()),
            Err(error) => {
                warn!(
                    target: TOKENS_TARGET,
                    path = %path.display(),
                    %error,
                    "failed to read secret file"
                );
                None
            }
        }
    }

    fn expand_home(&self, raw: &str) -> PathBuf {
        match (raw.strip_prefix('~'), &self.home) {
            (Some(rest), Some(home)) => {
                home.join(rest.trim_start_matches(['/', '\\']))
            }
            _ => PathBuf::from(raw),
        }
    }
}
