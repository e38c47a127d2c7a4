//! Global git configuration through `git config --global`.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};
use winhome_engine::descriptor::GitConfig;
use winhome_engine::{ApplyError, ItemApplier};
use winhome_process::{ProcessCommand, ProcessRunner, RuntimeResolver};

use super::APPLIERS_TARGET;

const GIT_TIMEOUT: Duration = Duration::from_secs(30);

pub(crate) struct GitConfigurator {
    runner: Arc<dyn ProcessRunner>,
    resolver: RuntimeResolver,
}

impl GitConfigurator {
    pub(crate) fn new(runner: Arc<dyn ProcessRunner>, resolver: RuntimeResolver) -> Self {
        Self { runner, resolver }
    }

    /// Reads the global identity back. `None` when neither name nor email
    /// is set or git cannot be run.
    pub(crate) fn capture(&self) -> Option<GitConfig> {
        let user_name = self.read("user.name");
        let user_email = self.read("user.email");
        if user_name.is_none() && user_email.is_none() {
            return None;
        }
        Some(GitConfig {
            user_name,
            user_email,
            ..GitConfig::default()
        })
    }

    fn read(&self, key: &str) -> Option<String> {
        let command = ProcessCommand::new(self.resolver.resolve("git"))
            .args(["config", "--global", key])
            .timeout(GIT_TIMEOUT)
            .label("git config");
        match self.runner.run(&command) {
            Ok(output) if output.success() => {
                Some(output.stdout_text().trim().to_owned()).filter(|value| !value.is_empty())
            }
            Ok(_) => None,
            Err(error) => {
                debug!(target: APPLIERS_TARGET, key, %error, "cannot read global git option");
                None
            }
        }
    }
}

impl ItemApplier<GitConfig> for GitConfigurator {
    fn apply(&self, item: &GitConfig, dry_run: bool) -> Result<(), ApplyError> {
        let git = self.resolver.resolve("git");
        for (key, value) in item.entries() {
            if dry_run {
                info!(target: APPLIERS_TARGET, key = %key, "would set global git option");
                continue;
            }
            let failed = |message: String| ApplyError::Failed {
                section: "git",
                item: key.clone(),
                message,
            };
            let command = ProcessCommand::new(git.clone())
                .args(["config", "--global", key.as_str(), value.as_str()])
                .timeout(GIT_TIMEOUT)
                .label("git config");
            let output = self
                .runner
                .run(&command)
                .map_err(|error| failed(error.to_string()))?;
            if !output.success() {
                return Err(failed(format!(
                    "git exited with status {}: {}",
                    output.code.unwrap_or(-1),
                    output.stderr.trim()
                )));
            }
            debug!(target: APPLIERS_TARGET, key = %key, "set global git option");
        }
        Ok(())
    }
}
