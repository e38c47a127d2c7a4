//! Captures the host's current state as a descriptor.

use crate::appliers::SystemSettingsApplier;
use crate::descriptor::{AppSpec, Descriptor};
use crate::error::ManagerError;
use crate::managers::ManagerRegistry;
use crate::reporter::Reporter;

/// Builds a descriptor from what the registered managers report as
/// installed and what `settings` can read back.
///
/// Managers that are unavailable or cannot list their packages are skipped
/// with a warning. Apps appear grouped by manager in registry order.
pub fn capture(
    registry: &ManagerRegistry,
    settings: &dyn SystemSettingsApplier,
    reporter: &dyn Reporter,
) -> Descriptor {
    let mut descriptor = Descriptor::default();
    reporter.info("[Generator] Scanning installed applications...");
    for name in registry.names() {
        let Some(manager) = registry.get(name) else {
            continue;
        };
        if !manager.is_available() {
            reporter.info(&format!("[Generator] '{name}' is not available; skipped."));
            continue;
        }
        match manager.installed_packages() {
            Ok(ids) => {
                reporter.info(&format!("[Generator] '{name}' reports {} packages.", ids.len()));
                descriptor
                    .apps
                    .extend(ids.into_iter().map(|id| AppSpec::new(name, id)));
            }
            Err(ManagerError::ListingUnsupported { .. }) => {
                reporter.info(&format!("[Generator] '{name}' cannot list packages; skipped."));
            }
            Err(error) => {
                reporter.warning(&format!("[Generator] Failed to list '{name}': {error}"));
            }
        }
    }
    reporter.info("[Generator] Scanning system settings...");
    descriptor.system_settings = settings.capture();
    descriptor
}
