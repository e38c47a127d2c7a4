//! Unit tests for the manager registry.

use mockall::mock;
use winhome_process::SystemProcessRunner;

use super::*;

mock! {
    pub Manager {}
    impl ResourceManager for Manager {
        fn name(&self) -> &str;
        fn is_available(&self) -> bool;
        fn bootstrap(&self, dry_run: bool) -> Result<(), ManagerError>;
        fn is_installed(&self, id: &str) -> bool;
        fn install(&self, app: &AppSpec, dry_run: bool) -> Result<(), ManagerError>;
        fn uninstall(&self, id: &str, dry_run: bool) -> Result<(), ManagerError>;
        fn installed_packages(&self) -> Result<Vec<String>, ManagerError>;
    }
}

fn named(name: &'static str) -> MockManager {
    let mut manager = MockManager::new();
    manager.expect_name().return_const(name.to_owned());
    manager
}

#[test]
fn builtins_are_registered_by_name() {
    let runner: Arc<dyn ProcessRunner> = Arc::new(SystemProcessRunner);
    let registry = ManagerRegistry::with_builtins(&runner, &RuntimeResolver::default());
    let names: Vec<&str> = registry.names().collect();
    assert_eq!(names, ["choco", "mise", "scoop", "winget"]);
    assert_eq!(registry.len(), 4);
}

#[test]
fn first_registration_wins() {
    let mut registry = ManagerRegistry::new();
    let mut builtin = named("scoop");
    builtin.expect_is_available().return_const(true);
    let mut plugin = named("scoop");
    plugin.expect_is_available().never();

    assert!(registry.register(Arc::new(builtin)));
    assert!(!registry.register(Arc::new(plugin)));

    let resolved = registry.get("scoop").expect("registered");
    assert!(resolved.is_available());
    assert_eq!(registry.len(), 1);
}

#[test]
fn unknown_names_resolve_to_none() {
    let registry = ManagerRegistry::new();
    assert!(registry.is_empty());
    assert!(registry.get("winget").is_none());
    assert!(!registry.contains("winget"));
}
