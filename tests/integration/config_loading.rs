//! Integration tests for the configuration system feeding the kernel

use rigging::config::{ConfigLoader, WORKSPACE_CONFIG_FILE};
use rigging::messages::BundledCatalog;
use rigging::{Kernel, OperationTask, PluginRegistry};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

/// Serializes tests which set `RIGGING__*` variables.
static ENV_MUTEX: Mutex<()> = Mutex::new(());

const WORKSPACE: &str = r#"
[kernel]
default_environment = "staging"

[[environments]]
id = "staging"
description = "Pre-production"

[[environments.resources]]
id = "web-1"
plugin_id = "noop"

[[environments.resources]]
id = "web-2"
plugin_id = "noop"

[[environments.resources]]
id = "bundle"
plugin_id = "composite-execution"

[[modules]]
id = "web"
file = "modules/web.toml"
description = "Web tier"

[[modules.models]]
description = "web servers"
target_resource = "regex:web-\\d+"
target_operation = "{deploy, undeploy}"

[[modules.models.triggers]]
name = "smoke"
module = "smoke"
on_result = "{SUCCESS}"
operation = "test"

[[modules]]
id = "smoke"

[[modules.models]]
target_resource = "web-1"

[[modules]]
id = "all"
continue_on_failure = false

[[modules.models]]
target_resource = "bundle"
content = { modules = ["web"] }
"#;

fn workspace() -> TempDir {
    let temp = TempDir::new().unwrap();
    std::fs::write(temp.path().join(WORKSPACE_CONFIG_FILE), WORKSPACE).unwrap();
    temp
}

fn task_for(config: &rigging::config::RiggingConfig) -> OperationTask {
    let kernel = Kernel::new(
        Arc::new(config.resource_repository()),
        Arc::new(config.module_repository()),
        Arc::new(PluginRegistry::with_builtins()),
        Arc::new(BundledCatalog::new().unwrap()),
    );
    OperationTask::new(Arc::new(kernel))
}

#[test]
fn test_workspace_config_drives_a_run() {
    let _guard = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    let temp = workspace();
    let config = ConfigLoader::load_from_sources(None, Some(temp.path())).unwrap();
    assert!(config.validate().is_ok());
    assert_eq!(config.kernel.default_environment.as_deref(), Some("staging"));
    assert_eq!(config.kernel.default_operation, "deploy");

    let tree = task_for(&config).execute("web", "staging", "deploy").unwrap();
    let root = tree.get(tree.root()).unwrap();
    assert!(root.is_success());
    assert_eq!(root.message("module-file"), Some("modules/web.toml"));
    // model result plus the smoke trigger
    assert_eq!(root.children().len(), 2);
    let model = tree.get(root.children()[0]).unwrap();
    assert_eq!(model.description(), "Model: web servers");
    assert_eq!(model.children().len(), 2);
}

#[test]
fn test_configured_composite_module() {
    let _guard = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    let temp = workspace();
    let config = ConfigLoader::load_from_sources(None, Some(temp.path())).unwrap();

    let tree = task_for(&config).execute("all", "staging", "deploy").unwrap();
    assert!(tree.get(tree.root()).unwrap().is_success());
    assert!(!tree.policy().is_continue_on_failure());
}

#[test]
fn test_restricted_model_skipped_for_other_operation() {
    let _guard = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    let temp = workspace();
    let config = ConfigLoader::load_from_sources(None, Some(temp.path())).unwrap();

    let tree = task_for(&config).execute("web", "staging", "test").unwrap();
    let root = tree.get(tree.root()).unwrap();
    assert!(root.children().is_empty());
    assert!(root.is_success());
}

#[test]
fn test_global_file_is_overridden_by_workspace() {
    let _guard = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    let temp = workspace();
    let global = temp.path().join("global.toml");
    std::fs::write(
        &global,
        "[kernel]\ndefault_environment = \"prod\"\ndefault_operation = \"install\"\n",
    )
    .unwrap();

    let config = ConfigLoader::load_from_sources(Some(&global), Some(temp.path())).unwrap();
    assert_eq!(config.kernel.default_environment.as_deref(), Some("staging"));
    assert_eq!(config.kernel.default_operation, "install");
}

#[test]
fn test_environment_variables_override_files() {
    let _guard = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    let temp = workspace();
    std::env::set_var("RIGGING__KERNEL__DEFAULT_OPERATION", "undeploy");
    let config = ConfigLoader::load_from_sources(None, Some(temp.path()));
    std::env::remove_var("RIGGING__KERNEL__DEFAULT_OPERATION");

    assert_eq!(config.unwrap().kernel.default_operation, "undeploy");
}

#[test]
fn test_invalid_directive_fails_validation() {
    let _guard = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    let temp = TempDir::new().unwrap();
    std::fs::write(
        temp.path().join(WORKSPACE_CONFIG_FILE),
        r#"
[[modules]]
id = "broken"

[[modules.models]]
target_resource = "web-1"
target_operation = "{deploy"
"#,
    )
    .unwrap();

    let config = ConfigLoader::load_from_sources(None, Some(temp.path())).unwrap();
    let errors = config.validate().unwrap_err();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].to_string().starts_with("Module 'broken': Model 0:"));
}
