//! Configuration System
//!
//! Layered configuration: built-in defaults, the global config file, the
//! workspace file and `RIGGING__*` environment overrides, in increasing
//! precedence. Environments, resources and modules declared here feed the
//! in-memory repositories used by the CLI.

use crate::execution::ModuleInfo;
use crate::logging::LoggingConfig;
use crate::model::{AggregatedModel, ModuleModel};
use crate::module::{InMemoryModuleRepository, ModuleHandle};
use crate::resource::{Environment, InMemoryResourceRepository, Resource, TargetDirective};
use crate::directive::Directive;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::PathBuf;

mod facade;
mod merge;
mod sources;

pub use facade::ConfigLoader;
pub use sources::global_file::global_config_path;
pub use sources::workspace_file::WORKSPACE_CONFIG_FILE;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RiggingConfig {
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Kernel defaults used by the CLI
    #[serde(default)]
    pub kernel: KernelSettings,

    /// Environments and their resources
    #[serde(default)]
    pub environments: Vec<EnvironmentConfig>,

    /// Module declarations
    #[serde(default)]
    pub modules: Vec<ModuleConfig>,
}

/// Kernel defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KernelSettings {
    /// Environment used when none is given on the command line
    #[serde(default)]
    pub default_environment: Option<String>,

    /// Operation used when none is given on the command line
    #[serde(default = "default_operation")]
    pub default_operation: String,
}

fn default_operation() -> String {
    "deploy".to_string()
}

impl Default for KernelSettings {
    fn default() -> Self {
        Self {
            default_environment: None,
            default_operation: default_operation(),
        }
    }
}

/// Environment declaration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvironmentConfig {
    pub id: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub resources: Vec<ResourceConfig>,
}

/// Resource declaration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceConfig {
    pub id: String,
    #[serde(default)]
    pub plugin_id: String,
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
}

/// Module declaration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleConfig {
    pub id: String,
    /// File the module was declared in, reported on results
    #[serde(default)]
    pub file: Option<PathBuf>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "default_true")]
    pub continue_on_failure: bool,
    #[serde(default)]
    pub models: Vec<AggregatedModel>,
}

fn default_true() -> bool {
    true
}

impl From<&ResourceConfig> for Resource {
    fn from(config: &ResourceConfig) -> Self {
        Resource {
            id: config.id.clone(),
            plugin_id: config.plugin_id.clone(),
            properties: config.properties.clone(),
        }
    }
}

impl From<&EnvironmentConfig> for Environment {
    fn from(config: &EnvironmentConfig) -> Self {
        Environment {
            id: config.id.clone(),
            description: config.description.clone(),
            resources: config.resources.iter().map(Resource::from).collect(),
        }
    }
}

impl From<&ModuleConfig> for ModuleHandle {
    fn from(config: &ModuleConfig) -> Self {
        let mut info = ModuleInfo::new(config.id.clone());
        info.file = config.file.clone();
        ModuleHandle::new(
            info,
            ModuleModel {
                description: config.description.clone(),
                continue_on_failure: config.continue_on_failure,
                models: config.models.clone(),
            },
        )
    }
}

/// Configuration validation errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    Environment(String, String),
    Resource(String, String),
    Module(String, String),
    Kernel(String),
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::Environment(id, msg) => write!(f, "Environment '{}': {}", id, msg),
            ValidationError::Resource(id, msg) => write!(f, "Resource '{}': {}", id, msg),
            ValidationError::Module(id, msg) => write!(f, "Module '{}': {}", id, msg),
            ValidationError::Kernel(msg) => write!(f, "Kernel: {}", msg),
        }
    }
}

impl std::error::Error for ValidationError {}

impl RiggingConfig {
    /// Validate the entire configuration
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if self.kernel.default_operation.trim().is_empty() {
            errors.push(ValidationError::Kernel(
                "Default operation cannot be empty".to_string(),
            ));
        }
        if let Some(env) = &self.kernel.default_environment {
            if !self.environments.iter().any(|e| &e.id == env) {
                errors.push(ValidationError::Kernel(format!(
                    "Default environment '{}' is not declared",
                    env
                )));
            }
        }

        let mut environment_ids = HashSet::new();
        for env in &self.environments {
            if env.id.trim().is_empty() {
                errors.push(ValidationError::Environment(
                    env.id.clone(),
                    "Environment id cannot be empty".to_string(),
                ));
            }
            if !environment_ids.insert(env.id.as_str()) {
                errors.push(ValidationError::Environment(
                    env.id.clone(),
                    "Duplicate environment id".to_string(),
                ));
            }

            let mut resource_ids = HashSet::new();
            for resource in &env.resources {
                let qualified = format!("{}/{}", env.id, resource.id);
                if resource.id.trim().is_empty() {
                    errors.push(ValidationError::Resource(
                        qualified.clone(),
                        "Resource id cannot be empty".to_string(),
                    ));
                }
                if resource.plugin_id.trim().is_empty() {
                    errors.push(ValidationError::Resource(
                        qualified.clone(),
                        "Resource has no plugin_id".to_string(),
                    ));
                }
                if !resource_ids.insert(resource.id.as_str()) {
                    errors.push(ValidationError::Resource(
                        qualified,
                        "Duplicate resource id".to_string(),
                    ));
                }
            }
        }

        let mut module_ids = HashSet::new();
        for module in &self.modules {
            if module.id.trim().is_empty() {
                errors.push(ValidationError::Module(
                    module.id.clone(),
                    "Module id cannot be empty".to_string(),
                ));
            }
            if !module_ids.insert(module.id.as_str()) {
                errors.push(ValidationError::Module(
                    module.id.clone(),
                    "Duplicate module id".to_string(),
                ));
            }
            for (index, model) in module.models.iter().enumerate() {
                if let Err(e) = validate_model(model) {
                    errors.push(ValidationError::Module(
                        module.id.clone(),
                        format!("Model {}: {}", index, e),
                    ));
                }
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Build the resource repository from the declared environments
    pub fn resource_repository(&self) -> InMemoryResourceRepository {
        let repository = InMemoryResourceRepository::new();
        for env in &self.environments {
            repository.register(Environment::from(env));
        }
        repository
    }

    /// Build the module repository from the declared modules
    pub fn module_repository(&self) -> InMemoryModuleRepository {
        let repository = InMemoryModuleRepository::new();
        for module in &self.modules {
            repository.register(ModuleHandle::from(module));
        }
        repository
    }
}

fn validate_model(model: &AggregatedModel) -> Result<(), String> {
    TargetDirective::parse(&model.target_resource).map_err(|e| e.to_string())?;
    Directive::parse_optional(model.target_operation.as_deref()).map_err(|e| e.to_string())?;
    for trigger in &model.triggers {
        if trigger.module.trim().is_empty() {
            return Err("Trigger has no module".to_string());
        }
        Directive::parse_optional(trigger.on_result.as_deref()).map_err(|e| e.to_string())?;
        Directive::parse_optional(trigger.on_target_operation.as_deref())
            .map_err(|e| e.to_string())?;
    }
    Ok(())
}
