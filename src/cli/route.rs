//! CLI route: single route table and run context. Dispatches to the task runner and presentation.

use crate::config::{ConfigLoader, RiggingConfig, ValidationError};
use crate::error::KernelError;
use crate::execution::{ExecutionState, ResultReport};
use crate::kernel::Kernel;
use crate::messages::BundledCatalog;
use crate::plugin::{OperationRegistry, PluginRegistry};
use crate::task::OperationTask;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

use crate::cli::output::CommandOutput;
use crate::cli::parse::{Commands, OutputFormat};
use crate::cli::presentation::{
    format_modules_json, format_modules_text, format_report_json, format_result_tree_text,
    format_summary_table, format_validation_text,
};

/// Runtime context for CLI execution: workspace, loaded configuration and kernel.
/// Built from workspace path and optional config path using ConfigLoader only.
pub struct RunContext {
    workspace_root: PathBuf,
    config: RiggingConfig,
    registry: Arc<PluginRegistry>,
    color: bool,
}

impl RunContext {
    /// Create run context from workspace root and optional config path. Uses ConfigLoader only.
    pub fn new(workspace_root: PathBuf, config_path: Option<PathBuf>) -> Result<Self, KernelError> {
        let config = if let Some(ref cfg_path) = config_path {
            ConfigLoader::load_from_file(cfg_path)?
        } else {
            ConfigLoader::load(&workspace_root)?
        };

        Ok(Self {
            workspace_root,
            config,
            registry: Arc::new(PluginRegistry::with_builtins()),
            color: true,
        })
    }

    /// Disable ANSI colors in rendered result trees.
    pub fn with_color(mut self, color: bool) -> Self {
        self.color = color;
        self
    }

    pub fn config(&self) -> &RiggingConfig {
        &self.config
    }

    pub fn workspace_root(&self) -> &PathBuf {
        &self.workspace_root
    }

    /// Plugin registry used by `run`; embedders register their backends here.
    pub fn registry(&self) -> &PluginRegistry {
        &self.registry
    }

    /// Execute a command and return its rendered output.
    pub fn execute(&self, command: &Commands) -> Result<CommandOutput, KernelError> {
        let started = Instant::now();
        let output = match command {
            Commands::Run {
                module,
                environment,
                operation,
                format,
            } => self.handle_run(module, environment.as_deref(), operation.as_deref(), *format),
            Commands::Validate { format } => self.handle_validate(*format),
            Commands::Modules { format } => self.handle_modules(*format),
        }?;
        info!(
            command = command_name(command),
            success = output.success,
            duration_ms = started.elapsed().as_millis() as u64,
            "Command finished"
        );
        Ok(output)
    }

    /// Build a kernel over the configured environments and modules.
    pub fn build_kernel(&self) -> Result<Kernel, KernelError> {
        Ok(Kernel::new(
            Arc::new(self.config.resource_repository()),
            Arc::new(self.config.module_repository()),
            self.registry.clone(),
            Arc::new(BundledCatalog::new()?),
        ))
    }

    fn handle_run(
        &self,
        module: &str,
        environment: Option<&str>,
        operation: Option<&str>,
        format: OutputFormat,
    ) -> Result<CommandOutput, KernelError> {
        let environment = environment
            .map(str::to_string)
            .or_else(|| self.config.kernel.default_environment.clone())
            .ok_or_else(|| {
                KernelError::Usage(
                    "no environment given and kernel.default_environment is not set".to_string(),
                )
            })?;
        let operation = operation.unwrap_or(&self.config.kernel.default_operation);

        let task = OperationTask::new(Arc::new(self.build_kernel()?));
        let tree = task.execute(module, &environment, operation)?;
        let report = ResultReport::from_tree(&tree, tree.root())
            .ok_or_else(|| KernelError::Initialization("result tree has no root".to_string()))?;
        let success = report.state == ExecutionState::Success;

        let text = match format {
            OutputFormat::Json => format_report_json(&report)?,
            OutputFormat::Text => format!(
                "{}\n{}",
                format_result_tree_text(&report, self.color),
                format_summary_table(&report)
            ),
        };
        Ok(CommandOutput::new(text, success))
    }

    fn handle_validate(&self, format: OutputFormat) -> Result<CommandOutput, KernelError> {
        let errors = match self.config.validate() {
            Ok(()) => Vec::new(),
            Err(errors) => errors,
        };
        let warnings = self.validation_warnings();
        let success = errors.is_empty();

        let text = match format {
            OutputFormat::Json => {
                let value = serde_json::json!({
                    "valid": success,
                    "errors": errors.iter().map(ValidationError::to_string).collect::<Vec<_>>(),
                    "warnings": warnings,
                });
                serde_json::to_string_pretty(&value).map_err(|e| {
                    KernelError::ConfigError(format!("Failed to serialize validation: {}", e))
                })?
            }
            OutputFormat::Text => format_validation_text(&errors, &warnings),
        };
        Ok(CommandOutput::new(text, success))
    }

    fn handle_modules(&self, format: OutputFormat) -> Result<CommandOutput, KernelError> {
        let text = match format {
            OutputFormat::Json => format_modules_json(&self.config)?,
            OutputFormat::Text => format_modules_text(&self.config),
        };
        Ok(CommandOutput::new(text, true))
    }

    /// Resources whose plugin is not registered and triggers pointing at
    /// undeclared modules are reported as warnings; they only fail at run time.
    fn validation_warnings(&self) -> Vec<String> {
        let plugins = self.registry.plugin_ids();
        let mut warnings = Vec::new();
        for env in &self.config.environments {
            for resource in &env.resources {
                if !plugins.contains(&resource.plugin_id) {
                    warnings.push(format!(
                        "Resource '{}/{}': plugin '{}' is not registered",
                        env.id, resource.id, resource.plugin_id
                    ));
                }
            }
        }
        for module in &self.config.modules {
            for model in &module.models {
                for trigger in &model.triggers {
                    if !self.config.modules.iter().any(|m| m.id == trigger.module) {
                        warnings.push(format!(
                            "Module '{}': trigger targets undeclared module '{}'",
                            module.id, trigger.module
                        ));
                    }
                }
            }
        }
        warnings
    }
}

fn command_name(command: &Commands) -> &'static str {
    match command {
        Commands::Run { .. } => "run",
        Commands::Validate { .. } => "validate",
        Commands::Modules { .. } => "modules",
    }
}
