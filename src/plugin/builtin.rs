//! Built-in plugins.
//!
//! - `noop`: completes every operation successfully
//! - `composite-execution`: invokes the modules listed in the model content

use crate::error::PluginFault;
use crate::execution::ResultSink;
use crate::plugin::{Operation, OperationContext, PluginRegistry, WILDCARD_OPERATION};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info};

pub const NOOP_PLUGIN: &str = "noop";
pub const COMPOSITE_PLUGIN: &str = "composite-execution";

/// Register the built-in plugins' wildcard operations.
pub fn register_builtins(registry: &PluginRegistry) {
    registry.register(NOOP_PLUGIN, WILDCARD_OPERATION, Arc::new(NoopOperation));
    registry.register(
        COMPOSITE_PLUGIN,
        WILDCARD_OPERATION,
        Arc::new(CompositeExecutionOperation),
    );
}

/// Operation doing nothing but succeeding.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopOperation;

impl Operation for NoopOperation {
    fn execute(
        &self,
        ctx: &OperationContext<'_>,
        sink: &mut ResultSink<'_>,
    ) -> Result<(), PluginFault> {
        sink.complete_as_successful(
            ctx.catalog,
            "noop.succeed",
            &[&ctx.operation(), &ctx.resource.id],
        )?;
        Ok(())
    }
}

/// Model content of the composite-execution plugin.
#[derive(Debug, Clone, Deserialize)]
pub struct CompositeContent {
    pub modules: Vec<String>,
}

impl CompositeContent {
    pub fn from_value(content: &serde_json::Value) -> Result<Self, PluginFault> {
        serde_json::from_value(content.clone()).map_err(|e| {
            PluginFault::execution_failed("Composite content must list modules: {\"modules\": [...]}")
                .with_source(e)
        })
    }
}

/// Operation invoking a list of modules with the current environment and
/// operation, each under its own child result.
///
/// Nested modules share the tree's continuation policy; their own
/// continue-on-failure directive never overrides the one already in force.
#[derive(Debug, Default, Clone, Copy)]
pub struct CompositeExecutionOperation;

impl Operation for CompositeExecutionOperation {
    fn execute(
        &self,
        ctx: &OperationContext<'_>,
        sink: &mut ResultSink<'_>,
    ) -> Result<(), PluginFault> {
        let content = CompositeContent::from_value(&ctx.model.content)?;
        let environment = ctx.info.environment();
        let operation = ctx.operation();

        for module_id in &content.modules {
            if !sink.continue_execution() {
                debug!(module = %module_id, "Composite module skipped by continuation policy");
                continue;
            }

            let child = sink.add_child(ctx.catalog.message("composite.info", &[module_id]))?;
            info!(module = %module_id, environment, operation, "Invoking composite module");

            let outcome =
                sink.invoke_nested(ctx.invoker(), module_id, environment, operation, child);
            match outcome {
                Ok(()) => {}
                Err(err) if err.is_hard_fault() => {
                    let mut nested = sink.child(child)?;
                    if nested.is_executing() {
                        nested.complete_as_error(ctx.catalog, "composite.error", &[&err], &err)?;
                    }
                    nested.seal(ctx.catalog)?;
                }
                Err(err) => {
                    return Err(PluginFault::unchecked(err.to_string()).with_source(err));
                }
            }
        }

        sink.complete_as_computed(
            ctx.catalog,
            "composite.succeed",
            &[&content.modules.len()],
            "composite.failed",
            &[],
        )?;
        Ok(())
    }
}
