//! Execution kernel: runs a module's aggregated models against their target
//! resources and records the outcome in a result tree.
//!
//! For a scoping result `S`, each aggregated model (gated by the continuation
//! policy and its operation restriction) gets a child `M` of `S`, and each
//! resolved target a child of `M`. Once `M` is complete its triggers are
//! evaluated and may add children to `S`. Finally `S` is completed from its
//! children.

use crate::error::KernelError;
use crate::execution::{
    ExecutionInfo, ResultId, ResultTree, MSG_CONTINUATION, MSG_ENVIRONMENT, MSG_MODULE,
    MSG_MODULE_FILE, MSG_OPERATION, MSG_OPERATION_RESOLUTION, MSG_RESOURCE_RESOLUTION,
};
use crate::messages::MessageCatalog;
use crate::model::AggregatedModel;
use crate::module::{ModuleHandle, ModuleRepository};
use crate::plugin::{channel, ModuleInvoker, OperationContext, OperationRegistry};
use crate::resource::{Resource, ResourceRepository, TargetDirective};
use crate::trigger::TriggerInvoker;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Inputs of one invocation. Both entries are required.
#[derive(Debug, Clone, Default)]
pub struct InvocationContext {
    module: Option<ModuleHandle>,
    info: Option<ExecutionInfo>,
}

impl InvocationContext {
    pub fn new(module: ModuleHandle, info: ExecutionInfo) -> Self {
        Self {
            module: Some(module),
            info: Some(info),
        }
    }

    /// Context without entries, to be filled with the `with_*` methods.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_module(mut self, module: ModuleHandle) -> Self {
        self.module = Some(module);
        self
    }

    pub fn with_info(mut self, info: ExecutionInfo) -> Self {
        self.info = Some(info);
        self
    }

    pub fn module(&self) -> Option<&ModuleHandle> {
        self.module.as_ref()
    }

    pub fn info(&self) -> Option<&ExecutionInfo> {
        self.info.as_ref()
    }
}

/// The execution kernel. Collaborators are injected at construction.
pub struct Kernel {
    resources: Arc<dyn ResourceRepository>,
    modules: Arc<dyn ModuleRepository>,
    operations: Arc<dyn OperationRegistry>,
    catalog: Arc<dyn MessageCatalog>,
}

impl Kernel {
    pub fn new(
        resources: Arc<dyn ResourceRepository>,
        modules: Arc<dyn ModuleRepository>,
        operations: Arc<dyn OperationRegistry>,
        catalog: Arc<dyn MessageCatalog>,
    ) -> Self {
        Self {
            resources,
            modules,
            operations,
            catalog,
        }
    }

    pub fn catalog(&self) -> &dyn MessageCatalog {
        self.catalog.as_ref()
    }

    pub fn modules(&self) -> &dyn ModuleRepository {
        self.modules.as_ref()
    }

    pub fn resources(&self) -> &dyn ResourceRepository {
        self.resources.as_ref()
    }

    pub fn operations(&self) -> &dyn OperationRegistry {
        self.operations.as_ref()
    }

    /// Invoke the module of `ctx` under its scoping result, which is completed
    /// from its children on return.
    ///
    /// Missing context entries are initialization errors; a scoping result
    /// foreign to `tree` or already completed is a usage error. Hard faults
    /// (unknown environment, resource or module, invalid directive) are
    /// returned without completing anything.
    #[instrument(
        skip_all,
        fields(
            module = ctx.module().map(|m| m.id()),
            operation = ctx.info().map(|i| i.operation())
        )
    )]
    pub fn invoke(&self, ctx: &InvocationContext, tree: &mut ResultTree) -> Result<(), KernelError> {
        let module = ctx
            .module()
            .ok_or_else(|| KernelError::Initialization("invocation context has no module".to_string()))?;
        let info = ctx.info().ok_or_else(|| {
            KernelError::Initialization("invocation context has no execution info".to_string())
        })?;

        let scope = info.result();
        match tree.get(scope) {
            None => {
                return Err(KernelError::Usage(format!(
                    "result {} does not belong to the result tree",
                    scope
                )))
            }
            Some(result) if !result.is_executing() => {
                return Err(KernelError::Usage(format!(
                    "result {} is already completed with state {}",
                    scope,
                    result.state()
                )))
            }
            Some(_) => {}
        }

        self.record_metadata(module, info, tree)?;

        tree.policy_mut()
            .apply_directive(module.model.continue_on_failure);
        let continue_on_failure = tree.policy().is_continue_on_failure();
        tree.add_message(
            scope,
            MSG_CONTINUATION,
            self.catalog
                .message("kernel.continuation_info", &[&continue_on_failure]),
        )?;

        let triggers = TriggerInvoker::new(self);
        for model in &module.model.models {
            if !tree.policy().continue_execution() {
                debug!(module = module.id(), "Model skipped by continuation policy");
                continue;
            }

            let label = model_label(model, self.catalog());
            if !model.runs_for(info.operation())? {
                debug!(model = %label, "Model restricted to other operations");
                tree.add_message(
                    scope,
                    MSG_OPERATION_RESOLUTION,
                    self.catalog.message(
                        "kernel.operation_restricted",
                        &[
                            &label,
                            &model.target_operation.as_deref().unwrap_or_default(),
                            &info.operation(),
                        ],
                    ),
                )?;
                continue;
            }
            if let Some(restriction) = model.target_operation.as_deref().filter(|r| !r.trim().is_empty()) {
                debug!(model = %label, restriction, "Model restricted to this operation");
                tree.add_message(
                    scope,
                    MSG_OPERATION_RESOLUTION,
                    self.catalog.message(
                        "kernel.operation_unrestricted",
                        &[&label, &restriction, &info.operation()],
                    ),
                )?;
            }

            let model_result = tree.add_child(scope, self.catalog.message("kernel.model_info", &[&label]))?;
            self.execute_model(model, info, tree, model_result)?;
            triggers.invoke(model, model_result, info, tree)?;
        }

        self.complete_from_children(
            tree,
            scope,
            "kernel.succeed",
            &[&info.operation(), &module.id()],
            "kernel.failed",
        )?;
        info!(
            result = %scope,
            state = ?tree.state(scope),
            "Module invocation completed"
        );
        Ok(())
    }

    fn record_metadata(
        &self,
        module: &ModuleHandle,
        info: &ExecutionInfo,
        tree: &mut ResultTree,
    ) -> Result<(), KernelError> {
        let scope = info.result();
        tree.add_or_replace_message(scope, MSG_MODULE, module.id())?;
        tree.add_or_replace_message(scope, MSG_MODULE_FILE, module.info.file_display())?;
        tree.add_or_replace_message(scope, MSG_ENVIRONMENT, info.environment())?;
        tree.add_or_replace_message(scope, MSG_OPERATION, info.operation())?;
        Ok(())
    }

    fn execute_model(
        &self,
        model: &AggregatedModel,
        info: &ExecutionInfo,
        tree: &mut ResultTree,
        model_result: ResultId,
    ) -> Result<(), KernelError> {
        let directive = TargetDirective::parse(&model.target_resource)?;
        if directive.is_none() {
            tree.complete_as_successful(model_result, self.catalog(), "kernel.no_target", &[])?;
            return Ok(());
        }

        let targets = directive.resolve(self.resources(), info.environment())?;
        debug!(directive = %directive, targets = ?targets, "Target resources resolved");
        tree.add_message(
            model_result,
            MSG_RESOURCE_RESOLUTION,
            self.catalog.message(
                "kernel.target_resolution",
                &[&directive, &format!("[{}]", targets.join(", "))],
            ),
        )?;

        for target_id in &targets {
            if !tree.policy().continue_execution() {
                debug!(resource = %target_id, "Target skipped by continuation policy");
                continue;
            }

            let environment = self.resources.resolve_environment(info.environment())?;
            let resource = self.resources.resolve_resource(&environment.id, target_id)?;
            let target = tree.add_child(
                model_result,
                self.catalog.message("kernel.target_info", &[target_id]),
            )?;
            self.execute_target(&resource, model, info, tree, target)?;
        }

        self.complete_from_children(
            tree,
            model_result,
            "kernel.model_succeed",
            &[&targets.len()],
            "kernel.model_failed",
        )
    }

    /// Complete `id` from its children. A result completed out of turn keeps
    /// its state; its subtree is sealed instead.
    fn complete_from_children(
        &self,
        tree: &mut ResultTree,
        id: ResultId,
        success_key: &str,
        success_args: &[&dyn std::fmt::Display],
        failure_key: &str,
    ) -> Result<(), KernelError> {
        if let Some(state) = tree.state(id).filter(|s| s.is_terminal()) {
            warn!(result = %id, state = %state, "Result already completed, sealing its subtree");
            tree.seal(id, self.catalog())?;
        } else {
            tree.complete_as_computed(id, self.catalog(), success_key, success_args, failure_key, &[])?;
        }
        Ok(())
    }

    fn execute_target(
        &self,
        resource: &Resource,
        model: &AggregatedModel,
        info: &ExecutionInfo,
        tree: &mut ResultTree,
        target: ResultId,
    ) -> Result<(), KernelError> {
        let Some(operation) = self
            .operations
            .get_operation(&resource.plugin_id, info.operation())
        else {
            info!(
                plugin = %resource.plugin_id,
                resource = %resource.id,
                operation = info.operation(),
                "No operation found"
            );
            tree.complete_as_error_without_trace(
                target,
                self.catalog(),
                "channel.no_operation",
                &[&info.operation(), &resource.plugin_id, &resource.id],
            )?;
            return Ok(());
        };

        let ctx = OperationContext::new(resource, model, info, self.catalog(), self);
        channel::execute(operation.as_ref(), &ctx, tree, target)?;
        Ok(())
    }
}

impl ModuleInvoker for Kernel {
    fn invoke_module(
        &self,
        module_id: &str,
        environment: &str,
        operation: &str,
        tree: &mut ResultTree,
        scope: ResultId,
    ) -> Result<(), KernelError> {
        let module = self.modules.resolve_module(module_id)?;
        let info = ExecutionInfo::new(module.info.clone(), environment, operation, scope);
        self.invoke(&InvocationContext::new(module, info), tree)
    }
}

fn model_label(model: &AggregatedModel, catalog: &dyn MessageCatalog) -> String {
    if let Some(description) = model.description.as_deref().filter(|d| !d.trim().is_empty()) {
        return description.to_string();
    }
    let target = model.target_resource.trim();
    if target.is_empty() {
        catalog.message("kernel.no_description", &[])
    } else {
        target.to_string()
    }
}
