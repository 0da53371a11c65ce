//! Trigger matching and invocation.
//!
//! After an aggregated model has completed, each of its triggers whose
//! operation directive matches the invoked operation and whose result
//! directive matches the model's final state gets a child under the scoping
//! result and drives a nested invocation of the kernel there.

use crate::directive::Directive;
use crate::error::{KernelError, ResultError};
use crate::execution::{
    ExecutionInfo, ExecutionState, ResultId, ResultTree, MSG_TRIGGER_RESOLUTION,
};
use crate::kernel::{InvocationContext, Kernel};
use crate::messages::MessageCatalog;
use crate::model::{AggregatedModel, Trigger};
use tracing::{debug, info, warn};

/// Whether `trigger` fires for `operation` having left its model in `state`.
pub fn is_match(trigger: &Trigger, operation: &str, state: ExecutionState) -> Result<bool, KernelError> {
    let on_operation = Directive::parse_optional(trigger.on_target_operation.as_deref())?;
    if !on_operation.matches(operation) {
        return Ok(false);
    }
    let on_result = Directive::parse_optional(trigger.on_result.as_deref())?;
    Ok(on_result.matches(state.as_str()))
}

/// Description of the child result created for a fired trigger.
pub fn describe(trigger: &Trigger, info: &ExecutionInfo, catalog: &dyn MessageCatalog) -> String {
    match trigger.name.as_deref().map(str::trim).filter(|n| !n.is_empty()) {
        Some(name) => catalog.message("trigger.named_info", &[&name]),
        None => catalog.message(
            "trigger.unnamed_info",
            &[
                &trigger.module,
                &trigger.environment.as_deref().unwrap_or(info.environment()),
                &trigger.operation.as_deref().unwrap_or(info.operation()),
            ],
        ),
    }
}

/// Drives the triggers of one aggregated model.
pub struct TriggerInvoker<'k> {
    kernel: &'k Kernel,
}

impl<'k> TriggerInvoker<'k> {
    pub fn new(kernel: &'k Kernel) -> Self {
        Self { kernel }
    }

    /// Evaluate and run the triggers of `model`, whose result is
    /// `model_result`. Children are added under the scope of `info`.
    ///
    /// Returns the number of triggers fired. Hard faults of a triggered run
    /// complete its trigger result as ERROR; anything else is returned.
    pub fn invoke(
        &self,
        model: &AggregatedModel,
        model_result: ResultId,
        info: &ExecutionInfo,
        tree: &mut ResultTree,
    ) -> Result<usize, KernelError> {
        let catalog = self.kernel.catalog();
        let scope = info.result();

        if model.triggers.is_empty() {
            tree.add_message(scope, MSG_TRIGGER_RESOLUTION, catalog.message("trigger.none_defined", &[]))?;
            return Ok(0);
        }

        let state = tree
            .state(model_result)
            .ok_or(ResultError::UnknownResult(model_result))?;

        let mut fired = 0usize;
        for trigger in &model.triggers {
            if !is_match(trigger, info.operation(), state)? {
                debug!(
                    trigger = ?trigger.name,
                    module = %trigger.module,
                    state = %state,
                    operation = info.operation(),
                    "Trigger does not match"
                );
                continue;
            }
            if !tree.policy().continue_execution() {
                debug!(module = %trigger.module, "Trigger skipped by continuation policy");
                continue;
            }

            let child = tree.add_child(scope, describe(trigger, info, catalog))?;
            fired += 1;
            info!(
                trigger = ?trigger.name,
                module = %trigger.module,
                result = %child,
                "Invoking trigger"
            );

            match self.run(trigger, info, tree, child) {
                Ok(()) => {}
                Err(err) if err.is_hard_fault() => {
                    warn!(module = %trigger.module, error = %err, "Trigger execution failed");
                    if tree.state(child).map_or(false, |s| !s.is_terminal()) {
                        tree.complete_as_error(child, catalog, "trigger.error", &[&err], &err)?;
                    }
                    tree.seal(child, catalog)?;
                }
                Err(err) => return Err(err),
            }
        }

        if fired == 0 {
            tree.add_message(
                scope,
                MSG_TRIGGER_RESOLUTION,
                catalog.message("trigger.none_executed", &[&state, &info.operation()]),
            )?;
        }
        Ok(fired)
    }

    fn run(
        &self,
        trigger: &Trigger,
        info: &ExecutionInfo,
        tree: &mut ResultTree,
        child: ResultId,
    ) -> Result<(), KernelError> {
        let module = self.kernel.modules().resolve_module(&trigger.module)?;
        let nested = info.derive(
            module.info.clone(),
            trigger.environment.as_deref(),
            trigger.operation.as_deref(),
            child,
        );
        self.kernel
            .invoke(&InvocationContext::new(module, nested), tree)
    }
}
