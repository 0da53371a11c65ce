//! Top-level runner: one operation on one module in one environment.

use crate::error::KernelError;
use crate::execution::{
    ContinuationPolicy, ExecutionInfo, ResultTree, MSG_ENVIRONMENT, MSG_MODULE, MSG_OPERATION,
};
use crate::kernel::{InvocationContext, Kernel};
use std::sync::Arc;
use tracing::{error, info};

/// Runs a module operation and returns the fully labelled result tree.
#[derive(Clone)]
pub struct OperationTask {
    kernel: Arc<Kernel>,
}

impl OperationTask {
    pub fn new(kernel: Arc<Kernel>) -> Self {
        Self { kernel }
    }

    pub fn kernel(&self) -> &Kernel {
        &self.kernel
    }

    /// Execute `operation` on `module_id` in `environment` with a fresh
    /// continuation policy.
    pub fn execute(
        &self,
        module_id: &str,
        environment: &str,
        operation: &str,
    ) -> Result<ResultTree, KernelError> {
        self.execute_with_policy(module_id, environment, operation, ContinuationPolicy::new())
    }

    /// Execute with a caller supplied policy, e.g. one whose cancellation
    /// token was handed to another thread.
    ///
    /// Hard faults complete the root as ERROR and the tree is sealed, so no
    /// result is left executing. Usage and initialization errors are returned.
    pub fn execute_with_policy(
        &self,
        module_id: &str,
        environment: &str,
        operation: &str,
        policy: ContinuationPolicy,
    ) -> Result<ResultTree, KernelError> {
        let description = format!(
            "Execute operation [{}] on module [{}] in environment [{}]",
            operation, module_id, environment
        );
        let mut tree = ResultTree::with_policy(description, policy);
        let root = tree.root();
        tree.add_message(root, MSG_MODULE, module_id)?;
        tree.add_message(root, MSG_ENVIRONMENT, environment)?;
        tree.add_message(root, MSG_OPERATION, operation)?;

        info!(module = module_id, environment, operation, "Starting operation");

        let outcome = self
            .kernel
            .modules()
            .resolve_module(module_id)
            .and_then(|module| {
                let info = ExecutionInfo::new(module.info.clone(), environment, operation, root);
                self.kernel
                    .invoke(&InvocationContext::new(module, info), &mut tree)
            });

        match outcome {
            Ok(()) => {}
            Err(err) if err.is_hard_fault() => {
                error!(module = module_id, error = %err, "Operation aborted");
                let catalog = self.kernel.catalog();
                if tree.state(root).map_or(false, |s| !s.is_terminal()) {
                    tree.complete_as_error(root, catalog, "task.error", &[&err], &err)?;
                }
                tree.seal(root, catalog)?;
            }
            Err(err) => return Err(err),
        }

        info!(
            module = module_id,
            state = ?tree.state(root),
            "Operation completed"
        );
        Ok(tree)
    }
}
