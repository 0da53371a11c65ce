//! Plugin boundary: operations, the registry resolving them, and the channel
//! converting operation faults into results.

pub mod builtin;
pub mod channel;

use crate::error::{KernelError, PluginFault};
use crate::execution::{ExecutionInfo, ResultId, ResultSink, ResultTree};
use crate::messages::MessageCatalog;
use crate::model::AggregatedModel;
use crate::resource::Resource;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Operation id registered to handle every operation of a plugin.
pub const WILDCARD_OPERATION: &str = "*";

/// Nested module invocation, offered to operations which drive other modules
/// through [`ResultSink::invoke_nested`].
pub trait ModuleInvoker {
    /// Resolve `module_id` and invoke it under `scope`, which the invocation
    /// completes.
    fn invoke_module(
        &self,
        module_id: &str,
        environment: &str,
        operation: &str,
        tree: &mut ResultTree,
        scope: ResultId,
    ) -> Result<(), KernelError>;
}

/// Everything an operation gets to see besides its result sink.
pub struct OperationContext<'a> {
    pub resource: &'a Resource,
    pub model: &'a AggregatedModel,
    pub info: &'a ExecutionInfo,
    pub catalog: &'a dyn MessageCatalog,
    invoker: &'a dyn ModuleInvoker,
}

impl<'a> OperationContext<'a> {
    pub fn new(
        resource: &'a Resource,
        model: &'a AggregatedModel,
        info: &'a ExecutionInfo,
        catalog: &'a dyn MessageCatalog,
        invoker: &'a dyn ModuleInvoker,
    ) -> Self {
        Self {
            resource,
            model,
            info,
            catalog,
            invoker,
        }
    }

    pub fn operation(&self) -> &str {
        self.info.operation()
    }

    pub fn invoker(&self) -> &dyn ModuleInvoker {
        self.invoker
    }
}

/// A unit of work executed against a resource.
///
/// The operation must complete `sink` before returning `Ok`. Returning a fault
/// (or panicking) completes the result as ERROR instead.
pub trait Operation: Send + Sync {
    fn execute(&self, ctx: &OperationContext<'_>, sink: &mut ResultSink<'_>)
        -> Result<(), PluginFault>;
}

struct FnOperation<F>(F);

impl<F> Operation for FnOperation<F>
where
    F: Fn(&OperationContext<'_>, &mut ResultSink<'_>) -> Result<(), PluginFault> + Send + Sync,
{
    fn execute(
        &self,
        ctx: &OperationContext<'_>,
        sink: &mut ResultSink<'_>,
    ) -> Result<(), PluginFault> {
        (self.0)(ctx, sink)
    }
}

/// Wrap a closure as an operation.
pub fn operation_fn<F>(f: F) -> Arc<dyn Operation>
where
    F: Fn(&OperationContext<'_>, &mut ResultSink<'_>) -> Result<(), PluginFault>
        + Send
        + Sync
        + 'static,
{
    Arc::new(FnOperation(f))
}

/// Resolves the operation a plugin provides for an operation id.
pub trait OperationRegistry: Send + Sync {
    fn get_operation(&self, plugin_id: &str, operation_id: &str) -> Option<Arc<dyn Operation>>;

    /// Registered plugin ids, sorted.
    fn plugin_ids(&self) -> Vec<String>;
}

/// Registry of plugins keyed by plugin id and operation id.
///
/// Lookup tries the exact operation id first, then the plugin's wildcard
/// operation.
#[derive(Default)]
pub struct PluginRegistry {
    plugins: RwLock<HashMap<String, HashMap<String, Arc<dyn Operation>>>>,
}

impl PluginRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with the built-in `noop` and `composite-execution` plugins
    pub fn with_builtins() -> Self {
        let registry = Self::new();
        builtin::register_builtins(&registry);
        registry
    }

    /// Declare a plugin, possibly without any operation
    pub fn register_plugin(&self, plugin_id: impl Into<String>) {
        self.plugins.write().entry(plugin_id.into()).or_default();
    }

    /// Register an operation for a plugin; `*` registers the wildcard operation
    pub fn register(
        &self,
        plugin_id: impl Into<String>,
        operation_id: impl Into<String>,
        operation: Arc<dyn Operation>,
    ) {
        self.plugins
            .write()
            .entry(plugin_id.into())
            .or_default()
            .insert(operation_id.into(), operation);
    }

    /// Operation ids of a plugin, sorted
    pub fn operation_ids(&self, plugin_id: &str) -> Vec<String> {
        let plugins = self.plugins.read();
        let mut ids: Vec<String> = plugins
            .get(plugin_id)
            .map(|ops| ops.keys().cloned().collect())
            .unwrap_or_default();
        ids.sort();
        ids
    }
}

impl OperationRegistry for PluginRegistry {
    fn get_operation(&self, plugin_id: &str, operation_id: &str) -> Option<Arc<dyn Operation>> {
        let plugins = self.plugins.read();
        let operations = plugins.get(plugin_id)?;
        operations
            .get(operation_id)
            .or_else(|| operations.get(WILDCARD_OPERATION))
            .cloned()
    }

    fn plugin_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.plugins.read().keys().cloned().collect();
        ids.sort();
        ids
    }
}

impl fmt::Debug for PluginRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginRegistry")
            .field("plugins", &self.plugin_ids())
            .finish()
    }
}
