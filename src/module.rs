//! Module repository: resolves module ids into their declared model.

use crate::error::KernelError;
use crate::execution::ModuleInfo;
use crate::model::ModuleModel;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::Arc;

/// A resolved module: identity plus declared model.
#[derive(Debug, Clone)]
pub struct ModuleHandle {
    pub info: ModuleInfo,
    pub model: Arc<ModuleModel>,
}

impl ModuleHandle {
    pub fn new(info: ModuleInfo, model: ModuleModel) -> Self {
        Self {
            info,
            model: Arc::new(model),
        }
    }

    pub fn id(&self) -> &str {
        &self.info.id
    }
}

/// Module lookup used by the top-level runner, triggers and composites.
pub trait ModuleRepository: Send + Sync {
    fn resolve_module(&self, id: &str) -> Result<ModuleHandle, KernelError>;

    /// Known module ids, sorted.
    fn module_ids(&self) -> Vec<String>;
}

/// In-memory module repository
#[derive(Debug, Default)]
pub struct InMemoryModuleRepository {
    modules: RwLock<BTreeMap<String, ModuleHandle>>,
}

impl InMemoryModuleRepository {
    /// Create an empty repository
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a module, replacing any module with the same id
    pub fn register(&self, handle: ModuleHandle) {
        self.modules.write().insert(handle.info.id.clone(), handle);
    }

    pub fn len(&self) -> usize {
        self.modules.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.read().is_empty()
    }
}

impl ModuleRepository for InMemoryModuleRepository {
    fn resolve_module(&self, id: &str) -> Result<ModuleHandle, KernelError> {
        self.modules
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| KernelError::ModuleNotFound(id.to_string()))
    }

    fn module_ids(&self) -> Vec<String> {
        self.modules.read().keys().cloned().collect()
    }
}
