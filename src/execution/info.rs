use crate::execution::ResultId;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Identity and location of a module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleInfo {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
}

impl ModuleInfo {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            file: None,
        }
    }

    pub fn with_file(mut self, file: impl Into<PathBuf>) -> Self {
        self.file = Some(file.into());
        self
    }

    /// Display form of the module file, "n/a" when the module is not file backed.
    pub fn file_display(&self) -> String {
        self.file
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "n/a".to_string())
    }
}

/// Immutable description of one invocation: which module runs which
/// operation in which environment, and under which result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionInfo {
    module: ModuleInfo,
    environment: String,
    operation: String,
    result: ResultId,
}

impl ExecutionInfo {
    pub fn new(
        module: ModuleInfo,
        environment: impl Into<String>,
        operation: impl Into<String>,
        result: ResultId,
    ) -> Self {
        Self {
            module,
            environment: environment.into(),
            operation: operation.into(),
            result,
        }
    }

    pub fn module(&self) -> &ModuleInfo {
        &self.module
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }

    pub fn operation(&self) -> &str {
        &self.operation
    }

    /// Scoping result of the invocation.
    pub fn result(&self) -> ResultId {
        self.result
    }

    /// Info for a nested invocation. Everything is swapped, the original is
    /// left untouched.
    pub fn derive(
        &self,
        module: ModuleInfo,
        environment: Option<&str>,
        operation: Option<&str>,
        result: ResultId,
    ) -> Self {
        Self {
            module,
            environment: environment.unwrap_or(&self.environment).to_string(),
            operation: operation.unwrap_or(&self.operation).to_string(),
            result,
        }
    }
}
