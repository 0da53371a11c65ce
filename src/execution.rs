//! Execution result model: the result tree, its states, the shared
//! continuation policy, invocation info and serializable reports.

pub mod continuation;
pub mod info;
pub mod report;
pub mod result;
pub mod state;

pub use continuation::{CancellationToken, ContinuationPolicy};
pub use info::{ExecutionInfo, ModuleInfo};
pub use report::ResultReport;
pub use result::{ExecutionResult, ResultId, ResultSink, ResultTree};
pub use state::ExecutionState;

// Well-known message keys stored on results.
pub const MSG_OPERATION: &str = "operation";
pub const MSG_ENVIRONMENT: &str = "environment";
pub const MSG_MODULE: &str = "module";
pub const MSG_MODULE_FILE: &str = "module-file";
pub const MSG_STACKTRACE: &str = "stack-trace";
pub const MSG_ERROR_MESSAGE: &str = "error-message";
pub const MSG_MESSAGE: &str = "message";
pub const MSG_COMPOSITE: &str = "composite-execution-result";
pub const MSG_CONTINUATION: &str = "continuation-policy";
pub const MSG_RESOURCE_RESOLUTION: &str = "resource-resolution";
pub const MSG_TRIGGER_RESOLUTION: &str = "trigger-resolution";
pub const MSG_OPERATION_RESOLUTION: &str = "operation-resolution";
