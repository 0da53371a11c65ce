//! Error types for the rigging execution kernel.
//!
//! Three severities are kept apart on purpose of the type system:
//! [`KernelError`] is returned to the caller (usage, initialization and hard
//! infrastructure faults), [`PluginFault`] is raised by backend operations and
//! always channeled into the result tree, and [`ResultError`] reports misuse of
//! the result tree itself.

use crate::execution::{ExecutionState, ResultId};
use std::backtrace::Backtrace;
use std::error::Error as StdError;
use std::fmt::Write as _;
use thiserror::Error;

/// Boxed error used as the source of a plugin fault.
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// Result tree errors
#[derive(Debug, Error)]
pub enum ResultError {
    #[error("Result {id} is already completed with state {state}")]
    AlreadyCompleted { id: ResultId, state: ExecutionState },

    #[error("Result {0} does not belong to this tree")]
    UnknownResult(ResultId),

    #[error("Result {id} is outside the scope of result {scope}")]
    OutOfScope { id: ResultId, scope: ResultId },
}

/// Kernel errors returned to the caller of an invocation
#[derive(Debug, Error)]
pub enum KernelError {
    #[error("Usage error: {0}")]
    Usage(String),

    #[error("Initialization failed: {0}")]
    Initialization(String),

    #[error("Environment not found: {0}")]
    EnvironmentNotFound(String),

    #[error("Resource not found: {resource} (environment: {environment})")]
    ResourceNotFound {
        environment: String,
        resource: String,
    },

    #[error("Module not found: {0}")]
    ModuleNotFound(String),

    #[error("Invalid directive '{directive}': {reason}")]
    InvalidDirective { directive: String, reason: String },

    #[error("Result tree error: {0}")]
    Result(#[from] ResultError),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl KernelError {
    /// True for faults which mean the requested work could not be attempted.
    pub fn is_hard_fault(&self) -> bool {
        matches!(
            self,
            KernelError::EnvironmentNotFound(_)
                | KernelError::ResourceNotFound { .. }
                | KernelError::ModuleNotFound(_)
                | KernelError::InvalidDirective { .. }
        )
    }
}

impl From<config::ConfigError> for KernelError {
    fn from(err: config::ConfigError) -> Self {
        KernelError::ConfigError(err.to_string())
    }
}

impl From<toml::de::Error> for KernelError {
    fn from(err: toml::de::Error) -> Self {
        KernelError::ConfigError(err.to_string())
    }
}

/// Closed taxonomy of faults a backend operation can raise.
///
/// The category decides the message template used when the fault is channeled
/// into the result tree.
#[derive(Debug, Error)]
pub enum PluginFault {
    /// The plugin declared that its execution failed.
    #[error("{message}")]
    ExecutionFailed {
        message: String,
        #[source]
        source: Option<BoxError>,
        trace: FaultTrace,
    },

    /// A session to the target resource could not be established.
    #[error("{message}")]
    SessionConnect {
        message: String,
        #[source]
        source: Option<BoxError>,
        trace: FaultTrace,
    },

    /// The session to the target resource could not be closed.
    #[error("{message}")]
    SessionDisconnect {
        message: String,
        #[source]
        source: Option<BoxError>,
        trace: FaultTrace,
    },

    /// Anything else, including panics raised from backend code.
    #[error("{message}")]
    Unchecked {
        message: String,
        #[source]
        source: Option<BoxError>,
        trace: FaultTrace,
    },
}

/// Backtrace captured when a [`PluginFault`] is raised.
#[derive(Debug)]
pub struct FaultTrace(Backtrace);

impl FaultTrace {
    fn capture() -> Self {
        FaultTrace(Backtrace::force_capture())
    }
}

/// Discriminant of [`PluginFault`], used for logging and message lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultCategory {
    ExecutionFailed,
    SessionConnect,
    SessionDisconnect,
    Unchecked,
}

impl FaultCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            FaultCategory::ExecutionFailed => "execution_failed",
            FaultCategory::SessionConnect => "session_connect",
            FaultCategory::SessionDisconnect => "session_disconnect",
            FaultCategory::Unchecked => "unchecked",
        }
    }
}

impl PluginFault {
    pub fn execution_failed(message: impl Into<String>) -> Self {
        PluginFault::ExecutionFailed {
            message: message.into(),
            source: None,
            trace: FaultTrace::capture(),
        }
    }

    pub fn session_connect(message: impl Into<String>) -> Self {
        PluginFault::SessionConnect {
            message: message.into(),
            source: None,
            trace: FaultTrace::capture(),
        }
    }

    pub fn session_disconnect(message: impl Into<String>) -> Self {
        PluginFault::SessionDisconnect {
            message: message.into(),
            source: None,
            trace: FaultTrace::capture(),
        }
    }

    pub fn unchecked(message: impl Into<String>) -> Self {
        PluginFault::Unchecked {
            message: message.into(),
            source: None,
            trace: FaultTrace::capture(),
        }
    }

    /// Attach the underlying cause.
    pub fn with_source(mut self, cause: impl Into<BoxError>) -> Self {
        match &mut self {
            PluginFault::ExecutionFailed { source, .. }
            | PluginFault::SessionConnect { source, .. }
            | PluginFault::SessionDisconnect { source, .. }
            | PluginFault::Unchecked { source, .. } => *source = Some(cause.into()),
        }
        self
    }

    /// Replace the trace captured at construction, e.g. with the one taken
    /// where a panic was raised.
    pub fn with_trace(mut self, backtrace: Backtrace) -> Self {
        match &mut self {
            PluginFault::ExecutionFailed { trace, .. }
            | PluginFault::SessionConnect { trace, .. }
            | PluginFault::SessionDisconnect { trace, .. }
            | PluginFault::Unchecked { trace, .. } => *trace = FaultTrace(backtrace),
        }
        self
    }

    /// Backtrace of the place the fault was raised.
    pub fn backtrace(&self) -> &Backtrace {
        match self {
            PluginFault::ExecutionFailed { trace, .. }
            | PluginFault::SessionConnect { trace, .. }
            | PluginFault::SessionDisconnect { trace, .. }
            | PluginFault::Unchecked { trace, .. } => &trace.0,
        }
    }

    pub fn category(&self) -> FaultCategory {
        match self {
            PluginFault::ExecutionFailed { .. } => FaultCategory::ExecutionFailed,
            PluginFault::SessionConnect { .. } => FaultCategory::SessionConnect,
            PluginFault::SessionDisconnect { .. } => FaultCategory::SessionDisconnect,
            PluginFault::Unchecked { .. } => FaultCategory::Unchecked,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            PluginFault::ExecutionFailed { message, .. }
            | PluginFault::SessionConnect { message, .. }
            | PluginFault::SessionDisconnect { message, .. }
            | PluginFault::Unchecked { message, .. } => message,
        }
    }
}

impl From<ResultError> for PluginFault {
    fn from(err: ResultError) -> Self {
        PluginFault::unchecked(err.to_string()).with_source(err)
    }
}

/// Render an error, its cause chain and a backtrace as trace text.
///
/// This is the text stored under the stack-trace key of an ERROR result.
/// Plugin faults carry the backtrace of the place they were raised; for any
/// other error the current backtrace is captured.
pub fn render_trace(err: &(dyn StdError + 'static)) -> String {
    let mut out = err.to_string();
    let mut cause = err.source();
    while let Some(inner) = cause {
        let _ = write!(out, "\nCaused by: {}", inner);
        cause = inner.source();
    }
    match err.downcast_ref::<PluginFault>() {
        Some(fault) => {
            let _ = write!(out, "\nstack backtrace:\n{}", fault.backtrace());
        }
        None => {
            let _ = write!(out, "\nstack backtrace:\n{}", Backtrace::force_capture());
        }
    }
    out
}
