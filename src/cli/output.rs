//! CLI output: command output and error mapping to the CLI surface.

use crate::error::KernelError;

/// Rendered output of a command and whether it succeeded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub text: String,
    pub success: bool,
}

impl CommandOutput {
    pub fn new(text: impl Into<String>, success: bool) -> Self {
        Self {
            text: text.into(),
            success,
        }
    }

    /// Process exit code: 0 on success, 1 otherwise.
    pub fn exit_code(&self) -> i32 {
        if self.success {
            0
        } else {
            1
        }
    }
}

/// Map kernel errors to a string for CLI output.
pub fn map_error(e: &KernelError) -> String {
    match e {
        KernelError::ConfigError(msg) => format!("Configuration error: {}", msg),
        KernelError::Usage(msg) => format!("Usage error: {}", msg),
        other => other.to_string(),
    }
}
