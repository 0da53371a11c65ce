use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// State of an execution result.
///
/// `Executing` is the only non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExecutionState {
    Executing,
    Success,
    Failure,
    Error,
}

impl ExecutionState {
    pub fn as_str(self) -> &'static str {
        match self {
            ExecutionState::Executing => "EXECUTING",
            ExecutionState::Success => "SUCCESS",
            ExecutionState::Failure => "FAILURE",
            ExecutionState::Error => "ERROR",
        }
    }

    pub fn is_terminal(self) -> bool {
        !matches!(self, ExecutionState::Executing)
    }

    /// Severity rank used when rolling child states up into a parent.
    pub(crate) fn severity(self) -> u8 {
        match self {
            ExecutionState::Success => 0,
            ExecutionState::Failure => 1,
            ExecutionState::Error | ExecutionState::Executing => 2,
        }
    }
}

impl fmt::Display for ExecutionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExecutionState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "EXECUTING" => Ok(ExecutionState::Executing),
            "SUCCESS" => Ok(ExecutionState::Success),
            "FAILURE" => Ok(ExecutionState::Failure),
            "ERROR" => Ok(ExecutionState::Error),
            other => Err(format!("Unknown execution state: {}", other)),
        }
    }
}
