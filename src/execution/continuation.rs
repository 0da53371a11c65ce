//! Continuation policy: decides whether further work is attempted after a failure.
//!
//! One policy is owned by each result tree. The first continue-on-failure
//! directive applied to it wins; later directives from triggered or composite
//! modules are recorded in the log but never change the policy.

use crate::execution::ResultId;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::debug;

/// Cooperative cancellation handle, cloneable across threads.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Default)]
pub struct ContinuationPolicy {
    directive: Option<bool>,
    failed_result: Option<ResultId>,
    cancellation: CancellationToken,
}

impl ContinuationPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enable_continue_on_failure(&mut self) {
        self.apply_directive(true);
    }

    pub fn disable_continue_on_failure(&mut self) {
        self.apply_directive(false);
    }

    /// Apply a module's directive. Only the first directive is honoured.
    pub fn apply_directive(&mut self, continue_on_failure: bool) {
        match self.directive {
            None => self.directive = Some(continue_on_failure),
            Some(current) if current != continue_on_failure => {
                debug!(
                    current,
                    requested = continue_on_failure,
                    "Continue-on-failure directive already set, ignoring request"
                );
            }
            Some(_) => {}
        }
    }

    pub fn is_continue_on_failure(&self) -> bool {
        self.directive.unwrap_or(true)
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    pub fn cancel(&self) {
        self.cancellation.cancel();
    }

    /// Handle which cancels this policy from another thread.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation.clone()
    }

    /// Record that a result in the tree completed unsuccessfully. The first
    /// failed result is kept for diagnostics.
    pub fn set_failed(&mut self, result: ResultId) {
        if self.failed_result.is_none() {
            self.failed_result = Some(result);
        }
    }

    pub fn failed_result(&self) -> Option<ResultId> {
        self.failed_result
    }

    pub fn continue_execution(&self) -> bool {
        if self.is_cancelled() {
            return false;
        }
        if self.is_continue_on_failure() {
            return true;
        }
        self.failed_result.is_none()
    }
}
