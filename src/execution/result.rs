//! Execution result tree.
//!
//! Results live in an arena owned by [`ResultTree`]; parents and children are
//! referenced by [`ResultId`]. The tree also owns the continuation policy all
//! of its results share.

use crate::error::{render_trace, KernelError, ResultError};
use crate::execution::continuation::ContinuationPolicy;
use crate::execution::state::ExecutionState;
use crate::execution::{MSG_COMPOSITE, MSG_ERROR_MESSAGE, MSG_MESSAGE, MSG_STACKTRACE};
use crate::messages::MessageCatalog;
use crate::plugin::ModuleInvoker;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::error::Error as StdError;
use std::fmt::{self, Display};
use tracing::{debug, trace, warn};

/// Stable handle of a result within its tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResultId(pub(crate) usize);

impl ResultId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl Display for ResultId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A single node of the result tree.
#[derive(Debug, Clone)]
pub struct ExecutionResult {
    description: String,
    state: ExecutionState,
    messages: HashMap<String, String>,
    children: Vec<ResultId>,
    parent: Option<ResultId>,
    started_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
}

impl ExecutionResult {
    fn new(description: String, parent: Option<ResultId>) -> Self {
        Self {
            description,
            state: ExecutionState::Executing,
            messages: HashMap::new(),
            children: Vec::new(),
            parent,
            started_at: Utc::now(),
            completed_at: None,
        }
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn state(&self) -> ExecutionState {
        self.state
    }

    pub fn messages(&self) -> &HashMap<String, String> {
        &self.messages
    }

    pub fn message(&self, key: &str) -> Option<&str> {
        self.messages.get(key).map(String::as_str)
    }

    pub fn children(&self) -> &[ResultId] {
        &self.children
    }

    pub fn first_child(&self) -> Option<ResultId> {
        self.children.first().copied()
    }

    pub fn parent(&self) -> Option<ResultId> {
        self.parent
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    pub fn is_executing(&self) -> bool {
        self.state == ExecutionState::Executing
    }

    pub fn is_success(&self) -> bool {
        self.state == ExecutionState::Success
    }

    pub fn is_failure(&self) -> bool {
        self.state == ExecutionState::Failure
    }

    pub fn is_error(&self) -> bool {
        self.state == ExecutionState::Error
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    /// Milliseconds between start and completion (or now, while executing).
    pub fn elapsed_ms(&self) -> i64 {
        let end = self.completed_at.unwrap_or_else(Utc::now);
        (end - self.started_at).num_milliseconds()
    }
}

/// Arena of execution results rooted at a single node.
#[derive(Debug)]
pub struct ResultTree {
    nodes: Vec<ExecutionResult>,
    policy: ContinuationPolicy,
}

impl ResultTree {
    const ROOT: ResultId = ResultId(0);

    /// Create a tree with a root result and a fresh continuation policy.
    pub fn new(description: impl Into<String>) -> Self {
        Self::with_policy(description, ContinuationPolicy::new())
    }

    pub fn with_policy(description: impl Into<String>, policy: ContinuationPolicy) -> Self {
        Self {
            nodes: vec![ExecutionResult::new(description.into(), None)],
            policy,
        }
    }

    pub fn root(&self) -> ResultId {
        Self::ROOT
    }

    pub fn policy(&self) -> &ContinuationPolicy {
        &self.policy
    }

    pub fn policy_mut(&mut self) -> &mut ContinuationPolicy {
        &mut self.policy
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: ResultId) -> bool {
        id.0 < self.nodes.len()
    }

    pub fn get(&self, id: ResultId) -> Option<&ExecutionResult> {
        self.nodes.get(id.0)
    }

    fn node(&self, id: ResultId) -> Result<&ExecutionResult, ResultError> {
        self.nodes.get(id.0).ok_or(ResultError::UnknownResult(id))
    }

    fn node_mut(&mut self, id: ResultId) -> Result<&mut ExecutionResult, ResultError> {
        self.nodes.get_mut(id.0).ok_or(ResultError::UnknownResult(id))
    }

    /// State of a result, or `None` for a foreign id.
    pub fn state(&self, id: ResultId) -> Option<ExecutionState> {
        self.get(id).map(ExecutionResult::state)
    }

    /// Append a new executing child to `parent` and return its id.
    pub fn add_child(
        &mut self,
        parent: ResultId,
        description: impl Into<String>,
    ) -> Result<ResultId, ResultError> {
        self.node(parent)?;
        let id = ResultId(self.nodes.len());
        let description = description.into();
        trace!(parent = %parent, child = %id, description = %description, "Result added");
        self.nodes.push(ExecutionResult::new(description, Some(parent)));
        self.node_mut(parent)?.children.push(id);
        Ok(id)
    }

    pub fn children(&self, id: ResultId) -> &[ResultId] {
        self.get(id).map(ExecutionResult::children).unwrap_or(&[])
    }

    pub fn children_with_state(&self, id: ResultId, state: ExecutionState) -> Vec<ResultId> {
        self.children(id)
            .iter()
            .copied()
            .filter(|child| self.state(*child) == Some(state))
            .collect()
    }

    /// Walk parent links up to the root.
    pub fn root_of(&self, id: ResultId) -> Option<ResultId> {
        let mut current = self.get(id)?;
        let mut current_id = id;
        while let Some(parent) = current.parent {
            current_id = parent;
            current = self.get(parent)?;
        }
        Some(current_id)
    }

    /// Pre-order ids of the subtree rooted at `id`.
    pub fn subtree(&self, id: ResultId) -> Vec<ResultId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            if let Some(node) = self.get(next) {
                out.push(next);
                stack.extend(node.children.iter().rev().copied());
            }
        }
        out
    }

    /// Add a message; an existing value under the same key is extended on a
    /// new line.
    pub fn add_message(
        &mut self,
        id: ResultId,
        key: &str,
        message: impl Into<String>,
    ) -> Result<(), ResultError> {
        let message = message.into();
        let node = self.node_mut(id)?;
        match node.messages.get_mut(key) {
            Some(existing) => {
                existing.push('\n');
                existing.push_str(&message);
            }
            None => {
                node.messages.insert(key.to_string(), message);
            }
        }
        Ok(())
    }

    pub fn add_or_replace_message(
        &mut self,
        id: ResultId,
        key: &str,
        message: impl Into<String>,
    ) -> Result<(), ResultError> {
        self.node_mut(id)?
            .messages
            .insert(key.to_string(), message.into());
        Ok(())
    }

    fn ensure_executing(&self, id: ResultId) -> Result<(), ResultError> {
        let node = self.node(id)?;
        if node.is_executing() {
            Ok(())
        } else {
            Err(ResultError::AlreadyCompleted {
                id,
                state: node.state,
            })
        }
    }

    fn set_state(&mut self, id: ResultId, state: ExecutionState) -> Result<(), ResultError> {
        self.ensure_executing(id)?;
        let node = self.node_mut(id)?;
        node.state = state;
        node.completed_at = Some(Utc::now());
        debug!(result = %id, state = %state, description = %node.description, "Result completed");
        if state != ExecutionState::Success {
            self.policy.set_failed(id);
        }
        Ok(())
    }

    pub fn complete_as_successful(
        &mut self,
        id: ResultId,
        catalog: &dyn MessageCatalog,
        key: &str,
        args: &[&dyn Display],
    ) -> Result<(), ResultError> {
        self.ensure_executing(id)?;
        self.add_message(id, MSG_MESSAGE, catalog.message(key, args))?;
        self.set_state(id, ExecutionState::Success)
    }

    pub fn complete_as_failure(
        &mut self,
        id: ResultId,
        catalog: &dyn MessageCatalog,
        key: &str,
        args: &[&dyn Display],
    ) -> Result<(), ResultError> {
        self.ensure_executing(id)?;
        self.add_message(id, MSG_ERROR_MESSAGE, catalog.message(key, args))?;
        self.set_state(id, ExecutionState::Failure)
    }

    /// Complete as ERROR, recording the message and the trace of `error`.
    pub fn complete_as_error(
        &mut self,
        id: ResultId,
        catalog: &dyn MessageCatalog,
        key: &str,
        args: &[&dyn Display],
        error: &(dyn StdError + 'static),
    ) -> Result<(), ResultError> {
        self.ensure_executing(id)?;
        self.add_message(id, MSG_ERROR_MESSAGE, catalog.message(key, args))?;
        self.add_message(id, MSG_STACKTRACE, render_trace(error))?;
        self.set_state(id, ExecutionState::Error)
    }

    /// Move a result to ERROR whatever its state, recording the message and
    /// the trace of `error`.
    ///
    /// An executing result is completed as ERROR. A result already completed
    /// keeps its completion time but its state becomes ERROR, and the policy
    /// is signalled as for any unsuccessful completion.
    pub fn escalate_to_error(
        &mut self,
        id: ResultId,
        catalog: &dyn MessageCatalog,
        key: &str,
        args: &[&dyn Display],
        error: &(dyn StdError + 'static),
    ) -> Result<(), ResultError> {
        if self.node(id)?.is_executing() {
            return self.complete_as_error(id, catalog, key, args, error);
        }

        self.add_message(id, MSG_ERROR_MESSAGE, catalog.message(key, args))?;
        self.add_message(id, MSG_STACKTRACE, render_trace(error))?;
        let node = self.node_mut(id)?;
        let previous = node.state;
        node.state = ExecutionState::Error;
        warn!(result = %id, previous = %previous, "Completed result escalated to error");
        self.policy.set_failed(id);
        Ok(())
    }

    /// Complete as ERROR for a modelled outcome that has no underlying
    /// error value; the stack trace is recorded as "n/a".
    pub fn complete_as_error_without_trace(
        &mut self,
        id: ResultId,
        catalog: &dyn MessageCatalog,
        key: &str,
        args: &[&dyn Display],
    ) -> Result<(), ResultError> {
        self.ensure_executing(id)?;
        self.add_message(id, MSG_ERROR_MESSAGE, catalog.message(key, args))?;
        self.add_message(id, MSG_STACKTRACE, "n/a")?;
        self.set_state(id, ExecutionState::Error)
    }

    /// Complete from the children's states.
    ///
    /// Children still executing are forced to ERROR first. Without failed or
    /// errored children the result is SUCCESS with the success template.
    /// Otherwise the failure template is used for FAILURE and ERROR alike,
    /// with the failure and error counts prepended to `failure_args`, and the
    /// state is the most severe child state.
    pub fn complete_as_computed(
        &mut self,
        id: ResultId,
        catalog: &dyn MessageCatalog,
        success_key: &str,
        success_args: &[&dyn Display],
        failure_key: &str,
        failure_args: &[&dyn Display],
    ) -> Result<(), ResultError> {
        self.ensure_executing(id)?;

        let children = self.node(id)?.children.clone();
        for child in &children {
            if self.state(*child) == Some(ExecutionState::Executing) {
                self.force_error(*child, catalog)?;
            }
        }

        let mut successful = 0usize;
        let mut failed = 0usize;
        let mut errors = 0usize;
        let mut computed = ExecutionState::Success;
        for child in &children {
            let state = self.node(*child)?.state;
            match state {
                ExecutionState::Success => successful += 1,
                ExecutionState::Failure => failed += 1,
                ExecutionState::Error | ExecutionState::Executing => errors += 1,
            }
            if state.severity() > computed.severity() {
                computed = if state == ExecutionState::Executing {
                    ExecutionState::Error
                } else {
                    state
                };
            }
        }

        self.add_or_replace_message(
            id,
            MSG_COMPOSITE,
            format!(
                "Results: {}, successful: {}, failures: {}, errors: {}.",
                children.len(),
                successful,
                failed,
                errors
            ),
        )?;

        if computed == ExecutionState::Success {
            self.add_message(id, MSG_MESSAGE, catalog.message(success_key, success_args))?;
        } else {
            let mut args: Vec<&dyn Display> = Vec::with_capacity(failure_args.len() + 2);
            args.push(&failed);
            args.push(&errors);
            args.extend_from_slice(failure_args);
            self.add_message(id, MSG_MESSAGE, catalog.message(failure_key, &args))?;
        }
        self.set_state(id, computed)
    }

    fn force_error(&mut self, id: ResultId, catalog: &dyn MessageCatalog) -> Result<(), ResultError> {
        for descendant in self.subtree(id).into_iter().rev() {
            if self.state(descendant) == Some(ExecutionState::Executing) {
                self.add_message(descendant, MSG_MESSAGE, catalog.message("result.forced_error", &[]))?;
                self.add_message(descendant, MSG_STACKTRACE, "n/a")?;
                self.set_state(descendant, ExecutionState::Error)?;
            }
        }
        Ok(())
    }

    /// Force every result in the subtree of `id` that is still executing to
    /// ERROR, deepest first. Used after an invocation was abandoned.
    pub fn seal(&mut self, id: ResultId, catalog: &dyn MessageCatalog) -> Result<usize, ResultError> {
        self.node(id)?;
        let mut sealed = 0usize;
        for descendant in self.subtree(id).into_iter().rev() {
            if self.state(descendant) == Some(ExecutionState::Executing) {
                self.add_message(descendant, MSG_MESSAGE, catalog.message("result.sealed", &[]))?;
                self.add_message(descendant, MSG_STACKTRACE, "n/a")?;
                self.set_state(descendant, ExecutionState::Error)?;
                sealed += 1;
            }
        }
        Ok(sealed)
    }

    /// Scoped sink for a result, handed to plugin operations.
    pub fn sink(&mut self, id: ResultId) -> Result<ResultSink<'_>, ResultError> {
        self.node(id)?;
        Ok(ResultSink { tree: self, id })
    }
}

/// Mutable view of one result inside its tree.
///
/// Operations receive a sink for the result they must complete before
/// returning.
pub struct ResultSink<'a> {
    tree: &'a mut ResultTree,
    id: ResultId,
}

impl<'a> ResultSink<'a> {
    pub fn id(&self) -> ResultId {
        self.id
    }

    pub fn tree(&self) -> &ResultTree {
        &*self.tree
    }

    pub fn state(&self) -> ExecutionState {
        self.tree
            .state(self.id)
            .unwrap_or(ExecutionState::Executing)
    }

    pub fn is_executing(&self) -> bool {
        self.state() == ExecutionState::Executing
    }

    pub fn continue_execution(&self) -> bool {
        self.tree.policy().continue_execution()
    }

    pub fn add_child(&mut self, description: impl Into<String>) -> Result<ResultId, ResultError> {
        self.tree.add_child(self.id, description)
    }

    fn ensure_descendant(&self, id: ResultId) -> Result<(), ResultError> {
        self.tree.node(id)?;
        if id != self.id && self.tree.subtree(self.id).contains(&id) {
            Ok(())
        } else {
            Err(ResultError::OutOfScope { id, scope: self.id })
        }
    }

    /// Sink for a result below this one.
    pub fn child(&mut self, id: ResultId) -> Result<ResultSink<'_>, ResultError> {
        self.ensure_descendant(id)?;
        self.tree.sink(id)
    }

    /// Invoke a module under `child`, a result below this one, which the
    /// invocation completes.
    pub fn invoke_nested(
        &mut self,
        invoker: &dyn ModuleInvoker,
        module_id: &str,
        environment: &str,
        operation: &str,
        child: ResultId,
    ) -> Result<(), KernelError> {
        self.ensure_descendant(child)?;
        invoker.invoke_module(module_id, environment, operation, &mut *self.tree, child)
    }

    /// Force every still executing result of this subtree to ERROR.
    pub fn seal(&mut self, catalog: &dyn MessageCatalog) -> Result<usize, ResultError> {
        self.tree.seal(self.id, catalog)
    }

    pub fn add_message(&mut self, key: &str, message: impl Into<String>) -> Result<(), ResultError> {
        self.tree.add_message(self.id, key, message)
    }

    pub fn complete_as_successful(
        &mut self,
        catalog: &dyn MessageCatalog,
        key: &str,
        args: &[&dyn Display],
    ) -> Result<(), ResultError> {
        self.tree.complete_as_successful(self.id, catalog, key, args)
    }

    pub fn complete_as_failure(
        &mut self,
        catalog: &dyn MessageCatalog,
        key: &str,
        args: &[&dyn Display],
    ) -> Result<(), ResultError> {
        self.tree.complete_as_failure(self.id, catalog, key, args)
    }

    pub fn complete_as_error(
        &mut self,
        catalog: &dyn MessageCatalog,
        key: &str,
        args: &[&dyn Display],
        error: &(dyn StdError + 'static),
    ) -> Result<(), ResultError> {
        self.tree.complete_as_error(self.id, catalog, key, args, error)
    }

    pub fn complete_as_computed(
        &mut self,
        catalog: &dyn MessageCatalog,
        success_key: &str,
        success_args: &[&dyn Display],
        failure_key: &str,
        failure_args: &[&dyn Display],
    ) -> Result<(), ResultError> {
        self.tree.complete_as_computed(
            self.id,
            catalog,
            success_key,
            success_args,
            failure_key,
            failure_args,
        )
    }
}
