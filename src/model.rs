//! Declarative module model: aggregated models and their triggers.

use crate::directive::Directive;
use crate::error::KernelError;
use serde::{Deserialize, Serialize};

fn default_continue_on_failure() -> bool {
    true
}

/// A module: one or more aggregated models executed in order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleModel {
    #[serde(default)]
    pub description: Option<String>,

    /// Continue-on-failure directive applied when the module is invoked.
    #[serde(default = "default_continue_on_failure")]
    pub continue_on_failure: bool,

    #[serde(default)]
    pub models: Vec<AggregatedModel>,
}

impl Default for ModuleModel {
    fn default() -> Self {
        Self {
            description: None,
            continue_on_failure: default_continue_on_failure(),
            models: Vec::new(),
        }
    }
}

impl ModuleModel {
    pub fn with_model(mut self, model: AggregatedModel) -> Self {
        self.models.push(model);
        self
    }

    pub fn with_continue_on_failure(mut self, continue_on_failure: bool) -> Self {
        self.continue_on_failure = continue_on_failure;
        self
    }
}

/// One block of a module: where it runs, for which operations, with what
/// plugin content, and what it triggers afterwards.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AggregatedModel {
    #[serde(default)]
    pub description: Option<String>,

    /// Target resource directive: blank, an id, `{a, b}` or `regex:<pattern>`.
    #[serde(default)]
    pub target_resource: String,

    /// Operation restriction in directive grammar; absent runs for all.
    #[serde(default)]
    pub target_operation: Option<String>,

    /// Plugin specific content, handed to the operation untouched.
    #[serde(default)]
    pub content: serde_json::Value,

    #[serde(default)]
    pub triggers: Vec<Trigger>,
}

impl AggregatedModel {
    pub fn targeting(target_resource: impl Into<String>) -> Self {
        Self {
            target_resource: target_resource.into(),
            ..Self::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_target_operation(mut self, directive: impl Into<String>) -> Self {
        self.target_operation = Some(directive.into());
        self
    }

    pub fn with_content(mut self, content: serde_json::Value) -> Self {
        self.content = content;
        self
    }

    pub fn with_trigger(mut self, trigger: Trigger) -> Self {
        self.triggers.push(trigger);
        self
    }

    /// Whether the model runs for `operation`.
    pub fn runs_for(&self, operation: &str) -> Result<bool, KernelError> {
        Ok(Directive::parse_optional(self.target_operation.as_deref())?.matches(operation))
    }
}

/// Rule invoking another module once an aggregated model has completed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trigger {
    #[serde(default)]
    pub name: Option<String>,

    /// Directive over the model's final state, e.g. `{SUCCESS,FAILURE}`.
    #[serde(default)]
    pub on_result: Option<String>,

    /// Directive over the operation that was invoked.
    #[serde(default)]
    pub on_target_operation: Option<String>,

    /// Module to invoke.
    pub module: String,

    #[serde(default)]
    pub environment: Option<String>,

    #[serde(default)]
    pub operation: Option<String>,
}

impl Trigger {
    pub fn new(module: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            ..Self::default()
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn on_result(mut self, directive: impl Into<String>) -> Self {
        self.on_result = Some(directive.into());
        self
    }

    pub fn on_target_operation(mut self, directive: impl Into<String>) -> Self {
        self.on_target_operation = Some(directive.into());
        self
    }

    pub fn in_environment(mut self, environment: impl Into<String>) -> Self {
        self.environment = Some(environment.into());
        self
    }

    pub fn with_operation(mut self, operation: impl Into<String>) -> Self {
        self.operation = Some(operation.into());
        self
    }
}
