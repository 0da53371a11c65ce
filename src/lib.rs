//! Rigging: Execution Kernel for Infrastructure Modules
//!
//! Runs an operation of a module against the resources of an environment and
//! records every step in a hierarchical result tree. Plugin failures become
//! FAILURE or ERROR results; a continuation policy decides whether execution
//! goes on after the first failure; triggers chain further module invocations
//! from a model's outcome.

pub mod cli;
pub mod config;
pub mod directive;
pub mod error;
pub mod execution;
pub mod kernel;
pub mod logging;
pub mod messages;
pub mod model;
pub mod module;
pub mod plugin;
pub mod resource;
pub mod task;
pub mod trigger;

pub use directive::Directive;
pub use error::{FaultCategory, KernelError, PluginFault, ResultError};
pub use execution::{
    CancellationToken, ContinuationPolicy, ExecutionInfo, ExecutionState, ModuleInfo,
    ResultId, ResultReport, ResultSink, ResultTree,
};
pub use kernel::{InvocationContext, Kernel};
pub use messages::{BundledCatalog, MessageCatalog};
pub use model::{AggregatedModel, ModuleModel, Trigger};
pub use module::{InMemoryModuleRepository, ModuleHandle, ModuleRepository};
pub use plugin::{Operation, OperationContext, OperationRegistry, PluginRegistry};
pub use resource::{Environment, InMemoryResourceRepository, Resource, ResourceRepository, TargetDirective};
pub use task::OperationTask;
