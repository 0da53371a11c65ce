//! End-to-end kernel scenarios over the top-level operation task.

use crate::integration::test_utils::{assert_fully_labelled, child, node, Fixture, ENV};
use rigging::execution::{
    ExecutionState, MSG_COMPOSITE, MSG_ERROR_MESSAGE, MSG_MESSAGE, MSG_RESOURCE_RESOLUTION,
    MSG_STACKTRACE, MSG_TRIGGER_RESOLUTION,
};
use rigging::model::{AggregatedModel, ModuleModel, Trigger};
use rigging::KernelError;

#[test]
fn test_missing_operation_completes_target_as_error() {
    let fixture = Fixture::new()
        .with_module("jmx", ModuleModel::default().with_model(AggregatedModel::targeting("jmx-1")));
    let tree = fixture.task().execute("jmx", ENV, "deploy").unwrap();

    let root = tree.root();
    assert_eq!(node(&tree, root).state(), ExecutionState::Error);
    assert_eq!(tree.children(root).len(), 1);

    let model = child(&tree, root, 0);
    assert_eq!(node(&tree, model).state(), ExecutionState::Error);
    let target = child(&tree, model, 0);
    let target = node(&tree, target);
    assert!(target.is_error());
    assert!(target.children().is_empty());
    assert_eq!(
        target.message(MSG_ERROR_MESSAGE),
        Some("No operation found for operation [deploy] in plugin [jmx] for resource [jmx-1].")
    );
    assert_eq!(target.message(MSG_STACKTRACE), Some("n/a"));
    assert_fully_labelled(&tree);
}

#[test]
fn test_unknown_environment_is_raised() {
    let fixture = Fixture::new()
        .with_module("shop", ModuleModel::default().with_model(AggregatedModel::targeting("ok-1")));
    let kernel = fixture.kernel();
    let mut tree = rigging::ResultTree::new("root");
    let info = rigging::ExecutionInfo::new(
        rigging::ModuleInfo::new("shop"),
        "staging",
        "deploy",
        tree.root(),
    );
    let module = crate::integration::test_utils::module(
        "shop",
        ModuleModel::default().with_model(AggregatedModel::targeting("ok-1")),
    );
    let err = kernel
        .invoke(&rigging::InvocationContext::new(module, info), &mut tree)
        .unwrap_err();

    assert!(matches!(err, KernelError::EnvironmentNotFound(ref env) if env == "staging"));
    assert!(node(&tree, tree.root()).is_executing());
    let model = child(&tree, tree.root(), 0);
    assert!(node(&tree, model).is_executing());
    assert!(tree.children(model).is_empty());
}

#[test]
fn test_unknown_environment_via_task_is_labelled() {
    let fixture = Fixture::new()
        .with_module("shop", ModuleModel::default().with_model(AggregatedModel::targeting("ok-1")));
    let tree = fixture.task().execute("shop", "staging", "deploy").unwrap();

    let root = node(&tree, tree.root());
    assert!(root.is_error());
    assert!(root
        .message(MSG_ERROR_MESSAGE)
        .unwrap()
        .contains("Environment not found: staging"));
    assert_fully_labelled(&tree);
}

#[test]
fn test_triggers_to_unknown_modules_fail_the_root() {
    let model = AggregatedModel::default()
        .with_trigger(Trigger::new("ghost-1").on_result("*").on_target_operation("*"))
        .with_trigger(Trigger::new("ghost-2").on_result("*").on_target_operation("*"));
    let fixture = Fixture::new().with_module("shop", ModuleModel::default().with_model(model));
    let tree = fixture.task().execute("shop", ENV, "deploy").unwrap();

    let root = tree.root();
    assert_eq!(tree.children(root).len(), 3);
    assert_eq!(node(&tree, root).state(), ExecutionState::Error);
    assert!(node(&tree, child(&tree, root, 0)).is_success());
    for index in 1..3 {
        let trigger = node(&tree, child(&tree, root, index));
        assert!(trigger.is_error());
        assert!(trigger
            .message(MSG_ERROR_MESSAGE)
            .unwrap()
            .starts_with("Trigger execution failed with the error: Module not found: ghost-"));
    }
    assert_eq!(
        node(&tree, root).message(MSG_COMPOSITE),
        Some("Results: 3, successful: 1, failures: 0, errors: 2.")
    );
    assert_fully_labelled(&tree);
}

#[test]
fn test_success_trigger_does_not_fire_on_failure() {
    let model = AggregatedModel::targeting("fail-1")
        .with_trigger(Trigger::new("verify").on_result("{SUCCESS}"));
    let fixture = Fixture::new()
        .with_module("shop", ModuleModel::default().with_model(model))
        .with_module("verify", ModuleModel::default());
    let tree = fixture.task().execute("shop", ENV, "deploy").unwrap();

    let root = tree.root();
    assert_eq!(tree.children(root).len(), 1);
    assert_eq!(node(&tree, root).state(), ExecutionState::Failure);
    assert_eq!(
        node(&tree, root).message(MSG_TRIGGER_RESOLUTION),
        Some("No triggers executed for result [FAILURE] and operation [deploy].")
    );
    assert_eq!(
        node(&tree, root).message(MSG_MESSAGE),
        Some("Operation failed with 1 failure(s) and 0 error(s).")
    );
}

#[test]
fn test_module_without_triggers_has_one_child_per_model() {
    let fixture = Fixture::new()
        .with_module("shop", ModuleModel::default().with_model(AggregatedModel::targeting("ok-1")));
    let tree = fixture.task().execute("shop", ENV, "deploy").unwrap();

    let root = tree.root();
    assert_eq!(tree.children(root).len(), 1);
    assert!(node(&tree, root).is_success());
    assert_eq!(
        node(&tree, root).message(MSG_TRIGGER_RESOLUTION),
        Some("No triggers defined for model.")
    );
    assert_eq!(
        node(&tree, root).message(MSG_MESSAGE),
        Some("Successfully executed operation [deploy] on module [shop].")
    );
}

#[test]
fn test_pattern_target_runs_on_every_match() {
    let model = AggregatedModel::targeting("regex:ok-.*").with_description("web tier");
    let fixture = Fixture::new().with_module("shop", ModuleModel::default().with_model(model));
    let tree = fixture.task().execute("shop", ENV, "deploy").unwrap();

    let model_result = child(&tree, tree.root(), 0);
    assert_eq!(node(&tree, model_result).description(), "Model: web tier");
    let targets: Vec<&str> = tree
        .children(model_result)
        .iter()
        .map(|id| node(&tree, *id).description())
        .collect();
    assert_eq!(
        targets,
        vec!["Execute on resource: ok-1", "Execute on resource: ok-2"]
    );
    assert_eq!(
        node(&tree, model_result).message(MSG_RESOURCE_RESOLUTION),
        Some("Target resource directive [regex:ok-.*] resolved to [ok-1, ok-2].")
    );
    assert!(node(&tree, tree.root()).is_success());
}

#[test]
fn test_blank_target_succeeds_without_children() {
    let fixture = Fixture::new()
        .with_module("shop", ModuleModel::default().with_model(AggregatedModel::default()));
    let tree = fixture.task().execute("shop", ENV, "deploy").unwrap();

    let model = node(&tree, child(&tree, tree.root(), 0));
    assert_eq!(model.description(), "Model: n/a");
    assert!(model.is_success());
    assert!(model.children().is_empty());
    assert_eq!(
        model.message(MSG_MESSAGE),
        Some("No target resource declared, nothing to execute.")
    );
}

#[test]
fn test_unknown_module_is_labelled_by_task() {
    let tree = Fixture::new().task().execute("missing", ENV, "deploy").unwrap();
    let root = node(&tree, tree.root());
    assert!(root.is_error());
    assert!(root.message(MSG_STACKTRACE).unwrap().contains("Module not found: missing"));
}
