//! Trigger matching and nested module invocation.

use crate::integration::test_utils::{assert_fully_labelled, child, node, Fixture, ENV};
use rigging::execution::{ExecutionState, MSG_ENVIRONMENT, MSG_MODULE, MSG_OPERATION};
use rigging::model::{AggregatedModel, ModuleModel, Trigger};
use rigging::resource::{Environment, Resource};

fn verify_module() -> ModuleModel {
    ModuleModel::default().with_model(AggregatedModel::targeting("ok-2"))
}

#[test]
fn test_wildcard_trigger_fires_for_any_state_and_operation() {
    for (target, operation) in [("ok-1", "deploy"), ("fail-1", "undeploy"), ("jmx-1", "test")] {
        let model = AggregatedModel::targeting(target)
            .with_trigger(Trigger::new("verify").on_result("*").on_target_operation("*"));
        let fixture = Fixture::new()
            .with_module("shop", ModuleModel::default().with_model(model))
            .with_module("verify", verify_module());

        let tree = fixture.task().execute("shop", ENV, operation).unwrap();

        assert_eq!(tree.children(tree.root()).len(), 2, "target {}", target);
        assert_fully_labelled(&tree);
    }
}

#[test]
fn test_result_list_directive_selects_states() {
    let model = AggregatedModel::targeting("fail-1")
        .with_trigger(Trigger::new("verify").on_result("{SUCCESS, ERROR}"))
        .with_trigger(Trigger::new("verify").named("on failure").on_result("{FAILURE}"));
    let fixture = Fixture::new()
        .with_module("shop", ModuleModel::default().with_model(model))
        .with_module("verify", verify_module());

    let tree = fixture.task().execute("shop", ENV, "deploy").unwrap();

    let root = tree.root();
    assert_eq!(tree.children(root).len(), 2);
    assert_eq!(node(&tree, child(&tree, root, 1)).description(), "Trigger: on failure");
}

#[test]
fn test_operation_directive_restricts_trigger() {
    let model = AggregatedModel::targeting("ok-1")
        .with_trigger(Trigger::new("verify").on_target_operation("{deploy, redeploy}"));
    let fixture = Fixture::new()
        .with_module("shop", ModuleModel::default().with_model(model))
        .with_module("verify", ModuleModel::default().with_model(AggregatedModel::default()));

    let deployed = fixture.task().execute("shop", ENV, "deploy").unwrap();
    assert_eq!(deployed.children(deployed.root()).len(), 2);

    let undeployed = fixture.task().execute("shop", ENV, "undeploy").unwrap();
    assert_eq!(undeployed.children(undeployed.root()).len(), 1);
}

#[test]
fn test_trigger_overrides_environment_and_operation() {
    let model = AggregatedModel::targeting("ok-1").with_trigger(
        Trigger::new("verify")
            .in_environment("smoke")
            .with_operation("test"),
    );
    let fixture = Fixture::new()
        .with_module("shop", ModuleModel::default().with_model(model))
        .with_module(
            "verify",
            ModuleModel::default().with_model(AggregatedModel::targeting("smoke-1")),
        );
    fixture
        .resources
        .register(Environment::new("smoke").with_resource(Resource::new("smoke-1", "noop")));

    let tree = fixture.task().execute("shop", ENV, "deploy").unwrap();

    let trigger = child(&tree, tree.root(), 1);
    let trigger_result = node(&tree, trigger);
    assert_eq!(
        trigger_result.description(),
        "Trigger: module [verify], environment [smoke], operation [test]"
    );
    assert!(trigger_result.is_success());
    assert_eq!(trigger_result.message(MSG_MODULE), Some("verify"));
    assert_eq!(trigger_result.message(MSG_ENVIRONMENT), Some("smoke"));
    assert_eq!(trigger_result.message(MSG_OPERATION), Some("test"));
    let nested_target = node(&tree, child(&tree, child(&tree, trigger, 0), 0));
    assert_eq!(nested_target.description(), "Execute on resource: smoke-1");
}

#[test]
fn test_triggered_failure_rolls_up_into_root() {
    let model = AggregatedModel::targeting("ok-1").with_trigger(Trigger::new("verify"));
    let fixture = Fixture::new()
        .with_module("shop", ModuleModel::default().with_model(model))
        .with_module(
            "verify",
            ModuleModel::default().with_model(AggregatedModel::targeting("fail-1")),
        );

    let tree = fixture.task().execute("shop", ENV, "deploy").unwrap();

    let root = tree.root();
    assert!(node(&tree, child(&tree, root, 0)).is_success());
    assert_eq!(node(&tree, child(&tree, root, 1)).state(), ExecutionState::Failure);
    assert_eq!(node(&tree, root).state(), ExecutionState::Failure);
}

#[test]
fn test_trigger_to_unknown_environment_is_sealed() {
    let model = AggregatedModel::targeting("ok-1")
        .with_trigger(Trigger::new("verify").in_environment("nowhere"));
    let fixture = Fixture::new()
        .with_module("shop", ModuleModel::default().with_model(model))
        .with_module("verify", verify_module());

    let tree = fixture.task().execute("shop", ENV, "deploy").unwrap();

    let trigger = child(&tree, tree.root(), 1);
    assert!(node(&tree, trigger).is_error());
    assert_eq!(tree.children(trigger).len(), 1);
    assert!(node(&tree, child(&tree, trigger, 0)).is_error());
    assert_fully_labelled(&tree);
}
