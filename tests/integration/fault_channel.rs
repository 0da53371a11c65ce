//! Faults raised by plugin operations end up as ERROR results.

use crate::integration::test_utils::{assert_fully_labelled, child, node, Fixture, ENV};
use rigging::error::PluginFault;
use rigging::execution::{ExecutionState, MSG_ERROR_MESSAGE, MSG_MESSAGE, MSG_STACKTRACE};
use rigging::model::{AggregatedModel, ModuleModel, Trigger};
use rigging::plugin::operation_fn;
use rigging::resource::Resource;

fn run_single_target(fixture: Fixture, resource: &str) -> rigging::ResultTree {
    let fixture = fixture.with_module(
        "shop",
        ModuleModel::default().with_model(AggregatedModel::targeting(resource)),
    );
    fixture.task().execute("shop", ENV, "deploy").unwrap()
}

fn target_of(tree: &rigging::ResultTree) -> rigging::ResultId {
    child(tree, child(tree, tree.root(), 0), 0)
}

#[test]
fn test_each_fault_category_has_its_prefix() {
    let cases: [(fn(&str) -> PluginFault, &str); 4] = [
        (
            |m| PluginFault::execution_failed(m),
            "Plugin execution failed with the error: ",
        ),
        (
            |m| PluginFault::session_connect(m),
            "Establishing session to resource failed with the error: ",
        ),
        (
            |m| PluginFault::session_disconnect(m),
            "Disconnecting session from resource failed with the error: ",
        ),
        (|m| PluginFault::unchecked(m), "Execution failed with the error: "),
    ];

    for (fault, prefix) in cases {
        let fixture = Fixture::new().with_faulting_resource("edge-1", "edge", fault);
        let tree = run_single_target(fixture, "edge-1");

        let target = node(&tree, target_of(&tree));
        assert_eq!(target.state(), ExecutionState::Error);
        let message = target.message(MSG_ERROR_MESSAGE).unwrap();
        assert!(message.starts_with(prefix), "{}", message);
        assert!(message.ends_with("backend unreachable"));
        assert!(target
            .message(MSG_STACKTRACE)
            .unwrap()
            .starts_with("backend unreachable"));
        assert_eq!(node(&tree, tree.root()).state(), ExecutionState::Error);
    }
}

#[test]
fn test_panicking_operation_is_unchecked_error() {
    let fixture = Fixture::new().with_resource(Resource::new("crash-1", "crash"));
    fixture.plugins.register(
        "crash",
        "*",
        operation_fn(|_ctx, _sink| panic!("connection pool poisoned")),
    );
    let tree = run_single_target(fixture, "crash-1");

    let target = node(&tree, target_of(&tree));
    assert!(target.is_error());
    assert_eq!(
        target.message(MSG_ERROR_MESSAGE),
        Some("Execution failed with the error: panic: connection pool poisoned")
    );
    assert_fully_labelled(&tree);
}

#[test]
fn test_operation_leaving_result_open_is_failure() {
    let fixture = Fixture::new().with_resource(Resource::new("lazy-1", "lazy"));
    fixture
        .plugins
        .register("lazy", "*", operation_fn(|_ctx, _sink| Ok(())));
    let tree = run_single_target(fixture, "lazy-1");

    let target = node(&tree, target_of(&tree));
    assert_eq!(target.state(), ExecutionState::Failure);
    assert_eq!(
        target.message(MSG_ERROR_MESSAGE),
        Some("Operation [deploy] didn't set a state on the result.")
    );
}

#[test]
fn test_fault_after_completion_escalates_to_error() {
    let fixture = Fixture::new()
        .with_resource(Resource::new("late-1", "late"))
        .with_module(
            "rollback",
            ModuleModel::default().with_model(AggregatedModel::targeting("ok-1")),
        );
    fixture.plugins.register(
        "late",
        "*",
        operation_fn(|ctx, sink| {
            sink.complete_as_successful(ctx.catalog, "noop.succeed", &[&ctx.operation(), &ctx.resource.id])?;
            Err(PluginFault::execution_failed("deploy rolled back"))
        }),
    );
    let fixture = fixture.with_module(
        "shop",
        ModuleModel::default().with_model(
            AggregatedModel::targeting("late-1")
                .with_trigger(Trigger::new("rollback").named("rollback").on_result("{ERROR}")),
        ),
    );
    let tree = fixture.task().execute("shop", ENV, "deploy").unwrap();

    let target = node(&tree, target_of(&tree));
    assert_eq!(target.state(), ExecutionState::Error);
    assert_eq!(
        target.message(MSG_ERROR_MESSAGE),
        Some("Plugin execution failed with the error: deploy rolled back")
    );
    assert!(target
        .message(MSG_STACKTRACE)
        .unwrap()
        .starts_with("deploy rolled back"));
    let model = child(&tree, tree.root(), 0);
    assert_eq!(node(&tree, model).state(), ExecutionState::Error);
    assert_eq!(node(&tree, tree.root()).state(), ExecutionState::Error);

    // the trigger sees the escalated state
    let trigger = node(&tree, child(&tree, tree.root(), 1));
    assert_eq!(trigger.description(), "Trigger: rollback");
    assert!(trigger.is_success());
    assert_fully_labelled(&tree);
}

#[test]
fn test_operation_cannot_complete_results_outside_its_target() {
    let fixture = Fixture::new().with_resource(Resource::new("rogue-1", "rogue"));
    fixture.plugins.register(
        "rogue",
        "*",
        operation_fn(|ctx, sink| {
            let parent = sink
                .tree()
                .get(sink.id())
                .and_then(|r| r.parent())
                .ok_or_else(|| PluginFault::unchecked("target has no parent"))?;
            sink.child(parent)?
                .complete_as_successful(ctx.catalog, "noop.succeed", &[&ctx.operation(), &ctx.resource.id])?;
            sink.complete_as_successful(ctx.catalog, "noop.succeed", &[&ctx.operation(), &ctx.resource.id])?;
            Ok(())
        }),
    );
    let tree = run_single_target(fixture, "rogue-1");

    let target = node(&tree, target_of(&tree));
    assert!(target.is_error());
    assert!(target
        .message(MSG_ERROR_MESSAGE)
        .unwrap()
        .contains("is outside the scope of result"));
    let model = node(&tree, child(&tree, tree.root(), 0));
    assert!(model.is_error());
    assert_eq!(
        model.message(MSG_MESSAGE),
        Some("Model execution failed with 0 failure(s) and 1 error(s).")
    );
    assert!(node(&tree, tree.root()).is_error());
    assert_fully_labelled(&tree);
}

#[test]
fn test_specific_operation_wins_over_wildcard() {
    let fixture = Fixture::new().with_resource(Resource::new("mixed-1", "mixed"));
    fixture.plugins.register(
        "mixed",
        "*",
        operation_fn(|_ctx, _sink| Err(PluginFault::unchecked("wildcard used"))),
    );
    fixture.plugins.register(
        "mixed",
        "deploy",
        operation_fn(|ctx, sink| {
            sink.complete_as_successful(ctx.catalog, "noop.succeed", &[&ctx.operation(), &ctx.resource.id])?;
            Ok(())
        }),
    );

    let deployed = run_single_target(fixture, "mixed-1");
    assert!(node(&deployed, target_of(&deployed)).is_success());
}
