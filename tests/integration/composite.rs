//! The composite-execution plugin invoking other modules.

use crate::integration::test_utils::{assert_fully_labelled, child, node, Fixture, ENV};
use rigging::execution::{ExecutionState, MSG_ERROR_MESSAGE, MSG_MESSAGE};
use rigging::model::{AggregatedModel, ModuleModel};
use rigging::resource::Resource;

fn composite_fixture(modules: serde_json::Value) -> Fixture {
    Fixture::new()
        .with_resource(Resource::new("composite", "composite-execution"))
        .with_module(
            "bundle",
            ModuleModel::default()
                .with_model(AggregatedModel::targeting("composite").with_content(modules)),
        )
        .with_module(
            "web",
            ModuleModel::default().with_model(AggregatedModel::targeting("ok-1")),
        )
        .with_module(
            "db",
            ModuleModel::default().with_model(AggregatedModel::targeting("ok-2")),
        )
        .with_module(
            "checks",
            ModuleModel::default().with_model(AggregatedModel::targeting("fail-1")),
        )
}

fn composite_target(tree: &rigging::ResultTree) -> rigging::ResultId {
    child(tree, child(tree, tree.root(), 0), 0)
}

#[test]
fn test_composite_runs_modules_in_order() {
    let fixture = composite_fixture(serde_json::json!({ "modules": ["web", "db"] }));
    let tree = fixture.task().execute("bundle", ENV, "deploy").unwrap();

    let target = composite_target(&tree);
    let names: Vec<&str> = tree
        .children(target)
        .iter()
        .map(|id| node(&tree, *id).description())
        .collect();
    assert_eq!(names, vec!["Composite: web", "Composite: db"]);
    assert_eq!(
        node(&tree, target).message(MSG_MESSAGE),
        Some("Successfully executed 2 composite module(s).")
    );
    assert!(node(&tree, tree.root()).is_success());
}

#[test]
fn test_composite_failure_is_counted() {
    let fixture = composite_fixture(serde_json::json!({ "modules": ["web", "checks"] }));
    let tree = fixture.task().execute("bundle", ENV, "deploy").unwrap();

    let target = composite_target(&tree);
    assert_eq!(node(&tree, target).state(), ExecutionState::Failure);
    assert_eq!(
        node(&tree, target).message(MSG_MESSAGE),
        Some("Composite execution failed with 1 failure(s) and 0 error(s).")
    );
}

#[test]
fn test_composite_unknown_module_is_error_child() {
    let fixture = composite_fixture(serde_json::json!({ "modules": ["ghost", "web"] }));
    let tree = fixture.task().execute("bundle", ENV, "deploy").unwrap();

    let target = composite_target(&tree);
    let ghost = node(&tree, child(&tree, target, 0));
    assert!(ghost.is_error());
    assert_eq!(
        ghost.message(MSG_ERROR_MESSAGE),
        Some("Composite module execution failed with the error: Module not found: ghost")
    );
    assert!(node(&tree, child(&tree, target, 1)).is_success());
    assert_eq!(node(&tree, target).state(), ExecutionState::Error);
    assert_fully_labelled(&tree);
}

#[test]
fn test_composite_without_module_list_is_execution_failure() {
    let fixture = composite_fixture(serde_json::json!({ "module": "web" }));
    let tree = fixture.task().execute("bundle", ENV, "deploy").unwrap();

    let target = node(&tree, composite_target(&tree));
    assert!(target.is_error());
    assert!(target
        .message(MSG_ERROR_MESSAGE)
        .unwrap()
        .starts_with("Plugin execution failed with the error: Composite content must list modules"));
}
