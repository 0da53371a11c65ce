//! Property-based tests for directive matching and result rollup

use proptest::prelude::*;
use rigging::directive::Directive;
use rigging::execution::{ExecutionState, ResultTree};
use rigging::messages::BundledCatalog;

const STATES: [&str; 3] = ["SUCCESS", "FAILURE", "ERROR"];

fn token() -> impl Strategy<Value = String> {
    "[A-Za-z][A-Za-z0-9_-]{0,11}"
}

/// Brace lists fire exactly for their members
#[test]
fn test_list_directive_membership_property() {
    let mut runner = proptest::test_runner::TestRunner::default();

    runner
        .run(
            &(proptest::collection::vec(token(), 0..6), token()),
            |(tokens, candidate)| {
                let raw = format!("{{{}}}", tokens.join(", "));
                let directive = Directive::parse(&raw).unwrap();

                assert_eq!(directive.matches(&candidate), tokens.contains(&candidate));
                for t in &tokens {
                    assert!(directive.matches(t));
                }
                Ok(())
            },
        )
        .unwrap();
}

/// The wildcard matches any operation and any state
#[test]
fn test_wildcard_matches_everything_property() {
    let mut runner = proptest::test_runner::TestRunner::default();

    runner
        .run(&(token(), 0..STATES.len()), |(operation, state)| {
            assert!(Directive::parse("*").unwrap().matches(&operation));
            assert!(Directive::parse("*").unwrap().matches(STATES[state]));
            assert!(Directive::parse_optional(None).unwrap().matches(&operation));
            Ok(())
        })
        .unwrap();
}

/// A single token matches only itself, ignoring surrounding whitespace
#[test]
fn test_token_directive_property() {
    let mut runner = proptest::test_runner::TestRunner::default();

    runner
        .run(&(token(), token()), |(expected, candidate)| {
            let directive = Directive::parse(&format!("  {} ", expected)).unwrap();
            assert_eq!(directive.matches(&candidate), expected == candidate);
            assert!(directive.matches(&expected));
            Ok(())
        })
        .unwrap();
}

/// Displayed directives parse back to the same directive
#[test]
fn test_display_reparses_property() {
    let mut runner = proptest::test_runner::TestRunner::default();

    runner
        .run(&proptest::collection::vec(token(), 1..5), |tokens| {
            let directive = Directive::parse(&format!("{{{}}}", tokens.join(","))).unwrap();
            let reparsed = Directive::parse(&directive.to_string()).unwrap();
            assert_eq!(directive, reparsed);
            Ok(())
        })
        .unwrap();
}

/// A parent's computed state is the most severe child state, and a second
/// completion is always rejected
#[test]
fn test_computed_rollup_property() {
    let catalog = BundledCatalog::new().unwrap();
    let mut runner = proptest::test_runner::TestRunner::default();

    runner
        .run(&proptest::collection::vec(0..STATES.len(), 0..8), |states| {
            let mut tree = ResultTree::new("root");
            let root = tree.root();
            for state in &states {
                let id = tree.add_child(root, "child").unwrap();
                match STATES[*state] {
                    "SUCCESS" => tree.complete_as_successful(id, &catalog, "noop.succeed", &[]),
                    "FAILURE" => tree.complete_as_failure(id, &catalog, "kernel.failed", &[]),
                    _ => tree.complete_as_error_without_trace(id, &catalog, "task.error", &[]),
                }
                .unwrap();
            }

            tree.complete_as_computed(root, &catalog, "kernel.succeed", &[], "kernel.failed", &[])
                .unwrap();

            let expected = if states.iter().any(|s| STATES[*s] == "ERROR") {
                ExecutionState::Error
            } else if states.iter().any(|s| STATES[*s] == "FAILURE") {
                ExecutionState::Failure
            } else {
                ExecutionState::Success
            };
            assert_eq!(tree.state(root), Some(expected));
            assert!(tree
                .complete_as_successful(root, &catalog, "kernel.succeed", &[])
                .is_err());
            Ok(())
        })
        .unwrap();
}
