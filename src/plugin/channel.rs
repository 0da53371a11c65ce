//! Error channel: runs an operation against its target result and turns
//! whatever escapes it into a completed result.

use crate::error::{FaultCategory, PluginFault, ResultError};
use crate::execution::{ResultId, ResultTree};
use crate::messages::MessageCatalog;
use crate::plugin::{Operation, OperationContext};
use std::any::Any;
use std::backtrace::Backtrace;
use std::cell::{Cell, RefCell};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Once;
use tracing::{debug, warn};

thread_local! {
    static CAPTURING: Cell<bool> = const { Cell::new(false) };
    static PANIC_TRACE: RefCell<Option<Backtrace>> = const { RefCell::new(None) };
}

static PANIC_HOOK: Once = Once::new();

/// Chain a panic hook which keeps the backtrace of panics raised while an
/// operation runs on this thread.
fn install_panic_hook() {
    PANIC_HOOK.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            if CAPTURING.with(Cell::get) {
                PANIC_TRACE.with(|trace| *trace.borrow_mut() = Some(Backtrace::force_capture()));
            }
            previous(info);
        }));
    });
}

/// Message key used for faults of a category.
pub fn message_key(category: FaultCategory) -> &'static str {
    match category {
        FaultCategory::ExecutionFailed => "channel.execution_failed",
        FaultCategory::SessionConnect => "channel.session_connect",
        FaultCategory::SessionDisconnect => "channel.session_disconnect",
        FaultCategory::Unchecked => "channel.unchecked",
    }
}

/// Execute `operation` with a sink for `target`.
///
/// Faults and panics leave the target ERROR, even when the operation had
/// already completed it. An operation returning without completing its
/// result leaves it FAILURE. Only result tree misuse is returned.
pub fn execute(
    operation: &dyn Operation,
    ctx: &OperationContext<'_>,
    tree: &mut ResultTree,
    target: ResultId,
) -> Result<(), ResultError> {
    install_panic_hook();
    let outcome = {
        let mut sink = tree.sink(target)?;
        let capturing = CAPTURING.with(|c| c.replace(true));
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| operation.execute(ctx, &mut sink)));
        CAPTURING.with(|c| c.set(capturing));
        outcome
    };

    match outcome {
        Ok(Ok(())) => {
            if tree.state(target).map_or(false, |s| !s.is_terminal()) {
                warn!(
                    result = %target,
                    operation = ctx.operation(),
                    resource = %ctx.resource.id,
                    "Operation returned without completing its result"
                );
                tree.complete_as_failure(
                    target,
                    ctx.catalog,
                    "kernel.operation_not_completed",
                    &[&ctx.operation()],
                )?;
            }
            Ok(())
        }
        Ok(Err(fault)) => channel_fault(tree, target, ctx.catalog, &fault),
        Err(payload) => {
            let mut fault = PluginFault::unchecked(panic_message(payload.as_ref()));
            if let Some(trace) = PANIC_TRACE.with(|trace| trace.borrow_mut().take()) {
                fault = fault.with_trace(trace);
            }
            channel_fault(tree, target, ctx.catalog, &fault)
        }
    }
}

/// Leave `target` ERROR for `fault`, escalating a result the operation had
/// already completed.
pub fn channel_fault(
    tree: &mut ResultTree,
    target: ResultId,
    catalog: &dyn MessageCatalog,
    fault: &PluginFault,
) -> Result<(), ResultError> {
    let category = fault.category();
    let key = message_key(category);
    debug!(
        result = %target,
        category = category.as_str(),
        error = %fault,
        "Channeling operation fault"
    );

    if let Some(result) = tree.get(target).filter(|r| !r.is_executing()) {
        warn!(
            result = %target,
            state = %result.state(),
            error = %fault,
            "Fault raised after result was completed"
        );
    }
    tree.escalate_to_error(target, catalog, key, &[&fault.message()], fault)
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("panic: {}", s)
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("panic: {}", s)
    } else {
        "panic with non-string payload".to_string()
    }
}
