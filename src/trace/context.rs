//! Per-thread active-span stack.
//!
//! Each thread owns an independent stack of the span contexts currently
//! open on it; the top of the stack is the parent assigned to the next span
//! started on that thread. Pops are defensive: instrumented applications
//! double-finish spans and finish them out of order, and none of that may
//! ever crash the host program. An unbalanced pop is logged and absorbed.

use crate::trace::SpanContext;
use std::cell::RefCell;

thread_local! {
    static ACTIVE_SPANS: RefCell<Vec<SpanContext>> = const { RefCell::new(Vec::new()) };
}

/// The span context at the top of the calling thread's stack, if any.
pub fn current() -> Option<SpanContext> {
    ACTIVE_SPANS.with(|stack| stack.borrow().last().cloned())
}

/// The number of spans currently open on the calling thread.
pub fn depth() -> usize {
    ACTIVE_SPANS.with(|stack| stack.borrow().len())
}

pub(crate) fn push(cx: SpanContext) {
    ACTIVE_SPANS.with(|stack| stack.borrow_mut().push(cx));
}

/// Remove `cx` from the calling thread's stack.
///
/// The well-behaved case pops the top of the stack. A span found deeper in
/// the stack (finished out of order) is removed from where it sits; a span
/// not found at all (finished twice, or on another thread) is ignored.
pub(crate) fn pop(cx: &SpanContext) {
    ACTIVE_SPANS.with(|stack| {
        let mut stack = stack.borrow_mut();
        match stack.last() {
            Some(top) if top.span_id() == cx.span_id() => {
                stack.pop();
            }
            _ => {
                if let Some(index) = stack.iter().rposition(|c| c.span_id() == cx.span_id()) {
                    stack.remove(index);
                    tracing::debug!(
                        name: "Context.OutOfOrderPop",
                        span_id = cx.span_id().to_string(),
                    );
                } else {
                    tracing::debug!(
                        name: "Context.OrphanedPop",
                        span_id = cx.span_id().to_string(),
                    );
                }
            }
        }
    });
}
