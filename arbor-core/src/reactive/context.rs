//! Tracking Context
//!
//! The tracking context records which effect is currently executing. This
//! enables automatic dependency tracking: when a store field is read, we can
//! register the current effect as a subscriber.
//!
//! # Implementation
//!
//! We use a thread-local stack of effect handles. When an effect starts
//! running we push it onto the stack; when the run completes we pop it,
//! restoring the previous top. A single mutable slot would break under
//! nested effects (the inner effect's completion must restore tracking to
//! the outer effect, not clear it), so the stack is load-bearing.
//!
//! The pop happens in a guard's `Drop`, which also runs during unwinding.
//! An effect whose closure panics therefore never leaks a stale tracking
//! context into unrelated later reads.

use std::cell::RefCell;

use super::effect::ReactiveEffect;

/// The tracking context stack.
///
/// Each thread has its own stack; reactivity is single-threaded per logical
/// thread of execution, so no synchronization is needed here.
thread_local! {
    static EFFECT_STACK: RefCell<Vec<ReactiveEffect>> = RefCell::new(Vec::new());
}

/// Guard that pops the context when dropped.
///
/// Ensures the stack is properly restored even if the effect's closure
/// panics.
pub(crate) struct TrackingGuard {
    effect: ReactiveEffect,
}

impl TrackingGuard {
    /// Enter a tracking context for the given effect.
    ///
    /// While the guard is alive, any store field that is read will register
    /// the effect as a subscriber. The context is exited when the guard is
    /// dropped.
    pub(crate) fn enter(effect: ReactiveEffect) -> Self {
        EFFECT_STACK.with(|stack| {
            stack.borrow_mut().push(effect.clone());
        });

        Self { effect }
    }
}

impl Drop for TrackingGuard {
    fn drop(&mut self) {
        EFFECT_STACK.with(|stack| {
            let popped = stack.borrow_mut().pop();

            // Verify we're popping the right context. This catches bugs
            // where guards are dropped out of order.
            if let Some(effect) = popped {
                debug_assert_eq!(
                    effect.id(),
                    self.effect.id(),
                    "tracking context mismatch: expected {:?}, got {:?}",
                    self.effect.id(),
                    effect.id()
                );
            }
        });
    }
}

/// Check if there is an active tracking context on this thread.
pub fn is_tracking() -> bool {
    EFFECT_STACK.with(|stack| !stack.borrow().is_empty())
}

/// Get the currently executing effect, if any.
pub fn current_effect() -> Option<ReactiveEffect> {
    EFFECT_STACK.with(|stack| stack.borrow().last().cloned())
}

/// Check whether the given effect is the one currently executing.
///
/// Used by `trigger` to skip notifying an effect about writes it performs
/// itself mid-run, which would otherwise recurse without bound.
pub(crate) fn is_current(effect: &ReactiveEffect) -> bool {
    EFFECT_STACK.with(|stack| {
        stack
            .borrow()
            .last()
            .is_some_and(|top| top.id() == effect.id())
    })
}
