//! Hook registry for circuit breaker events.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use parking_lot::RwLock;

use crate::state::State;

/// Emitted on every real state transition.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StateChangeEvent {
    /// State the circuit left.
    pub from: State,

    /// State the circuit entered.
    pub to: State,

    /// Failure percentage at trip time when entering OPEN, otherwise the
    /// window's current rate.
    pub failure_rate: f64,

    /// Wall-clock time of the transition.
    pub timestamp: SystemTime,
}

/// Emitted after each completed operation.
#[derive(Debug)]
pub struct RequestEvent<'a, E> {
    /// Circuit state when the operation completed.
    pub state: State,

    /// How long the operation took.
    pub latency: Duration,

    /// Wall-clock completion time.
    pub timestamp: SystemTime,

    /// The operation's error, for failure events.
    pub error: Option<&'a E>,
}

type StateChangeFn = Arc<dyn Fn(&StateChangeEvent) + Send + Sync + 'static>;
type RequestFn<E> = Arc<dyn Fn(&RequestEvent<'_, E>) + Send + Sync + 'static>;

/// A registry for circuit breaker event hooks.
///
/// Hooks run synchronously on the task that caused the event, after the
/// breaker has released its internal lock. A panicking hook is logged and
/// otherwise ignored.
pub struct HookRegistry<E> {
    on_state_change: RwLock<Option<StateChangeFn>>,
    on_success: RwLock<Option<RequestFn<E>>>,
    on_failure: RwLock<Option<RequestFn<E>>>,
}

impl<E> Default for HookRegistry<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> HookRegistry<E> {
    /// Creates a new empty hook registry.
    pub fn new() -> Self {
        Self {
            on_state_change: RwLock::new(None),
            on_success: RwLock::new(None),
            on_failure: RwLock::new(None),
        }
    }

    /// Sets the hook to call on every state transition.
    pub fn set_on_state_change<F>(&self, f: F)
    where
        F: Fn(&StateChangeEvent) + Send + Sync + 'static,
    {
        *self.on_state_change.write() = Some(Arc::new(f));
    }

    /// Sets the hook to call when an operation succeeds.
    pub fn set_on_success<F>(&self, f: F)
    where
        F: Fn(&RequestEvent<'_, E>) + Send + Sync + 'static,
    {
        *self.on_success.write() = Some(Arc::new(f));
    }

    /// Sets the hook to call when an operation returns an error.
    ///
    /// Fires for every error, including ones the classifier does not count
    /// as circuit failures.
    pub fn set_on_failure<F>(&self, f: F)
    where
        F: Fn(&RequestEvent<'_, E>) + Send + Sync + 'static,
    {
        *self.on_failure.write() = Some(Arc::new(f));
    }

    /// Removes every registered hook.
    pub fn clear(&self) {
        *self.on_state_change.write() = None;
        *self.on_success.write() = None;
        *self.on_failure.write() = None;
    }

    pub(crate) fn execute_state_change_hook(&self, event: &StateChangeEvent) {
        // Clone out of the lock so a hook may re-register hooks.
        let hook = self.on_state_change.read().clone();
        if let Some(hook) = hook {
            guarded("on_state_change", || hook(event));
        }
    }

    pub(crate) fn execute_success_hook(&self, event: &RequestEvent<'_, E>) {
        let hook = self.on_success.read().clone();
        if let Some(hook) = hook {
            guarded("on_success", || hook(event));
        }
    }

    pub(crate) fn execute_failure_hook(&self, event: &RequestEvent<'_, E>) {
        let hook = self.on_failure.read().clone();
        if let Some(hook) = hook {
            guarded("on_failure", || hook(event));
        }
    }
}

fn guarded(hook: &'static str, f: impl FnOnce()) {
    if panic::catch_unwind(AssertUnwindSafe(f)).is_err() {
        tracing::warn!(hook, "circuit breaker hook panicked; ignoring");
    }
}

impl<E> std::fmt::Debug for HookRegistry<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HookRegistry")
            .field("on_state_change", &self.on_state_change.read().is_some())
            .field("on_success", &self.on_success.read().is_some())
            .field("on_failure", &self.on_failure.read().is_some())
            .finish()
    }
}
