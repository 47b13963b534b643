//! Core circuit breaker implementation.

use std::collections::VecDeque;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use parking_lot::{Mutex, MutexGuard};
use tokio::runtime::Handle;
use tokio::task::AbortHandle;
use tokio::time::Instant;

use crate::classifier::{FailureClassifier, ProviderFault, StatusCodeClassifier};
use crate::config::{BreakerBuilder, BreakerConfig};
use crate::error::{BreakerError, BreakerResult, CircuitOpenError};
use crate::hook::{HookRegistry, RequestEvent, StateChangeEvent};
use crate::state::{Circuit, State, Ticket, Transition};
use crate::window::WindowStats;

/// Everything guarded by the breaker's single lock.
struct Shared {
    circuit: Circuit,
    reset_timer: Option<AbortHandle>,
    disposed: bool,
    /// Transitions not yet handed to observers, oldest first.
    pending: VecDeque<Transition>,
    /// Set while one caller is delivering `pending`.
    announcing: bool,
}

/// Inner state of the circuit breaker, shared between clones.
struct BreakerInner<E> {
    shared: Mutex<Shared>,
    config: BreakerConfig,
    classifier: Arc<dyn FailureClassifier<E>>,
    hooks: Arc<HookRegistry<E>>,
}

/// A circuit breaker that wraps calls to one dependency to prevent cascading
/// failures.
///
/// Clones share the same circuit. Bookkeeping is serialized behind one lock
/// that is never held while the wrapped operation runs, so concurrent calls
/// only contend on the short pre- and post-call steps.
pub struct CircuitBreaker<E> {
    inner: Arc<BreakerInner<E>>,
}

/// A call admitted through the breaker. Dropping it unsettled (for example
/// when the caller's future is cancelled) gives a half-open probe slot back.
struct CallPermit<'a, E> {
    inner: &'a Arc<BreakerInner<E>>,
    ticket: Ticket,
    settled: bool,
}

impl<E> Drop for CallPermit<'_, E> {
    fn drop(&mut self) {
        if !self.settled {
            self.inner.shared.lock().circuit.release(self.ticket);
        }
    }
}

impl<E: ProviderFault + 'static> CircuitBreaker<E> {
    /// Creates a breaker that classifies errors by status code.
    ///
    /// # Panics
    ///
    /// Panics if the configuration is invalid; see [`BreakerConfig::assert_valid`].
    pub fn new(config: BreakerConfig) -> Self {
        config.assert_valid();
        Self::from_parts(config, Arc::new(StatusCodeClassifier), Arc::new(HookRegistry::new()))
    }
}

impl<E: 'static> CircuitBreaker<E> {
    pub(crate) fn from_parts(
        config: BreakerConfig,
        classifier: Arc<dyn FailureClassifier<E>>,
        hooks: Arc<HookRegistry<E>>,
    ) -> Self {
        let inner = BreakerInner {
            shared: Mutex::new(Shared {
                circuit: Circuit::new(&config),
                reset_timer: None,
                disposed: false,
                pending: VecDeque::new(),
                announcing: false,
            }),
            config,
            classifier,
            hooks,
        };

        Self {
            inner: Arc::new(inner),
        }
    }

    /// Creates a new builder for customizing a circuit breaker.
    pub fn builder() -> BreakerBuilder<E> {
        BreakerBuilder::new()
    }

    /// The configuration this breaker was built with.
    pub fn config(&self) -> &BreakerConfig {
        &self.inner.config
    }

    /// The hook registry; hooks may be replaced while the breaker is in use.
    pub fn hooks(&self) -> &HookRegistry<E> {
        &self.inner.hooks
    }

    /// Gets the current state, moving an expired OPEN circuit to HALF_OPEN.
    pub fn state(&self) -> State {
        let state = {
            let mut shared = self.inner.shared.lock();
            let now = Instant::now();
            if let Some(transition) = shared.circuit.expire(now) {
                self.inner.apply(&mut shared, transition, now);
            }
            shared.circuit.state()
        };

        self.inner.flush();
        state
    }

    /// Statistics over the live entries of the sliding window.
    pub fn stats(&self) -> WindowStats {
        self.inner.shared.lock().circuit.stats(Instant::now())
    }

    /// Executes an async operation wrapped by the circuit breaker.
    ///
    /// The operation is invoked at most once, and never while the circuit is
    /// open. Its error is returned unchanged in [`BreakerError::Operation`].
    pub async fn execute<R, T, F, Fut>(&self, request: R, operation: F) -> BreakerResult<T, E>
    where
        F: FnOnce(R) -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let permit = self.inner.pre_call()?;

        let start = Instant::now();
        let result = operation(request).await;
        let latency = start.elapsed();

        self.inner.post_call(permit, &result, latency);

        result.map_err(BreakerError::Operation)
    }

    /// Executes a blocking operation wrapped by the circuit breaker.
    ///
    /// Same semantics as [`execute`](Self::execute). Outside a tokio runtime
    /// no reset timer is armed; the OPEN timeout is then only observed by the
    /// next call or state read.
    pub fn call<R, T, F>(&self, request: R, operation: F) -> BreakerResult<T, E>
    where
        F: FnOnce(R) -> Result<T, E>,
    {
        let permit = self.inner.pre_call()?;

        let start = Instant::now();
        let result = operation(request);
        let latency = start.elapsed();

        self.inner.post_call(permit, &result, latency);

        result.map_err(BreakerError::Operation)
    }

    /// Cancels the reset timer and stops arming new ones. Idempotent.
    ///
    /// The breaker keeps working afterwards; OPEN timeouts are then observed
    /// lazily on the next call or state read.
    pub fn dispose(&self) {
        let mut shared = self.inner.shared.lock();
        shared.disposed = true;
        if let Some(timer) = shared.reset_timer.take() {
            timer.abort();
        }
    }
}

impl<E: 'static> BreakerInner<E> {
    /// Checks if a call is allowed based on the current state.
    fn pre_call(self: &Arc<Self>) -> Result<CallPermit<'_, E>, CircuitOpenError> {
        let admission = {
            let mut shared = self.shared.lock();
            let now = Instant::now();
            let (transition, admission) = shared.circuit.admit(now);
            if let Some(transition) = transition {
                self.apply(&mut shared, transition, now);
            }
            admission
        };

        self.flush();

        match admission {
            Ok(ticket) => Ok(CallPermit {
                inner: self,
                ticket,
                settled: false,
            }),
            Err(open) => {
                tracing::debug!(
                    remaining_ms = open.remaining.as_millis() as u64,
                    "circuit open; rejecting call"
                );
                Err(open)
            }
        }
    }

    /// Records the outcome of a call and applies any resulting transition.
    fn post_call<T>(self: &Arc<Self>, mut permit: CallPermit<'_, E>, result: &Result<T, E>, latency: Duration) {
        let failure = match result {
            Ok(_) => false,
            Err(error) => self.classifier.is_failure(error),
        };

        let state = {
            let mut shared = self.shared.lock();
            let now = Instant::now();
            let state = shared.circuit.state();
            let transition = shared.circuit.record(permit.ticket, failure, now);
            permit.settled = true;
            if let Some(transition) = transition {
                self.apply(&mut shared, transition, now);
            }
            state
        };
        drop(permit);

        let timestamp = SystemTime::now();
        match result {
            Ok(_) => self.hooks.execute_success_hook(&RequestEvent {
                state,
                latency,
                timestamp,
                error: None,
            }),
            Err(error) => self.hooks.execute_failure_hook(&RequestEvent {
                state,
                latency,
                timestamp,
                error: Some(error),
            }),
        }

        self.flush();
    }

    /// Queues a transition for observers and updates the reset timer. Runs
    /// under the lock.
    fn apply(self: &Arc<Self>, shared: &mut Shared, transition: Transition, now: Instant) {
        self.schedule(shared, &transition, now);
        shared.pending.push_back(transition);
    }

    /// Delivers queued transitions in the order they happened.
    ///
    /// Only one caller delivers at a time; anyone who queues a transition
    /// while another caller is delivering leaves it to that caller. Hooks run
    /// with the lock released, so they may call back into the breaker.
    fn flush(&self) {
        let mut shared = self.shared.lock();
        if shared.announcing {
            return;
        }
        shared.announcing = true;
        while let Some(transition) = shared.pending.pop_front() {
            MutexGuard::unlocked(&mut shared, || self.announce(&transition));
        }
        shared.announcing = false;
    }

    /// Re-arms or cancels the reset timer after a transition. Runs under the lock.
    fn schedule(self: &Arc<Self>, shared: &mut Shared, transition: &Transition, now: Instant) {
        if let Some(timer) = shared.reset_timer.take() {
            timer.abort();
        }
        if transition.to != State::Open || shared.disposed {
            return;
        }

        let Ok(runtime) = Handle::try_current() else {
            tracing::trace!("no tokio runtime; reset timeout will be observed lazily");
            return;
        };

        let breaker = Arc::downgrade(self);
        let generation = transition.generation;
        let deadline = now + self.config.reset_timeout;
        let task = runtime.spawn(async move {
            tokio::time::sleep_until(deadline).await;
            if let Some(inner) = breaker.upgrade() {
                inner.on_reset_timeout(generation);
            }
        });
        shared.reset_timer = Some(task.abort_handle());
    }

    fn on_reset_timeout(&self, generation: u64) {
        {
            let mut shared = self.shared.lock();
            // A lazy check or a newer episode got here first.
            if shared.circuit.generation() != generation {
                return;
            }
            shared.reset_timer = None;
            if let Some(transition) = shared.circuit.expire(Instant::now()) {
                // Leaving OPEN never arms a timer, so only queue it.
                shared.pending.push_back(transition);
            }
        }

        self.flush();
    }

    fn announce(&self, transition: &Transition) {
        match transition.to {
            State::Open => tracing::warn!(
                from = %transition.from,
                to = %transition.to,
                failure_rate = transition.failure_rate,
                reset_timeout_ms = self.config.reset_timeout.as_millis() as u64,
                "circuit opened"
            ),
            State::HalfOpen => tracing::info!(from = %transition.from, "circuit half-open; probing"),
            State::Closed => tracing::info!(
                from = %transition.from,
                failure_rate = transition.failure_rate,
                "circuit closed"
            ),
        }

        self.hooks.execute_state_change_hook(&StateChangeEvent {
            from: transition.from,
            to: transition.to,
            failure_rate: transition.failure_rate,
            timestamp: SystemTime::now(),
        });
    }
}

impl<E> Drop for BreakerInner<E> {
    fn drop(&mut self) {
        if let Some(timer) = self.shared.get_mut().reset_timer.take() {
            timer.abort();
        }
    }
}

// Allow cloning of circuit breakers - cheap because inner state is Arc'd
impl<E> Clone for CircuitBreaker<E> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<E> std::fmt::Debug for CircuitBreaker<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CircuitBreaker")
            .field("state", &self.inner.shared.lock().circuit.state())
            .field("config", &self.inner.config)
            .finish()
    }
}
