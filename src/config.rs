//! Configuration for circuit breakers.

use std::sync::Arc;
use std::time::Duration;

use crate::breaker::CircuitBreaker;
use crate::classifier::{FailureClassifier, ProviderFault, StatusCodeClassifier};
use crate::hook::{HookRegistry, RequestEvent, StateChangeEvent};

/// Tuning parameters, fixed for the lifetime of a breaker.
#[derive(Debug, Clone, PartialEq)]
pub struct BreakerConfig {
    /// Failure percentage (0-100) at or above which the circuit trips.
    pub failure_threshold: f64,

    /// How long the circuit stays open before probing.
    pub reset_timeout: Duration,

    /// Successful probes required to close the circuit again.
    pub half_open_max_attempts: u32,

    /// Outcomes the window must hold before the failure rate is evaluated.
    pub minimum_requests: usize,

    /// Maximum number of outcomes tracked.
    pub window_size: usize,

    /// Outcomes older than this are evicted.
    pub window_duration: Duration,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 50.0,
            reset_timeout: Duration::from_secs(30),
            half_open_max_attempts: 3,
            minimum_requests: 10,
            window_size: 100,
            window_duration: Duration::from_secs(60),
        }
    }
}

impl BreakerConfig {
    /// Checks the configuration invariants.
    ///
    /// # Panics
    ///
    /// Panics if `failure_threshold` is outside `0.0..=100.0`, or if
    /// `window_size` or `half_open_max_attempts` is zero.
    pub fn assert_valid(&self) {
        assert!(
            (0.0..=100.0).contains(&self.failure_threshold),
            "failure_threshold must be a percentage between 0 and 100, got {}",
            self.failure_threshold
        );
        assert!(self.window_size > 0, "window_size must be greater than zero");
        assert!(
            self.half_open_max_attempts > 0,
            "half_open_max_attempts must be greater than zero"
        );
    }
}

/// Builder for creating circuit breakers with custom configurations.
pub struct BreakerBuilder<E> {
    config: BreakerConfig,
    classifier: Option<Arc<dyn FailureClassifier<E>>>,
    hooks: HookRegistry<E>,
}

impl<E: 'static> Default for BreakerBuilder<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: 'static> BreakerBuilder<E> {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            config: BreakerConfig::default(),
            classifier: None,
            hooks: HookRegistry::new(),
        }
    }

    /// Replaces every tuning parameter at once.
    pub fn config(mut self, config: BreakerConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the failure percentage (0-100) that will trip the circuit.
    pub fn failure_threshold(mut self, percent: f64) -> Self {
        self.config.failure_threshold = percent;
        self
    }

    /// Sets how long the circuit stays open before probing.
    pub fn reset_timeout(mut self, timeout: Duration) -> Self {
        self.config.reset_timeout = timeout;
        self
    }

    /// Sets the number of successful probes required to close the circuit.
    pub fn half_open_max_attempts(mut self, attempts: u32) -> Self {
        self.config.half_open_max_attempts = attempts;
        self
    }

    /// Sets the minimum number of tracked calls before the failure rate counts.
    pub fn minimum_requests(mut self, minimum: usize) -> Self {
        self.config.minimum_requests = minimum;
        self
    }

    /// Sets the maximum number of outcomes tracked.
    pub fn window_size(mut self, size: usize) -> Self {
        self.config.window_size = size;
        self
    }

    /// Sets the age after which tracked outcomes are evicted.
    pub fn window_duration(mut self, duration: Duration) -> Self {
        self.config.window_duration = duration;
        self
    }

    /// Classifies operation errors with a closure.
    pub fn is_failure<F>(mut self, f: F) -> Self
    where
        F: Fn(&E) -> bool + Send + Sync + 'static,
    {
        self.classifier = Some(Arc::new(f));
        self
    }

    /// Classifies operation errors with a custom strategy.
    pub fn classifier<C: FailureClassifier<E>>(mut self, classifier: C) -> Self {
        self.classifier = Some(Arc::new(classifier));
        self
    }

    /// Sets a hook registry for the circuit breaker.
    pub fn hooks(mut self, hooks: HookRegistry<E>) -> Self {
        self.hooks = hooks;
        self
    }

    /// Registers the state transition hook.
    pub fn on_state_change<F>(self, f: F) -> Self
    where
        F: Fn(&StateChangeEvent) + Send + Sync + 'static,
    {
        self.hooks.set_on_state_change(f);
        self
    }

    /// Registers the success hook.
    pub fn on_success<F>(self, f: F) -> Self
    where
        F: Fn(&RequestEvent<'_, E>) + Send + Sync + 'static,
    {
        self.hooks.set_on_success(f);
        self
    }

    /// Registers the failure hook.
    pub fn on_failure<F>(self, f: F) -> Self
    where
        F: Fn(&RequestEvent<'_, E>) + Send + Sync + 'static,
    {
        self.hooks.set_on_failure(f);
        self
    }

    /// Builds a circuit breaker with the given classifier, for error types
    /// that carry no status code.
    ///
    /// # Panics
    ///
    /// Panics if the configuration is invalid; see [`BreakerConfig::assert_valid`].
    pub fn build_with_classifier<C: FailureClassifier<E>>(self, classifier: C) -> CircuitBreaker<E> {
        self.config.assert_valid();
        CircuitBreaker::from_parts(self.config, Arc::new(classifier), Arc::new(self.hooks))
    }
}

impl<E: ProviderFault + 'static> BreakerBuilder<E> {
    /// Builds a circuit breaker, classifying by status code unless a custom
    /// classifier was set.
    ///
    /// # Panics
    ///
    /// Panics if the configuration is invalid; see [`BreakerConfig::assert_valid`].
    pub fn build(self) -> CircuitBreaker<E> {
        self.config.assert_valid();
        let classifier: Arc<dyn FailureClassifier<E>> = match self.classifier {
            Some(classifier) => classifier,
            None => Arc::new(StatusCodeClassifier),
        };
        CircuitBreaker::from_parts(self.config, classifier, Arc::new(self.hooks))
    }
}
