//! Mock LLM provider with configurable latency, token counts and error
//! injection, for exercising a breaker without a real backend.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::Instant;

use crate::provider::{LlmRequest, LlmResponse, ProviderError, TokenUsage};

/// One scripted call outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The call succeeds.
    Success,

    /// The call fails with this status code.
    Status(u16),
}

/// Configuration for the mock provider.
#[derive(Debug, Clone, PartialEq)]
pub struct MockProviderConfig {
    /// Simulated response latency.
    pub latency: Duration,

    /// Output tokens reported per response.
    pub tokens_per_response: u32,

    /// Probability (0.0 to 1.0) that a call fails.
    pub failure_rate: f64,

    /// Status code used for probabilistic failures.
    pub failure_status_code: u16,

    /// Message used instead of the generated one on failure.
    pub error_message: Option<String>,

    /// Scripted outcomes, consumed in order before falling back to
    /// `failure_rate`.
    pub error_sequence: Vec<Outcome>,

    /// Static response content.
    pub response_content: Option<String>,

    /// Model name reported in responses.
    pub model: String,
}

impl Default for MockProviderConfig {
    fn default() -> Self {
        Self {
            latency: Duration::from_millis(50),
            tokens_per_response: 100,
            failure_rate: 0.0,
            failure_status_code: 503,
            error_message: None,
            error_sequence: Vec::new(),
            response_content: None,
            model: "mock-model".to_string(),
        }
    }
}

struct MockState {
    config: MockProviderConfig,
    cursor: usize,
}

/// Mock provider; clones share configuration and counters.
#[derive(Clone)]
pub struct MockProvider {
    state: Arc<Mutex<MockState>>,
    calls: Arc<AtomicUsize>,
}

impl MockProvider {
    /// Creates a provider with the given configuration.
    pub fn new(config: MockProviderConfig) -> Self {
        Self {
            state: Arc::new(Mutex::new(MockState { config, cursor: 0 })),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Simulates a completion call.
    pub async fn call(&self, request: LlmRequest) -> Result<LlmResponse, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let start = Instant::now();

        let latency = self.state.lock().config.latency;
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }

        let mut state = self.state.lock();
        let outcome = state.next_outcome();
        let config = &state.config;

        if let Outcome::Status(status) = outcome {
            let message = config
                .error_message
                .clone()
                .unwrap_or_else(|| format!("Mock provider error (status {status})"));
            return Err(ProviderError::new(message, status));
        }

        let input = u32::try_from(request.prompt.chars().count().div_ceil(4)).unwrap_or(u32::MAX);
        let content = match &config.response_content {
            Some(content) => content.clone(),
            None => {
                let head: String = request.prompt.chars().take(50).collect();
                format!("Response to: {head}")
            }
        };

        Ok(LlmResponse {
            content,
            token_usage: TokenUsage {
                input,
                output: config.tokens_per_response,
                total: input.saturating_add(config.tokens_per_response),
            },
            latency: start.elapsed(),
            model: config.model.clone(),
        })
    }

    /// Number of calls made so far.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Resets the call counter and rewinds the scripted sequence.
    pub fn reset(&self) {
        self.calls.store(0, Ordering::SeqCst);
        self.state.lock().cursor = 0;
    }

    /// Changes the configuration in place.
    pub fn update_config(&self, f: impl FnOnce(&mut MockProviderConfig)) {
        f(&mut self.state.lock().config);
    }
}

impl MockState {
    fn next_outcome(&mut self) -> Outcome {
        // Scripted outcomes take priority over the probabilistic rate.
        if let Some(outcome) = self.config.error_sequence.get(self.cursor).copied() {
            self.cursor += 1;
            return outcome;
        }

        if fastrand::f64() < self.config.failure_rate {
            Outcome::Status(self.config.failure_status_code)
        } else {
            Outcome::Success
        }
    }
}

impl std::fmt::Debug for MockProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockProvider")
            .field("calls", &self.call_count())
            .field("config", &self.state.lock().config)
            .finish()
    }
}
