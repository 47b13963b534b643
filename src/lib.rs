//! # llm-circuit-breaker
//!
//! A sliding-window circuit breaker for async calls to LLM providers and other
//! unreliable remote services.
//!
//! The breaker tracks recent call outcomes in a window bounded by both count
//! and age. Once enough calls have been seen and the failure rate crosses a
//! threshold, it stops calling the dependency for a cooldown period, then lets
//! a few probe calls through to test recovery.
//!
//! ## States
//!
//! - **Closed**: Normal operation. Calls pass through and outcomes are recorded.
//! - **Open**: Calls are rejected immediately with a [`CircuitOpenError`].
//! - **Half-Open**: After the reset timeout, a limited number of probes are
//!   permitted. Enough successes close the circuit; a single failure reopens it.
//!
//! ## Basic Usage
//!
//! ```rust
//! use llm_circuit_breaker::{BreakerError, CircuitBreaker, LlmRequest, ProviderError};
//! use std::time::Duration;
//!
//! async fn complete(request: LlmRequest) -> Result<String, ProviderError> {
//!     Ok(format!("echo: {}", request.prompt))
//! }
//!
//! # async fn run() {
//! let breaker = CircuitBreaker::<ProviderError>::builder()
//!     .failure_threshold(50.0) // Trip when half of the tracked calls fail
//!     .minimum_requests(10)
//!     .reset_timeout(Duration::from_secs(30))
//!     .build();
//!
//! match breaker.execute(LlmRequest::new("hi"), complete).await {
//!     Ok(text) => println!("Call succeeded: {}", text),
//!     Err(BreakerError::Open(open)) => println!("Short-circuited: {}", open),
//!     Err(BreakerError::Operation(err)) => println!("Provider failed: {}", err),
//! }
//! # }
//! ```
//!
//! ## Failure classification
//!
//! By default an error counts against the dependency when its status code is
//! 500 or above, or when it has no status code at all (network errors,
//! timeouts). Client errors such as 400 or 429 show the provider is healthy
//! and are treated like successes. Error types opt in through
//! [`ProviderFault`]; anything else can be classified with
//! [`BreakerBuilder::is_failure`] or [`BreakerBuilder::build_with_classifier`].
//!
//! ## Logging
//!
//! Transitions and rejections are reported through [`tracing`]. The crate
//! never installs a subscriber.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

mod breaker;
mod classifier;
mod config;
mod error;
mod hook;
pub mod mock;
pub mod prelude;
mod provider;
mod state;
mod window;

// Re-exports
pub use breaker::CircuitBreaker;
pub use classifier::{is_server_fault, FailureClassifier, ProviderFault, StatusCodeClassifier};
pub use config::{BreakerBuilder, BreakerConfig};
pub use error::{BreakerError, BreakerResult, CircuitOpenError};
pub use hook::{HookRegistry, RequestEvent, StateChangeEvent};
pub use provider::{LlmRequest, LlmResponse, ProviderError, TokenUsage};
pub use state::State;
pub use window::{SlidingWindow, WindowStats};
