//! Re-exports common types for convenient usage.
//!
//! # Example
//! ```rust,no_run
//! use llm_circuit_breaker::prelude::*;
//!
//! let breaker: CircuitBreaker<ProviderError> = CircuitBreaker::new(BreakerConfig::default());
//! assert_eq!(breaker.state(), State::Closed);
//! ```

pub use crate::breaker::CircuitBreaker;
pub use crate::classifier::{FailureClassifier, ProviderFault};
pub use crate::config::{BreakerBuilder, BreakerConfig};
pub use crate::error::{BreakerError, BreakerResult, CircuitOpenError};
pub use crate::provider::{LlmRequest, LlmResponse, ProviderError};
pub use crate::state::State;
pub use crate::window::WindowStats;
