//! Request, response and error types for LLM provider calls.

use std::error::Error;
use std::fmt::{self, Display, Formatter};
use std::time::Duration;

use crate::classifier::ProviderFault;

/// A completion request sent to a provider.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LlmRequest {
    /// Prompt text.
    pub prompt: String,

    /// Model override.
    pub model: Option<String>,

    /// Output token cap.
    pub max_tokens: Option<u32>,

    /// Sampling temperature.
    pub temperature: Option<f32>,
}

impl LlmRequest {
    /// Creates a request with only a prompt set.
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Self::default()
        }
    }
}

/// Token accounting for one completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TokenUsage {
    /// Prompt tokens.
    pub input: u32,

    /// Completion tokens.
    pub output: u32,

    /// `input + output`.
    pub total: u32,
}

/// A completion returned by a provider.
#[derive(Debug, Clone, PartialEq)]
pub struct LlmResponse {
    /// Generated text.
    pub content: String,

    /// Token accounting.
    pub token_usage: TokenUsage,

    /// Time the provider took to answer.
    pub latency: Duration,

    /// Model that produced the completion.
    pub model: String,
}

/// An error reported by a provider, with its HTTP-style status code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderError {
    message: String,
    status_code: u16,
    retry_after: Option<Duration>,
}

impl ProviderError {
    /// Creates a provider error.
    pub fn new(message: impl Into<String>, status_code: u16) -> Self {
        Self {
            message: message.into(),
            status_code,
            retry_after: None,
        }
    }

    /// Attaches a retry-after hint.
    pub fn with_retry_after(mut self, retry_after: Duration) -> Self {
        self.retry_after = Some(retry_after);
        self
    }

    /// The error message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The status code reported by the provider.
    pub fn status(&self) -> u16 {
        self.status_code
    }
}

impl Display for ProviderError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{} (status {})", self.message, self.status_code)
    }
}

impl Error for ProviderError {}

impl ProviderFault for ProviderError {
    fn status_code(&self) -> Option<u16> {
        Some(self.status_code)
    }

    fn retry_after(&self) -> Option<Duration> {
        self.retry_after
    }
}
