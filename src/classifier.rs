//! Failure classification for operation errors.
//!
//! Not every error means the dependency is unhealthy. A 4xx response shows the
//! provider is up and answering; only server faults and transport errors
//! should count against it.

use std::time::Duration;

/// Error metadata the default classifier and retry layers look at.
///
/// Both methods default to `None`, so an empty impl marks every error of the
/// type as a failure.
pub trait ProviderFault {
    /// Numeric status code reported by the provider, if any.
    fn status_code(&self) -> Option<u16> {
        None
    }

    /// Retry-after hint for collaborating retry logic. The breaker ignores it.
    fn retry_after(&self) -> Option<Duration> {
        None
    }
}

/// Decides whether an operation error counts as a circuit failure.
pub trait FailureClassifier<E>: Send + Sync + 'static {
    /// Returns true if `error` should count against the dependency.
    fn is_failure(&self, error: &E) -> bool;
}

impl<E, F> FailureClassifier<E> for F
where
    F: Fn(&E) -> bool + Send + Sync + 'static,
{
    fn is_failure(&self, error: &E) -> bool {
        self(error)
    }
}

/// Default classifier: server faults and errors without a status are failures.
///
/// Treating "no status" as a failure means bugs inside the wrapped operation
/// also count toward tripping. Install a custom classifier to change that.
#[derive(Debug, Clone, Copy, Default)]
pub struct StatusCodeClassifier;

impl<E: ProviderFault> FailureClassifier<E> for StatusCodeClassifier {
    fn is_failure(&self, error: &E) -> bool {
        is_server_fault(error.status_code())
    }
}

/// Status-code rule used by [`StatusCodeClassifier`].
pub fn is_server_fault(status_code: Option<u16>) -> bool {
    match status_code {
        Some(code) => code >= 500,
        // network errors, timeouts
        None => true,
    }
}
