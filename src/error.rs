//! Error types for the circuit breaker library.

use std::error::Error;
use std::fmt::{self, Display, Formatter};
use std::time::Duration;

/// Result type for circuit breaker operations.
pub type BreakerResult<T, E> = Result<T, BreakerError<E>>;

/// Error type for circuit breaker operations.
#[derive(Debug)]
pub enum BreakerError<E> {
    /// The circuit rejected the call without invoking the operation.
    Open(CircuitOpenError),

    /// The operation ran and failed; the error is passed through unchanged.
    Operation(E),
}

/// Raised by the breaker itself when it short-circuits a call.
///
/// Never indicates that the protected dependency was contacted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CircuitOpenError {
    /// How long the circuit stays open before probing.
    pub reset_timeout: Duration,

    /// Failure percentage observed when the circuit tripped.
    pub failure_rate: f64,

    /// Time left until the circuit starts probing. Zero while half-open
    /// probes are saturated.
    pub remaining: Duration,
}

impl<E> BreakerError<E> {
    /// Returns true if the call was short-circuited.
    pub fn is_open(&self) -> bool {
        matches!(self, BreakerError::Open(_))
    }

    /// Returns the short-circuit details, if any.
    pub fn open_error(&self) -> Option<&CircuitOpenError> {
        match self {
            BreakerError::Open(err) => Some(err),
            BreakerError::Operation(_) => None,
        }
    }

    /// Returns the operation's own error, if the operation ran.
    pub fn into_operation(self) -> Option<E> {
        match self {
            BreakerError::Open(_) => None,
            BreakerError::Operation(err) => Some(err),
        }
    }
}

impl<E> From<CircuitOpenError> for BreakerError<E> {
    fn from(err: CircuitOpenError) -> Self {
        BreakerError::Open(err)
    }
}

impl<E> Display for BreakerError<E>
where
    E: Display,
{
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            BreakerError::Open(e) => Display::fmt(e, f),
            BreakerError::Operation(e) => Display::fmt(e, f),
        }
    }
}

impl Display for CircuitOpenError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Circuit is open (failure rate: {:.1}%, resets in {}ms)",
            self.failure_rate,
            self.remaining.as_millis()
        )
    }
}

impl<E: Error + 'static> Error for BreakerError<E> {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            BreakerError::Open(e) => Some(e),
            BreakerError::Operation(e) => Some(e),
        }
    }
}

impl Error for CircuitOpenError {}

#[cfg(test)]
mod tests {
    use super::*;

    fn open() -> CircuitOpenError {
        CircuitOpenError {
            reset_timeout: Duration::from_secs(30),
            failure_rate: 62.5,
            remaining: Duration::from_millis(1500),
        }
    }

    #[test]
    fn open_error_display() {
        assert_eq!(
            open().to_string(),
            "Circuit is open (failure rate: 62.5%, resets in 1500ms)"
        );
    }

    #[test]
    fn operation_error_is_passed_through() {
        let err: BreakerError<String> = BreakerError::Operation("upstream timed out".into());
        assert_eq!(err.to_string(), "upstream timed out");
        assert!(!err.is_open());
        assert!(err.open_error().is_none());
        assert_eq!(err.into_operation().as_deref(), Some("upstream timed out"));
    }

    #[test]
    fn open_variant_accessors() {
        let err: BreakerError<String> = open().into();
        assert!(err.is_open());
        assert_eq!(err.open_error().map(|e| e.failure_rate), Some(62.5));
        assert!(err.into_operation().is_none());
    }
}
