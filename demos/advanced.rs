//! Advanced Circuit Breaker Example
//!
//! This example demonstrates:
//! 1. Structured logging of breaker transitions through `tracing`
//! 2. Using hooks for monitoring circuit breaker events
//! 3. A custom failure classifier for an error type without status codes
//! 4. Many concurrent callers sharing one breaker

use llm_circuit_breaker::{BreakerError, CircuitBreaker, HookRegistry, State};
use std::error::Error;
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

// Transport-level error with no status code
#[derive(Debug)]
enum TransportError {
    Timeout,
    Refused,
    BadInput(String),
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportError::Timeout => write!(f, "upstream timed out"),
            TransportError::Refused => write!(f, "connection refused"),
            TransportError::BadInput(why) => write!(f, "rejected input: {}", why),
        }
    }
}

impl Error for TransportError {}

// Simulates a backend that falls over for a while and then recovers
async fn embed(attempt: u32) -> Result<Vec<f32>, TransportError> {
    tokio::time::sleep(Duration::from_millis(10)).await;
    match attempt {
        0..=5 => Ok(vec![0.1, 0.2, 0.3]),
        6 => Err(TransportError::BadInput("empty text".into())),
        7..=14 => Err(if attempt % 2 == 0 {
            TransportError::Timeout
        } else {
            TransportError::Refused
        }),
        _ => Ok(vec![0.4, 0.5, 0.6]),
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "llm_circuit_breaker=debug".into()),
        )
        .init();

    println!("=== Advanced Circuit Breaker Example ===\n");

    // 1. Set up a hook registry for observability
    let hooks = HookRegistry::new();
    hooks.set_on_state_change(|event| {
        println!(
            "Circuit {} -> {} (failure rate {:.1}%)",
            event.from, event.to, event.failure_rate
        );
    });
    hooks.set_on_failure(|event: &llm_circuit_breaker::RequestEvent<'_, TransportError>| {
        if let Some(err) = event.error {
            println!("Call failed after {:?}: {}", event.latency, err);
        }
    });

    // 2. Bad input is the caller's fault, not the backend's
    let breaker = CircuitBreaker::<TransportError>::builder()
        .failure_threshold(50.0)
        .minimum_requests(6)
        .window_size(20)
        .reset_timeout(Duration::from_millis(300))
        .half_open_max_attempts(2)
        .hooks(hooks)
        .build_with_classifier(|err: &TransportError| !matches!(err, TransportError::BadInput(_)));

    // 3. Several callers hammer the same breaker
    let attempts = Arc::new(AtomicU32::new(0));
    for round in 0..6 {
        let mut tasks = Vec::new();
        for _ in 0..4 {
            let breaker = breaker.clone();
            let attempts = Arc::clone(&attempts);
            tasks.push(tokio::spawn(async move {
                breaker
                    .execute(attempts, |attempts| async move {
                        embed(attempts.fetch_add(1, Ordering::SeqCst)).await
                    })
                    .await
            }));
        }

        for task in tasks {
            match task.await.expect("caller panicked") {
                Ok(vector) => println!("round {round}: embedding of {} dims", vector.len()),
                Err(BreakerError::Open(open)) => println!("round {round}: {open}"),
                Err(BreakerError::Operation(err)) => println!("round {round}: error: {err}"),
            }
        }

        let state = breaker.state();
        println!("after round {round}: state={state}, stats={:?}\n", breaker.stats());
        if state == State::Open {
            tokio::time::sleep(Duration::from_millis(350)).await;
        }
    }

    println!("=== Example Completed ===");
}
