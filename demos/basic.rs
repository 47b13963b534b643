use llm_circuit_breaker::mock::{MockProvider, MockProviderConfig, Outcome};
use llm_circuit_breaker::{BreakerError, CircuitBreaker, LlmRequest, ProviderError};
use std::time::Duration;

#[tokio::main]
async fn main() {
    // Create a circuit breaker tuned for a short demo
    let breaker = CircuitBreaker::<ProviderError>::builder()
        .failure_threshold(50.0) // 50% failure rate will trip circuit
        .minimum_requests(4) // Only judge once 4 calls are tracked
        .reset_timeout(Duration::from_secs(2)) // 2 second cooldown period
        .half_open_max_attempts(2) // Two good probes close it again
        .build();

    // A provider that degrades after a few calls, then recovers
    let mut script = vec![Outcome::Success; 3];
    script.extend([Outcome::Status(503); 5]);
    let provider = MockProvider::new(MockProviderConfig {
        latency: Duration::from_millis(20),
        error_sequence: script,
        ..MockProviderConfig::default()
    });

    println!("Circuit initial state: {}", breaker.state());

    for i in 1..=15 {
        println!("\nAttempt {}: ", i);

        let request = LlmRequest::new(format!("question #{i}"));
        match breaker.execute(request, |req| provider.call(req)).await {
            Ok(response) => println!("Call succeeded with result: {}", response.content),
            Err(BreakerError::Open(open)) => {
                println!("{}; waiting before retry...", open);
                tokio::time::sleep(Duration::from_millis(500)).await;
            }
            Err(BreakerError::Operation(err)) => println!("Call failed with error: {}", err),
        }

        let stats = breaker.stats();
        println!(
            "Current state: {}, failure rate: {:.1}% over {} calls",
            breaker.state(),
            stats.failure_rate,
            stats.total
        );

        tokio::time::sleep(Duration::from_millis(200)).await;
    }

    breaker.dispose();
}
