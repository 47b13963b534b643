//! Circuit breaker state machine implementation.

use std::fmt;
use std::time::Duration;

use tokio::time::Instant;

use crate::config::BreakerConfig;
use crate::error::CircuitOpenError;
use crate::window::{SlidingWindow, WindowStats};

/// Represents the possible states of a circuit breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum State {
    /// Circuit is closed and operations are allowed.
    Closed,

    /// Circuit is open and operations are rejected.
    Open,

    /// Circuit is allowing a limited number of operations to test recovery.
    HalfOpen,
}

impl State {
    /// Lowercase name, as used in log fields.
    pub fn as_str(&self) -> &'static str {
        match self {
            State::Closed => "closed",
            State::Open => "open",
            State::HalfOpen => "half-open",
        }
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A state change that actually happened.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Transition {
    pub(crate) from: State,
    pub(crate) to: State,
    pub(crate) failure_rate: f64,
    /// Episode entered by this transition.
    pub(crate) generation: u64,
}

/// Admission record for one call, tied to the episode it was admitted in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Ticket {
    generation: u64,
    probe: bool,
}

/// Breaker bookkeeping: state, window and counters.
///
/// Every transition starts a new episode by bumping `generation`. Outcomes of
/// calls admitted in an earlier episode are discarded, which keeps concurrent
/// completions from closing twice or undoing a reopen.
#[derive(Debug)]
pub(crate) struct Circuit {
    state: State,
    window: SlidingWindow,
    opened_at: Instant,
    last_failure_rate: f64,
    half_open_successes: u32,
    probes_in_flight: u32,
    generation: u64,
    config: BreakerConfig,
}

impl Circuit {
    pub(crate) fn new(config: &BreakerConfig) -> Self {
        Self {
            state: State::Closed,
            window: SlidingWindow::new(config.window_size, config.window_duration),
            opened_at: Instant::now(),
            last_failure_rate: 0.0,
            half_open_successes: 0,
            probes_in_flight: 0,
            generation: 0,
            config: config.clone(),
        }
    }

    pub(crate) fn state(&self) -> State {
        self.state
    }

    pub(crate) fn generation(&self) -> u64 {
        self.generation
    }

    pub(crate) fn stats(&mut self, now: Instant) -> WindowStats {
        self.window.stats_at(now)
    }

    /// Moves an expired OPEN circuit to HALF_OPEN.
    pub(crate) fn expire(&mut self, now: Instant) -> Option<Transition> {
        if self.state == State::Open
            && now.saturating_duration_since(self.opened_at) >= self.config.reset_timeout
        {
            return self.transition_to(State::HalfOpen, now);
        }
        None
    }

    /// Runs the lazy expiry check, then decides whether a call may proceed.
    pub(crate) fn admit(
        &mut self,
        now: Instant,
    ) -> (Option<Transition>, Result<Ticket, CircuitOpenError>) {
        let transition = self.expire(now);

        let admission = match self.state {
            State::Closed => Ok(Ticket {
                generation: self.generation,
                probe: false,
            }),
            State::Open => Err(self.open_error(now)),
            State::HalfOpen => {
                let admitted = self.half_open_successes + self.probes_in_flight;
                if admitted < self.config.half_open_max_attempts {
                    self.probes_in_flight += 1;
                    Ok(Ticket {
                        generation: self.generation,
                        probe: true,
                    })
                } else {
                    Err(self.open_error(now))
                }
            }
        };

        (transition, admission)
    }

    /// Gives back the probe slot of a call that never completed.
    pub(crate) fn release(&mut self, ticket: Ticket) {
        if ticket.probe && ticket.generation == self.generation {
            self.probes_in_flight = self.probes_in_flight.saturating_sub(1);
        }
    }

    /// Applies a completed call's outcome.
    pub(crate) fn record(&mut self, ticket: Ticket, failure: bool, now: Instant) -> Option<Transition> {
        if ticket.generation != self.generation {
            tracing::trace!(
                admitted = ticket.generation,
                current = self.generation,
                "discarding outcome from an earlier circuit episode"
            );
            return None;
        }

        match self.state {
            State::Closed => {
                self.window.record_at(!failure, now);
                if failure {
                    self.evaluate(now)
                } else {
                    None
                }
            }
            State::HalfOpen => {
                self.probes_in_flight = self.probes_in_flight.saturating_sub(1);
                if failure {
                    self.last_failure_rate = self.window.stats_at(now).failure_rate;
                    self.transition_to(State::Open, now)
                } else {
                    self.half_open_successes += 1;
                    if self.half_open_successes >= self.config.half_open_max_attempts {
                        self.transition_to(State::Closed, now)
                    } else {
                        None
                    }
                }
            }
            // OPEN admits nothing, so no ticket can match its episode.
            State::Open => None,
        }
    }

    fn evaluate(&mut self, now: Instant) -> Option<Transition> {
        let stats = self.window.stats_at(now);
        if stats.total >= self.config.minimum_requests
            && stats.failure_rate >= self.config.failure_threshold
        {
            self.last_failure_rate = stats.failure_rate;
            return self.transition_to(State::Open, now);
        }
        None
    }

    fn transition_to(&mut self, to: State, now: Instant) -> Option<Transition> {
        let from = self.state;
        if from == to {
            return None;
        }

        self.state = to;
        self.generation += 1;

        match to {
            State::Open => self.opened_at = now,
            State::HalfOpen => {
                self.half_open_successes = 0;
                self.probes_in_flight = 0;
            }
            State::Closed => {
                self.window.reset();
                self.half_open_successes = 0;
                self.probes_in_flight = 0;
            }
        }

        let failure_rate = if to == State::Open {
            self.last_failure_rate
        } else {
            self.window.stats_at(now).failure_rate
        };

        Some(Transition {
            from,
            to,
            failure_rate,
            generation: self.generation,
        })
    }

    fn open_error(&self, now: Instant) -> CircuitOpenError {
        let remaining = match self.state {
            State::Open => self
                .config
                .reset_timeout
                .saturating_sub(now.saturating_duration_since(self.opened_at)),
            State::Closed | State::HalfOpen => Duration::ZERO,
        };

        CircuitOpenError {
            reset_timeout: self.config.reset_timeout,
            failure_rate: self.last_failure_rate,
            remaining,
        }
    }
}
