//! Sliding window of recent call outcomes.

use std::collections::VecDeque;
use std::time::Duration;

use tokio::time::Instant;

/// A single recorded call outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct WindowEntry {
    /// Whether the call counted as a success.
    pub(crate) success: bool,

    /// When the outcome was recorded.
    pub(crate) timestamp: Instant,
}

/// Aggregate statistics over the live entries of a window.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct WindowStats {
    /// Number of live entries.
    pub total: usize,

    /// Number of live failures.
    pub failures: usize,

    /// Number of live successes.
    pub successes: usize,

    /// Failure percentage in `0.0..=100.0`; `0.0` when the window is empty.
    pub failure_rate: f64,
}

/// Count- and age-bounded record of recent outcomes.
///
/// Both bounds are enforced on every read and write: entries older than
/// `max_age` are dropped first, then the oldest entries beyond `max_size`.
#[derive(Debug)]
pub struct SlidingWindow {
    entries: VecDeque<WindowEntry>,
    max_size: usize,
    max_age: Duration,
}

impl SlidingWindow {
    /// Creates an empty window.
    ///
    /// # Panics
    ///
    /// Panics if `max_size` is zero.
    pub fn new(max_size: usize, max_age: Duration) -> Self {
        assert!(max_size > 0, "sliding window size must be greater than zero");
        Self {
            entries: VecDeque::with_capacity(max_size.min(1024)),
            max_size,
            max_age,
        }
    }

    /// Records an outcome at the current instant.
    pub fn record(&mut self, success: bool) {
        self.record_at(success, Instant::now());
    }

    /// Returns statistics over the entries that are still live.
    pub fn stats(&mut self) -> WindowStats {
        self.stats_at(Instant::now())
    }

    /// Drops every entry.
    pub fn reset(&mut self) {
        self.entries.clear();
    }

    /// Number of entries currently held, without evicting.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the window holds no entries, without evicting.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn record_at(&mut self, success: bool, now: Instant) {
        self.entries.push_back(WindowEntry {
            success,
            timestamp: now,
        });
        self.evict(now);
    }

    pub(crate) fn stats_at(&mut self, now: Instant) -> WindowStats {
        self.evict(now);

        let total = self.entries.len();
        let failures = self.entries.iter().filter(|entry| !entry.success).count();
        let failure_rate = if total == 0 {
            0.0
        } else {
            failures as f64 / total as f64 * 100.0
        };

        WindowStats {
            total,
            failures,
            successes: total - failures,
            failure_rate,
        }
    }

    fn evict(&mut self, now: Instant) {
        // Entries are appended in clock order, so aged ones sit at the front.
        if let Some(cutoff) = now.checked_sub(self.max_age) {
            while let Some(entry) = self.entries.front() {
                if entry.timestamp < cutoff {
                    self.entries.pop_front();
                } else {
                    break;
                }
            }
        }

        while self.entries.len() > self.max_size {
            self.entries.pop_front();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const MINUTE: Duration = Duration::from_secs(60);

    #[test]
    fn computes_failure_rate() {
        let mut window = SlidingWindow::new(100, MINUTE);
        window.record(true);
        window.record(true);
        window.record(false);

        let stats = window.stats();
        assert_eq!(stats.total, 3);
        assert_eq!(stats.failures, 1);
        assert_eq!(stats.successes, 2);
        assert!((stats.failure_rate - 33.33).abs() < 0.1);
    }

    #[test]
    fn evicts_aged_entries() {
        let mut window = SlidingWindow::new(100, Duration::from_millis(50));
        let start = Instant::now();

        window.record_at(false, start);
        window.record_at(true, start + Duration::from_millis(80));

        let stats = window.stats_at(start + Duration::from_millis(80));
        assert_eq!(stats.total, 1);
        assert_eq!(stats.failures, 0);
    }

    #[test]
    fn reads_evict_without_writes() {
        let mut window = SlidingWindow::new(100, Duration::from_millis(50));
        let start = Instant::now();

        window.record_at(false, start);
        window.record_at(false, start + Duration::from_millis(10));

        assert_eq!(window.stats_at(start + Duration::from_millis(55)).total, 1);
        assert_eq!(window.stats_at(start + Duration::from_millis(61)).total, 0);
        assert!(window.is_empty());
    }

    #[test]
    fn trims_to_max_size() {
        let mut window = SlidingWindow::new(3, MINUTE);
        window.record(false);
        window.record(true);
        window.record(true);
        window.record(true);

        let stats = window.stats();
        assert_eq!(stats.total, 3);
        assert_eq!(stats.failures, 0);
    }

    #[test]
    fn empty_window_has_zero_rate() {
        let mut window = SlidingWindow::new(100, MINUTE);
        let stats = window.stats();
        assert_eq!(stats, WindowStats::default());
        assert_eq!(stats.failure_rate, 0.0);
    }

    #[test]
    fn reset_clears_entries() {
        let mut window = SlidingWindow::new(100, MINUTE);
        window.record(false);
        window.record(false);
        window.reset();
        assert_eq!(window.stats().total, 0);
    }

    #[test]
    #[should_panic(expected = "greater than zero")]
    fn zero_size_is_rejected() {
        let _ = SlidingWindow::new(0, MINUTE);
    }

    proptest! {
        #[test]
        fn bounds_hold_after_every_operation(
            max_size in 1usize..20,
            max_age_ms in 1u64..500,
            steps in proptest::collection::vec((any::<bool>(), 0u64..120, any::<bool>()), 1..200),
        ) {
            let max_age = Duration::from_millis(max_age_ms);
            let mut window = SlidingWindow::new(max_size, max_age);
            let mut now = Instant::now();

            for (success, advance_ms, read) in steps {
                now += Duration::from_millis(advance_ms);
                if read {
                    let stats = window.stats_at(now);
                    prop_assert_eq!(stats.total, stats.failures + stats.successes);
                    prop_assert!((0.0..=100.0).contains(&stats.failure_rate));
                } else {
                    window.record_at(success, now);
                }

                prop_assert!(window.len() <= max_size);
                for entry in &window.entries {
                    prop_assert!(now.duration_since(entry.timestamp) <= max_age);
                }
            }
        }
    }
}
