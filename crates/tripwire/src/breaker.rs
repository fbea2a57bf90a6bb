// Copyright (c) The Tripwire Project Authors.
// Licensed under the MIT License.

use std::time::Duration;

use crate::estimator::{ErrorRateEstimator, WindowSnapshot};
use crate::options::BreakerOptions;

/// Point-in-time view of both windows of a [`CircuitBreaker`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BreakerSnapshot {
    /// Counters of the stability-oriented long window.
    pub long_window: WindowSnapshot,
    /// Counters of the fast-reacting short window.
    pub short_window: WindowSnapshot,
}

/// Per-peer failure detector combining two error-rate estimators.
///
/// A `CircuitBreaker` watches the outcome and latency of every completed call
/// to one remote peer and produces a binary verdict: healthy or broken. It
/// carries no central coordination and no clock; everything is derived from
/// the local call stream.
///
/// Two independently tuned windows cover different failure shapes:
///
/// - the **short window** (default 100 samples, 5% tolerated error rate)
///   reacts quickly to a peer falling over,
/// - the **long window** (default 1000 samples, 3% tolerated error rate)
///   catches persistent low-grade degradation while riding out short bursts.
///
/// Either window tripping marks the peer unhealthy. A tripped breaker stays
/// broken until an external recovery mechanism, typically a periodic health
/// check that independently confirmed the peer is reachable, calls
/// [`reset`](Self::reset).
///
/// # Thread Safety
///
/// `CircuitBreaker` is `Send` and `Sync`; any number of threads may report
/// call outcomes concurrently while another thread resets. No operation
/// blocks. The statistics are best-effort rather than linearizable: each
/// counter is individually atomic, but fields are not updated as one
/// transaction, and `reset` may interleave with in-flight reports. The trip
/// decision tolerates that skew by design.
///
/// # Examples
///
/// ```rust
/// use std::time::Duration;
/// use tripwire::CircuitBreaker;
///
/// let breaker = CircuitBreaker::new();
///
/// // The RPC completion path reports every finished call.
/// let healthy = breaker.on_call_end(0, Duration::from_millis(12));
///
/// // The load balancer consults the verdict to keep or drop the peer.
/// assert!(healthy);
/// ```
#[derive(Debug)]
pub struct CircuitBreaker {
    long_window: ErrorRateEstimator,
    short_window: ErrorRateEstimator,
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::new()
    }
}

impl CircuitBreaker {
    /// Creates a breaker with the default [`BreakerOptions`].
    #[must_use]
    pub fn new() -> Self {
        Self::with_options(&BreakerOptions::default())
    }

    /// Creates a breaker from the given options. Options are read once; later
    /// changes to the options value do not affect this breaker.
    #[must_use]
    pub fn with_options(options: &BreakerOptions) -> Self {
        Self {
            long_window: ErrorRateEstimator::with_label(
                "long_window",
                options.get_long_window_size(),
                options.get_long_window_error_percent(),
                options.get_min_error_cost(),
                options.get_max_failed_latency_multiple(),
            ),
            short_window: ErrorRateEstimator::with_label(
                "short_window",
                options.get_short_window_size(),
                options.get_short_window_error_percent(),
                options.get_min_error_cost(),
                options.get_max_failed_latency_multiple(),
            ),
        }
    }

    /// Reports one completed call and returns the combined verdict.
    ///
    /// `error_code` follows the RPC convention of zero for success; `latency`
    /// is the duration of the completed call. Returns `true` only when every
    /// window that observed the call judged the peer healthy.
    ///
    /// The long window is evaluated first and the combination short-circuits:
    /// once the long window reports unhealthy for a call, the short window
    /// does not observe that call and its statistics stop advancing until
    /// [`reset`](Self::reset).
    #[must_use]
    pub fn on_call_end(&self, error_code: i32, latency: Duration) -> bool {
        self.long_window.on_call_end(error_code, latency) && self.short_window.on_call_end(error_code, latency)
    }

    /// Clears both windows and re-enters warm-up, long window first.
    ///
    /// Intended for an external recovery mechanism that has independently
    /// confirmed the peer is healthy again. The two resets are not atomic as
    /// a pair, and each is itself non-transactional across fields; concurrent
    /// [`on_call_end`](Self::on_call_end) calls may observe a partially reset
    /// breaker.
    pub fn reset(&self) {
        self.long_window.reset();
        self.short_window.reset();
    }

    /// Returns whether either window has latched into the broken state.
    #[must_use]
    pub fn is_broken(&self) -> bool {
        self.long_window.is_broken() || self.short_window.is_broken()
    }

    /// Returns a point-in-time view of both windows' counters.
    #[must_use]
    pub fn snapshot(&self) -> BreakerSnapshot {
        BreakerSnapshot {
            long_window: self.long_window.snapshot(),
            short_window: self.short_window.snapshot(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SUCCESS: i32 = 0;
    const FAILURE: i32 = 1;

    fn quick_options() -> BreakerOptions {
        BreakerOptions::default()
            .long_window_size(5)
            .long_window_error_percent(10)
            .short_window_size(100)
            .short_window_error_percent(5)
            .min_error_cost(Duration::from_micros(1))
    }

    #[test]
    fn both_windows_observe_calls_while_healthy() {
        let breaker = CircuitBreaker::with_options(&quick_options());

        for _ in 0..8 {
            assert!(breaker.on_call_end(SUCCESS, Duration::from_micros(100)));
        }

        let snapshot = breaker.snapshot();
        assert_eq!(snapshot.long_window.sample_count, 8);
        assert_eq!(snapshot.short_window.sample_count, 8);
    }

    #[test]
    fn long_window_trip_hides_calls_from_short_window() {
        let breaker = CircuitBreaker::with_options(&quick_options());

        // Warm up the long window (5 samples) while the short window (100) is
        // still warming.
        for _ in 0..6 {
            assert!(breaker.on_call_end(SUCCESS, Duration::from_micros(100)));
        }
        assert!(breaker.snapshot().long_window.warm_up_complete);
        assert!(!breaker.snapshot().short_window.warm_up_complete);

        // One over-budget failure trips the long window.
        assert!(!breaker.on_call_end(FAILURE, Duration::from_micros(10_000)));
        assert!(breaker.snapshot().long_window.broken);

        // From here on the short window no longer observes calls.
        let frozen = breaker.snapshot().short_window.sample_count;
        for _ in 0..10 {
            assert!(!breaker.on_call_end(SUCCESS, Duration::from_micros(100)));
        }
        assert_eq!(breaker.snapshot().short_window.sample_count, frozen);
    }

    #[test]
    fn reset_clears_both_windows() {
        let breaker = CircuitBreaker::with_options(&quick_options());
        for _ in 0..6 {
            assert!(breaker.on_call_end(SUCCESS, Duration::from_micros(100)));
        }
        assert!(!breaker.on_call_end(FAILURE, Duration::from_micros(10_000)));
        assert!(breaker.is_broken());

        breaker.reset();

        assert!(!breaker.is_broken());
        let snapshot = breaker.snapshot();
        assert_eq!(snapshot.long_window.sample_count, 0);
        assert_eq!(snapshot.short_window.sample_count, 0);
        assert!(!snapshot.long_window.warm_up_complete);
        assert!(!snapshot.short_window.warm_up_complete);
    }

    #[test]
    fn default_breaker_uses_documented_windows() {
        let breaker = CircuitBreaker::default();

        // 100 calls leave both windows still warming up (they complete one
        // call past their window size).
        for _ in 0..100 {
            assert!(breaker.on_call_end(FAILURE, Duration::from_micros(100)));
        }
        let snapshot = breaker.snapshot();
        assert!(!snapshot.short_window.warm_up_complete);
        assert!(!snapshot.long_window.warm_up_complete);
    }
}
