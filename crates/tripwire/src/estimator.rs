// Copyright (c) The Tripwire Project Authors.
// Licensed under the MIT License.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use crate::constants::{DEFAULT_MAX_FAILED_LATENCY_MULTIPLE, DEFAULT_MIN_ERROR_COST, EPSILON, MAX_ERROR_PERCENT};

/// Point-in-time view of one estimator's counters.
///
/// Snapshots are assembled from independently atomic fields, so two fields may
/// reflect different in-flight calls. That skew is inherent to the estimator's
/// lock-free design and also applies to the trip decision itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowSnapshot {
    /// Number of calls observed since construction or the last reset.
    pub sample_count: u64,
    /// Exponential moving average of the latency of successful calls.
    pub ema_latency: Duration,
    /// Accumulated cost attributed to failed calls, decayed by successes.
    pub ema_error_cost: Duration,
    /// Whether enough samples have been observed for verdicts to be trusted.
    pub warm_up_complete: bool,
    /// Whether the estimator has latched into the broken state.
    pub broken: bool,
}

/// Estimates the error rate of a peer over one timescale and decides whether
/// the aggregate cost of its failures has exceeded the configured budget.
///
/// The estimator folds the outcome and latency of every completed call into a
/// pair of exponential moving averages: the latency of successful calls, and a
/// synthetic "error cost" that failures add to and successes decay. A call
/// stream is judged unhealthy once the error cost outgrows the latency average
/// by more than the configured percentage.
///
/// Three behavioral phases follow from that:
///
/// - **Warm-up**: until `window_size` samples have been observed, every verdict
///   is `true`; the averages are not yet statistically meaningful.
/// - **Healthy**: verdicts reflect the error cost against the budget.
/// - **Broken**: the first unhealthy verdict latches. Every later call returns
///   `false` without touching the statistics, until [`reset`](Self::reset).
///
/// All state lives in individual atomics updated with compare-and-retry loops
/// or fetch-and-add; there is no lock, and no operation ever blocks. See the
/// crate documentation for the consistency model.
///
/// Most users want the dual-window [`CircuitBreaker`][crate::CircuitBreaker]
/// instead of driving a single estimator directly.
#[derive(Debug)]
pub struct ErrorRateEstimator {
    label: &'static str,
    window_size: u64,
    smoothing: f64,
    // window_size * (max_error_percent / 100) * (1 + EPSILON), derived once
    trip_budget_factor: f64,
    min_error_cost_us: u64,
    max_failed_latency_multiple: u64,
    warm_up_complete: AtomicBool,
    sample_count: AtomicU64,
    ema_latency_us: AtomicU64,
    ema_error_cost_us: AtomicU64,
    broken: AtomicBool,
}

impl ErrorRateEstimator {
    /// Creates an estimator over `window_size` samples that tolerates an error
    /// rate of `max_error_percent` (clamped to 0-99), with the default minimum
    /// error cost and failed-latency multiple.
    #[must_use]
    pub fn new(window_size: u64, max_error_percent: u8) -> Self {
        Self::with_limits(
            window_size,
            max_error_percent,
            DEFAULT_MIN_ERROR_COST,
            DEFAULT_MAX_FAILED_LATENCY_MULTIPLE,
        )
    }

    /// Creates an estimator with explicit cost limits.
    ///
    /// `min_error_cost` is the floor below which the decaying error cost snaps
    /// to zero; `max_failed_latency_multiple` caps how much a single slow
    /// failure can add to the error cost, as a multiple of the average latency
    /// of successful calls.
    #[must_use]
    pub fn with_limits(
        window_size: u64,
        max_error_percent: u8,
        min_error_cost: Duration,
        max_failed_latency_multiple: u32,
    ) -> Self {
        Self::with_label("window", window_size, max_error_percent, min_error_cost, max_failed_latency_multiple)
    }

    pub(crate) fn with_label(
        label: &'static str,
        window_size: u64,
        max_error_percent: u8,
        min_error_cost: Duration,
        max_failed_latency_multiple: u32,
    ) -> Self {
        let window_size = window_size.max(1);
        let max_error_percent = max_error_percent.min(MAX_ERROR_PERCENT);

        #[expect(clippy::cast_precision_loss, reason = "window sizes are far below 2^52")]
        let window = window_size as f64;

        Self {
            label,
            window_size,
            smoothing: EPSILON.powf(1.0 / window),
            trip_budget_factor: window * (f64::from(max_error_percent) / 100.0) * (1.0 + EPSILON),
            min_error_cost_us: saturating_micros(min_error_cost),
            max_failed_latency_multiple: u64::from(max_failed_latency_multiple),
            warm_up_complete: AtomicBool::new(false),
            sample_count: AtomicU64::new(0),
            ema_latency_us: AtomicU64::new(0),
            ema_error_cost_us: AtomicU64::new(0),
            broken: AtomicBool::new(false),
        }
    }

    /// Folds one completed call into the statistics and returns the verdict.
    ///
    /// `error_code` follows the RPC convention of zero for success; nonzero
    /// values are treated as failures and are otherwise uninterpreted.
    /// `latency` is the duration of the completed call.
    ///
    /// Returns `true` while the peer is considered healthy (including the
    /// whole warm-up phase) and `false` once it is not. A `false` verdict
    /// latches: the estimator stays broken until [`reset`](Self::reset).
    #[must_use]
    pub fn on_call_end(&self, error_code: i32, latency: Duration) -> bool {
        if self.broken.load(Ordering::Relaxed) {
            return false;
        }

        let latency_us = saturating_micros(latency);
        let healthy = if error_code == 0 {
            // Only successful calls shape the latency average.
            self.update_latency(latency_us);
            self.decay_error_cost();
            true
        } else {
            let ema_latency_us = self.ema_latency_us.load(Ordering::Relaxed);
            self.record_error_cost(latency_us, ema_latency_us)
        };

        let sample_count = self.sample_count.fetch_add(1, Ordering::Relaxed);
        let mut warm_up_complete = self.warm_up_complete.load(Ordering::Acquire);
        if !warm_up_complete && sample_count >= self.window_size {
            self.warm_up_complete.store(true, Ordering::Release);
            warm_up_complete = true;
            tracing::debug!(window = self.label, samples = sample_count, "warm-up complete");
        }

        if !warm_up_complete {
            // The averages are not trustworthy yet; keep accumulating but
            // never trip during warm-up.
            return true;
        }
        if !healthy {
            self.broken.store(true, Ordering::Relaxed);
            tracing::warn!(
                window = self.label,
                error_cost_us = self.ema_error_cost_us.load(Ordering::Relaxed),
                ema_latency_us = self.ema_latency_us.load(Ordering::Relaxed),
                "error budget exceeded, circuit broken"
            );
        }
        healthy
    }

    /// Returns the estimator to its initial warming-up state.
    ///
    /// Each field is cleared with an independent atomic store; a concurrent
    /// [`on_call_end`](Self::on_call_end) may observe a partially reset
    /// estimator. Callers that need a clean slate must tolerate that brief
    /// window.
    pub fn reset(&self) {
        self.warm_up_complete.store(false, Ordering::Relaxed);
        self.sample_count.store(0, Ordering::Relaxed);
        self.ema_error_cost_us.store(0, Ordering::Relaxed);
        self.ema_latency_us.store(0, Ordering::Relaxed);
        self.broken.store(false, Ordering::Relaxed);
        tracing::debug!(window = self.label, "estimator reset");
    }

    /// Returns whether the estimator has latched into the broken state.
    #[must_use]
    pub fn is_broken(&self) -> bool {
        self.broken.load(Ordering::Relaxed)
    }

    /// Returns a point-in-time view of the estimator's counters.
    #[must_use]
    pub fn snapshot(&self) -> WindowSnapshot {
        WindowSnapshot {
            sample_count: self.sample_count.load(Ordering::Relaxed),
            ema_latency: Duration::from_micros(self.ema_latency_us.load(Ordering::Relaxed)),
            ema_error_cost: Duration::from_micros(self.ema_error_cost_us.load(Ordering::Relaxed)),
            warm_up_complete: self.warm_up_complete.load(Ordering::Relaxed),
            broken: self.broken.load(Ordering::Relaxed),
        }
    }

    /// Blends `latency_us` into the latency average. The first sample is
    /// adopted as-is.
    fn update_latency(&self, latency_us: u64) {
        loop {
            let current = self.ema_latency_us.load(Ordering::Relaxed);
            let next = if current == 0 {
                latency_us
            } else {
                blend(current, latency_us, self.smoothing)
            };
            if self
                .ema_latency_us
                .compare_exchange_weak(current, next, Ordering::Relaxed, Ordering::Relaxed)
                .is_ok()
            {
                return;
            }
        }
    }

    /// Charges a failed call against the error budget and returns whether the
    /// accumulated cost is still within it.
    fn record_error_cost(&self, latency_us: u64, ema_latency_us: u64) -> bool {
        // A single slow failure may cost at most a fixed multiple of the
        // average latency, so one outlier cannot blow the whole budget.
        let cost = latency_us.min(ema_latency_us.saturating_mul(self.max_failed_latency_multiple));
        if cost == 0 {
            // No latency baseline yet, or a zero-latency failure: there is
            // nothing to charge, and the zero cost decays the accumulator the
            // same way a success would.
            self.decay_error_cost();
            return true;
        }
        let total = self.ema_error_cost_us.fetch_add(cost, Ordering::Relaxed).saturating_add(cost);

        #[expect(clippy::cast_precision_loss, reason = "comparison slack dwarfs the precision loss")]
        let within_budget = total as f64 <= ema_latency_us as f64 * self.trip_budget_factor;
        within_budget
    }

    /// Decays the error cost toward zero after a successful call, snapping to
    /// exactly zero once it falls below the configured floor.
    fn decay_error_cost(&self) {
        loop {
            let current = self.ema_error_cost_us.load(Ordering::Relaxed);
            if current == 0 {
                return;
            }
            let next = if current < self.min_error_cost_us {
                0
            } else {
                blend(current, 0, self.smoothing)
            };
            if self
                .ema_error_cost_us
                .compare_exchange_weak(current, next, Ordering::Relaxed, Ordering::Relaxed)
                .is_ok()
            {
                return;
            }
        }
    }
}

/// Exponentially weighted blend of `current` and `sample`, truncated back to
/// whole microseconds.
fn blend(current: u64, sample: u64, smoothing: f64) -> u64 {
    #[expect(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        reason = "microsecond magnitudes are far below 2^52 and the blend of nonnegative inputs is nonnegative"
    )]
    let next = (current as f64).mul_add(smoothing, sample as f64 * (1.0 - smoothing)) as u64;
    next
}

fn saturating_micros(duration: Duration) -> u64 {
    u64::try_from(duration.as_micros()).unwrap_or(u64::MAX)
}
