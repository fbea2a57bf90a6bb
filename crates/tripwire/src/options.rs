// Copyright (c) The Tripwire Project Authors.
// Licensed under the MIT License.

use std::time::Duration;

use crate::constants::{
    DEFAULT_LONG_WINDOW_ERROR_PERCENT, DEFAULT_LONG_WINDOW_SIZE, DEFAULT_MAX_FAILED_LATENCY_MULTIPLE,
    DEFAULT_MIN_ERROR_COST, DEFAULT_SHORT_WINDOW_ERROR_PERCENT, DEFAULT_SHORT_WINDOW_SIZE, MAX_ERROR_PERCENT,
};

/// Configuration for a [`CircuitBreaker`][crate::CircuitBreaker].
///
/// Options are read once when the breaker is constructed; changing them later has
/// no effect on live breakers. All setters clamp their input into the valid range
/// rather than failing, so any options value can be turned into a breaker.
///
/// # Defaults
///
/// | Parameter | Default | Description |
/// |-----------|---------|-------------|
/// | Short window size | `100` samples | Sample span of the fast-reacting window |
/// | Long window size | `1000` samples | Sample span of the stability-oriented window |
/// | Short window error percent | `5` | Error rate (0-99) tolerated by the short window |
/// | Long window error percent | `3` | Error rate (0-99) tolerated by the long window |
/// | Minimum error cost | `100µs` | Decaying error cost below this snaps to zero |
/// | Max failed latency multiple | `2` | Cap on one failure's cost relative to average latency |
///
/// # Examples
///
/// ```rust
/// use std::time::Duration;
/// use tripwire::{BreakerOptions, CircuitBreaker};
///
/// let options = BreakerOptions::default()
///     .short_window_size(50)
///     .short_window_error_percent(10)
///     .min_error_cost(Duration::from_micros(250));
///
/// let breaker = CircuitBreaker::with_options(&options);
/// # let _breaker = breaker;
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct BreakerOptions {
    short_window_size: u64,
    long_window_size: u64,
    short_window_error_percent: u8,
    long_window_error_percent: u8,
    min_error_cost: Duration,
    max_failed_latency_multiple: u32,
}

impl Default for BreakerOptions {
    fn default() -> Self {
        Self {
            short_window_size: DEFAULT_SHORT_WINDOW_SIZE,
            long_window_size: DEFAULT_LONG_WINDOW_SIZE,
            short_window_error_percent: DEFAULT_SHORT_WINDOW_ERROR_PERCENT,
            long_window_error_percent: DEFAULT_LONG_WINDOW_ERROR_PERCENT,
            min_error_cost: DEFAULT_MIN_ERROR_COST,
            max_failed_latency_multiple: DEFAULT_MAX_FAILED_LATENCY_MULTIPLE,
        }
    }
}

impl BreakerOptions {
    /// Sets the sample size of the short window. Clamped to at least 1.
    #[must_use]
    pub fn short_window_size(mut self, samples: u64) -> Self {
        self.short_window_size = samples.max(1);
        self
    }

    /// Sets the sample size of the long window. Clamped to at least 1.
    #[must_use]
    pub fn long_window_size(mut self, samples: u64) -> Self {
        self.long_window_size = samples.max(1);
        self
    }

    /// Sets the maximum error rate tolerated by the short window. Clamped to 0-99.
    #[must_use]
    pub fn short_window_error_percent(mut self, percent: u8) -> Self {
        self.short_window_error_percent = percent.min(MAX_ERROR_PERCENT);
        self
    }

    /// Sets the maximum error rate tolerated by the long window. Clamped to 0-99.
    #[must_use]
    pub fn long_window_error_percent(mut self, percent: u8) -> Self {
        self.long_window_error_percent = percent.min(MAX_ERROR_PERCENT);
        self
    }

    /// Sets the floor below which the decaying error cost snaps to zero.
    #[must_use]
    pub fn min_error_cost(mut self, cost: Duration) -> Self {
        self.min_error_cost = cost;
        self
    }

    /// Sets the cap on a single failure's cost, as a multiple of the average
    /// latency of successful calls.
    #[must_use]
    pub fn max_failed_latency_multiple(mut self, multiple: u32) -> Self {
        self.max_failed_latency_multiple = multiple;
        self
    }

    /// Returns the sample size of the short window.
    #[must_use]
    pub fn get_short_window_size(&self) -> u64 {
        self.short_window_size
    }

    /// Returns the sample size of the long window.
    #[must_use]
    pub fn get_long_window_size(&self) -> u64 {
        self.long_window_size
    }

    /// Returns the maximum error rate tolerated by the short window.
    #[must_use]
    pub fn get_short_window_error_percent(&self) -> u8 {
        self.short_window_error_percent
    }

    /// Returns the maximum error rate tolerated by the long window.
    #[must_use]
    pub fn get_long_window_error_percent(&self) -> u8 {
        self.long_window_error_percent
    }

    /// Returns the floor below which the decaying error cost snaps to zero.
    #[must_use]
    pub fn get_min_error_cost(&self) -> Duration {
        self.min_error_cost
    }

    /// Returns the cap on a single failure's cost.
    #[must_use]
    pub fn get_max_failed_latency_multiple(&self) -> u32 {
        self.max_failed_latency_multiple
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let options = BreakerOptions::default();

        assert_eq!(options.get_short_window_size(), 100);
        assert_eq!(options.get_long_window_size(), 1000);
        assert_eq!(options.get_short_window_error_percent(), 5);
        assert_eq!(options.get_long_window_error_percent(), 3);
        assert_eq!(options.get_min_error_cost(), Duration::from_micros(100));
        assert_eq!(options.get_max_failed_latency_multiple(), 2);
    }

    #[test]
    fn error_percent_clamped_to_valid_range() {
        let options = BreakerOptions::default()
            .short_window_error_percent(150)
            .long_window_error_percent(255);

        assert_eq!(options.get_short_window_error_percent(), 99);
        assert_eq!(options.get_long_window_error_percent(), 99);
    }

    #[test]
    fn zero_window_size_clamped_to_one() {
        let options = BreakerOptions::default().short_window_size(0).long_window_size(0);

        assert_eq!(options.get_short_window_size(), 1);
        assert_eq!(options.get_long_window_size(), 1);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn options_round_trip_through_serde() {
        let options = BreakerOptions::default().short_window_size(42).long_window_error_percent(7);

        let encoded = serde_json::to_string(&options).expect("options must serialize");
        let decoded: BreakerOptions = serde_json::from_str(&encoded).expect("options must deserialize");

        assert_eq!(decoded, options);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let decoded: BreakerOptions = serde_json::from_str("{}").expect("empty object must deserialize");

        assert_eq!(decoded, BreakerOptions::default());
    }
}
