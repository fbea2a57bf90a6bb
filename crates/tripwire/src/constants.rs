// Copyright (c) The Tripwire Project Authors.
// Licensed under the MIT License.

use std::time::Duration;

/// Default sample size of the fast-reacting short window.
pub(crate) const DEFAULT_SHORT_WINDOW_SIZE: u64 = 100;

/// Default sample size of the stability-oriented long window.
pub(crate) const DEFAULT_LONG_WINDOW_SIZE: u64 = 1000;

/// Default maximum error rate tolerated by the short window, in percent.
pub(crate) const DEFAULT_SHORT_WINDOW_ERROR_PERCENT: u8 = 5;

/// Default maximum error rate tolerated by the long window, in percent.
pub(crate) const DEFAULT_LONG_WINDOW_ERROR_PERCENT: u8 = 3;

/// Default floor below which the decaying error cost snaps straight to zero,
/// instead of asymptotically approaching it forever.
pub(crate) const DEFAULT_MIN_ERROR_COST: Duration = Duration::from_micros(100);

/// Default cap on the cost charged for a single failed call, expressed as a
/// multiple of the average latency of successful calls.
pub(crate) const DEFAULT_MAX_FAILED_LATENCY_MULTIPLE: u32 = 2;

/// Upper bound of the configurable error percentages.
pub(crate) const MAX_ERROR_PERCENT: u8 = 99;

/// EPSILON drives the smoothing coefficient used by the EMAs:
/// `smoothing = EPSILON^(1 / window_size)`. The larger the EPSILON, the larger
/// the coefficient, which means early samples retain a larger share of the
/// average. For example, with `window_size = 100` an EPSILON of 0.1 yields a
/// smoothing coefficient of 0.9772; with `window_size = 1000` it yields 0.9977.
///
/// The same constant also provides the slack factor `(1 + EPSILON)` on the trip
/// threshold, so an error cost hovering right at the nominal maximum is not
/// tripped by rounding.
pub(crate) const EPSILON: f64 = 0.1;
