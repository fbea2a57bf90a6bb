// Copyright (c) The Tripwire Project Authors.
// Licensed under the MIT License.

//! Dual-window adaptive circuit breaking for RPC peers.
//!
//! This crate provides [`CircuitBreaker`], a per-peer failure detector for RPC
//! clients. The client reports the outcome and latency of every completed call
//! and gets back a binary verdict: keep routing traffic to this peer, or stop.
//! There is no central coordinator; every process judges its peers from the
//! statistics it observed itself.
//!
//! # How It Works
//!
//! A breaker owns two [`ErrorRateEstimator`] instances tuned to different
//! timescales. Each estimator maintains an exponential moving average of the
//! latency of successful calls and an "error cost" accumulator that failures
//! feed and successes decay. A failed call is charged the smaller of its own
//! latency and a fixed multiple of the average latency, so a single slow
//! failure cannot blow the budget on its own. When the accumulated cost
//! outgrows the tolerated percentage of the latency average, the estimator
//! latches into a broken state and stays there until explicitly reset.
//!
//! The short window (default 100 samples, 5% tolerated error rate) reacts
//! quickly to a peer falling over; the long window (default 1000 samples, 3%)
//! catches persistent low-grade degradation while riding out short bursts.
//! Either window tripping breaks the circuit.
//!
//! Verdicts are masked during a warm-up phase of one full window of samples,
//! so a breaker never trips on statistics it cannot trust yet.
//!
//! # What This Crate Does Not Do
//!
//! The breaker performs no network I/O, never retries a call, does not pick
//! which peer to call next, and keeps no state across process restarts. Those
//! concerns belong to the load balancer, the retry policy, and the health
//! checking mechanism that calls [`CircuitBreaker::reset`] once a broken peer
//! has demonstrably recovered.
//!
//! # Example
//!
//! ```rust
//! use std::time::Duration;
//! use tripwire::{BreakerOptions, CircuitBreaker};
//!
//! let breaker = CircuitBreaker::with_options(
//!     &BreakerOptions::default().short_window_size(50).short_window_error_percent(10),
//! );
//!
//! // The RPC completion path reports every finished call:
//! // a zero error code means success, anything else is a failure.
//! let healthy = breaker.on_call_end(0, Duration::from_millis(8));
//! assert!(healthy);
//!
//! // The peer-selection logic consults the verdict; once it turns false the
//! // peer should stop receiving traffic until a health check resets the
//! // breaker.
//! if !healthy {
//!     breaker.reset(); // normally driven by an external health check
//! }
//! ```
//!
//! # Concurrency Model
//!
//! All estimator state lives in individual atomics. Reporting a call is
//! lock-free: plain loads and stores, fetch-and-add where the update is
//! commutative, and compare-and-retry loops where the new value depends
//! nonlinearly on the old one. Nothing ever blocks.
//!
//! There is deliberately no cross-field consistency: two counters read
//! together may reflect different in-flight calls, and a reset interleaving
//! with concurrent reports may leave some fields cleared before others. EMA
//! convergence is insensitive to such small reorderings, so the trip decision
//! loses only precision, never soundness. The one strict guarantee is that a
//! latched broken state never clears itself; only [`CircuitBreaker::reset`]
//! does.

mod breaker;
mod constants;
mod estimator;
mod options;

pub use breaker::{BreakerSnapshot, CircuitBreaker};
pub use estimator::{ErrorRateEstimator, WindowSnapshot};
pub use options::BreakerOptions;
