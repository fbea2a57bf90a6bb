// Copyright (c) The Tripwire Project Authors.
// Licensed under the MIT License.

//! Simulates an RPC client deciding peer eligibility from breaker verdicts.
//!
//! The simulated peer serves three phases of traffic: normal operation, an
//! outage where most calls fail, and recovery after an external health check
//! resets the breaker. The load balancer's only input is the boolean verdict
//! returned for each completed call.

use std::time::Duration;

use tripwire::{BreakerOptions, CircuitBreaker};

const NORMAL_LATENCY: Duration = Duration::from_micros(800);
const TIMEOUT_LATENCY: Duration = Duration::from_millis(150);

fn main() {
    tracing_subscriber::fmt().init();

    // Small windows so the simulation shows the full lifecycle in a few
    // hundred calls. Production deployments keep the larger defaults.
    let options = BreakerOptions::default()
        .short_window_size(20)
        .short_window_error_percent(10)
        .long_window_size(100)
        .long_window_error_percent(5);
    let breaker = CircuitBreaker::with_options(&options);

    println!("phase 1: healthy traffic");
    let eligible = drive(&breaker, 200, |_| Outcome::Success);
    println!("  peer eligible after 200 clean calls: {eligible}\n");

    println!("phase 2: outage, 60% of calls time out");
    let eligible = drive(&breaker, 100, |call| {
        if call % 5 < 3 { Outcome::TimedOut } else { Outcome::Success }
    });
    println!("  peer eligible during outage: {eligible}");
    println!("  breaker snapshot: {:#?}\n", breaker.snapshot());

    println!("phase 3: health check confirms recovery, breaker reset");
    breaker.reset();
    let eligible = drive(&breaker, 200, |_| Outcome::Success);
    println!("  peer eligible after recovery: {eligible}");
}

enum Outcome {
    Success,
    TimedOut,
}

/// Feeds `calls` outcomes into the breaker and returns the final verdict,
/// the way a load balancer would track continued eligibility of the peer.
fn drive(breaker: &CircuitBreaker, calls: u64, outcome: impl Fn(u64) -> Outcome) -> bool {
    let mut eligible = true;
    for call in 0..calls {
        eligible = match outcome(call) {
            Outcome::Success => breaker.on_call_end(0, NORMAL_LATENCY),
            Outcome::TimedOut => breaker.on_call_end(1008, TIMEOUT_LATENCY),
        };
    }
    eligible
}
