// Copyright (c) The Tripwire Project Authors.
// Licensed under the MIT License.

use std::hint::black_box;
use std::time::Duration;

use criterion::{Criterion, criterion_group, criterion_main};
use tripwire::{BreakerOptions, CircuitBreaker};

const TYPICAL_LATENCY: Duration = Duration::from_micros(250);

pub fn entry(c: &mut Criterion) {
    let mut group = c.benchmark_group("breaker");

    // Success hot path on a warmed-up breaker.
    let breaker = warmed_up_breaker();
    group.bench_function("success", |b| {
        b.iter(|| black_box(breaker.on_call_end(0, TYPICAL_LATENCY)));
    });

    // Mixed traffic: one failure in ten, budgets generous enough that the
    // breaker never trips during the measurement.
    let breaker = warmed_up_breaker();
    let mut call = 0_u64;
    group.bench_function("mixed", |b| {
        b.iter(|| {
            call = call.wrapping_add(1);
            let error_code = i32::from(call % 10 == 0);
            black_box(breaker.on_call_end(error_code, TYPICAL_LATENCY))
        });
    });

    // Broken fast path: a latched breaker answers from a single atomic load.
    let breaker = CircuitBreaker::with_options(
        &BreakerOptions::default()
            .long_window_size(10)
            .long_window_error_percent(1)
            .min_error_cost(Duration::from_micros(1)),
    );
    for _ in 0..=10 {
        let _ = breaker.on_call_end(0, TYPICAL_LATENCY);
    }
    let _ = breaker.on_call_end(1, Duration::from_micros(10_000));
    assert!(breaker.is_broken());
    group.bench_function("broken", |b| {
        b.iter(|| black_box(breaker.on_call_end(0, TYPICAL_LATENCY)));
    });

    group.finish();
}

fn warmed_up_breaker() -> CircuitBreaker {
    let breaker = CircuitBreaker::with_options(
        &BreakerOptions::default()
            .short_window_error_percent(50)
            .long_window_error_percent(50),
    );
    for _ in 0..=1000 {
        let _ = breaker.on_call_end(0, TYPICAL_LATENCY);
    }
    breaker
}

criterion_group!(benches, entry);
criterion_main!(benches);
