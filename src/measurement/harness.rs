//! Single-pass and repeated-pass measurement of candidate functions.
//!
//! The candidate is an opaque black box: the harness never inspects its
//! return value beyond routing it through [`black_box`], and it never
//! catches candidate panics. A panicking candidate unwinds through the
//! harness to the caller with no retry and no partial result.

use crate::config::MeasureShape;

use super::timer::{black_box, Timer};

/// Measure the mean per-call duration of `f` over one pass of `runs`
/// iterations against a single input.
///
/// Wall-clock marks are taken immediately before the first call and
/// immediately after the last; the result is `(t1 - t0) / runs` in
/// microseconds.
///
/// # Panics
///
/// Panics if `runs` is 0. Candidate panics propagate untouched.
pub fn measure<F, T>(mut f: F, input: &str, runs: u32) -> f64
where
    F: FnMut(&str) -> T,
{
    assert!(runs > 0, "runs must be > 0");

    let timer = Timer::new();
    let total_us = timer.elapsed_us(|| {
        for _ in 0..runs {
            black_box(f(input));
        }
    });
    total_us / f64::from(runs)
}

/// Measure `passes` independent single-pass means and average them.
///
/// The outer reduction is a plain arithmetic mean of per-pass means; it is
/// not routed through the statistics aggregator.
///
/// # Panics
///
/// Panics if `runs` or `passes` is 0. Candidate panics propagate untouched.
pub fn measure_repeated<F, T>(mut f: F, input: &str, runs: u32, passes: u32) -> f64
where
    F: FnMut(&str) -> T,
{
    assert!(passes > 0, "passes must be > 0");

    let mut total = 0.0;
    for _ in 0..passes {
        total += measure(&mut f, input, runs);
    }
    total / f64::from(passes)
}

/// Measure with the shape selected by configuration.
pub fn measure_shaped<F, T>(f: F, input: &str, runs: u32, shape: MeasureShape) -> f64
where
    F: FnMut(&str) -> T,
{
    match shape {
        MeasureShape::SinglePass => measure(f, input, runs),
        MeasureShape::Repeated { passes } => measure_repeated(f, input, runs, passes),
    }
}
