//! Measurement infrastructure: the in-process timing harness.
//!
//! This module provides:
//! - A wall-clock timer with marks taken immediately around the measured loop
//! - Single-pass and repeated-pass measurement of a candidate function
//! - `black_box` referencing of candidate results to defeat dead-code
//!   elimination

mod harness;
mod timer;

pub use harness::{measure, measure_repeated, measure_shaped};
pub use timer::{black_box, Timer};
