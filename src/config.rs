//! Benchmark configuration: parameter space and normalization reference.

use serde::{Deserialize, Serialize};

/// How the harness turns one benchmark request into a duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MeasureShape {
    /// One pass of `runs` iterations producing one duration.
    SinglePass,
    /// `passes` independent passes of `runs` iterations each; the reported
    /// duration is the plain arithmetic mean of the per-pass means.
    Repeated {
        /// Number of independent passes.
        passes: u32,
    },
}

/// Configuration for a benchmark session.
///
/// The parameter lists are ordered smallest to largest; the last entry of
/// `lengths` and `run_counts` defines the normalization reference point, so
/// results measured at different scales can be compared on one axis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchConfig {
    /// Input sizes, in bytes, available to requests.
    pub lengths: Vec<usize>,

    /// Iteration counts available to requests.
    pub run_counts: Vec<u32>,

    /// Measurement shape applied to every request.
    pub shape: MeasureShape,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            lengths: vec![10, 100, 1000, 2000],
            run_counts: vec![10, 20, 30, 40, 50],
            shape: MeasureShape::SinglePass,
        }
    }
}

impl BenchConfig {
    /// Create the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the input-length list.
    ///
    /// # Panics
    ///
    /// Panics if `lengths` is empty or contains 0.
    pub fn lengths(mut self, lengths: Vec<usize>) -> Self {
        assert!(!lengths.is_empty(), "lengths must not be empty");
        assert!(lengths.iter().all(|&l| l > 0), "lengths must be > 0");
        self.lengths = lengths;
        self
    }

    /// Replace the run-count list.
    ///
    /// # Panics
    ///
    /// Panics if `run_counts` is empty or contains 0.
    pub fn run_counts(mut self, run_counts: Vec<u32>) -> Self {
        assert!(!run_counts.is_empty(), "run_counts must not be empty");
        assert!(run_counts.iter().all(|&n| n > 0), "run_counts must be > 0");
        self.run_counts = run_counts;
        self
    }

    /// Set the measurement shape.
    ///
    /// # Panics
    ///
    /// Panics if a repeated shape specifies 0 passes.
    pub fn shape(mut self, shape: MeasureShape) -> Self {
        if let MeasureShape::Repeated { passes } = shape {
            assert!(passes > 0, "passes must be > 0");
        }
        self.shape = shape;
        self
    }

    /// The input length anchoring the normalization reference.
    pub fn reference_length(&self) -> usize {
        // Lists are validated non-empty by the builders and the default.
        self.lengths[self.lengths.len() - 1]
    }

    /// The run count anchoring the normalization reference.
    pub fn reference_runs(&self) -> u32 {
        self.run_counts[self.run_counts.len() - 1]
    }

    /// Scale factor bringing a mean at (`length`, `runs`) onto the
    /// reference axis.
    ///
    /// At the reference point the factor is exactly 1.
    pub fn norm_coefficient(&self, length: usize, runs: u32) -> f64 {
        let numerator = self.reference_runs() as f64 * self.reference_length() as f64;
        numerator / (length as f64 * runs as f64)
    }

    /// Normalize a mean duration measured at (`length`, `runs`).
    pub fn normalized_mean(&self, mean_us: f64, length: usize, runs: u32) -> f64 {
        mean_us * self.norm_coefficient(length, runs)
    }

    /// Human-readable label for the normalized-duration column.
    pub fn norm_label(&self) -> String {
        format!(
            "Normalized mean duration (~\u{3bc}s/test for {} strings of length {}).",
            self.reference_runs(),
            self.reference_length()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_point_is_last_entries() {
        let config = BenchConfig::default();
        assert_eq!(config.reference_length(), 2000);
        assert_eq!(config.reference_runs(), 50);
    }

    #[test]
    fn norm_factor_is_one_at_reference() {
        let config = BenchConfig::default();
        let factor = config.norm_coefficient(2000, 50);
        assert_eq!(factor, 1.0);
        assert_eq!(config.normalized_mean(6.25, 2000, 50), 6.25);
    }

    #[test]
    fn norm_scales_smaller_points_up() {
        let config = BenchConfig::default();
        // 10x shorter strings, 5x fewer runs: factor 50.
        assert_eq!(config.norm_coefficient(200, 10), 50.0);
    }

    #[test]
    #[should_panic(expected = "lengths must not be empty")]
    fn empty_lengths_panics() {
        let _ = BenchConfig::new().lengths(vec![]);
    }

    #[test]
    #[should_panic(expected = "run_counts must be > 0")]
    fn zero_run_count_panics() {
        let _ = BenchConfig::new().run_counts(vec![10, 0]);
    }

    #[test]
    #[should_panic(expected = "passes must be > 0")]
    fn zero_passes_panics() {
        let _ = BenchConfig::new().shape(MeasureShape::Repeated { passes: 0 });
    }
}
