//! Statistics aggregation over duration samples.
//!
//! Measurement records are grouped by (test, length) and reduced to
//! population and sample estimators plus order statistics. The reduction
//! orders here are load-bearing: the mean divides each element by the count
//! before summing, and the median uses a fixed offset rule rather than the
//! textbook even-size average. Exported tables are compared across runs and
//! toolchains, so both orders must stay exactly as written.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::record::MeasurementRecord;

/// Grouping key for samples: candidate id and input length.
///
/// A composite key, not a concatenated string, so `("a-1", 2)` can never
/// collide with `("a", 12)`. Records with different run counts or
/// provenance still merge into the same group; normalization by
/// length and run count happens downstream, not at grouping time.
///
/// The derived ordering (test lexicographic, then length ascending) is the
/// output sort order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct GroupKey {
    /// Candidate id.
    pub test: String,
    /// Input size in bytes.
    pub length: usize,
}

impl GroupKey {
    /// Key for a record.
    pub fn of(record: &MeasurementRecord) -> Self {
        Self {
            test: record.test.clone(),
            length: record.length,
        }
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (length {})", self.test, self.length)
    }
}

/// All duration samples sharing one [`GroupKey`], in insertion order.
#[derive(Debug, Clone)]
pub struct SampleGroup {
    key: GroupKey,
    samples: Vec<f64>,
}

impl SampleGroup {
    /// Create an empty group for `key`.
    pub fn new(key: GroupKey) -> Self {
        Self {
            key,
            samples: Vec::new(),
        }
    }

    /// The group's key.
    pub fn key(&self) -> &GroupKey {
        &self.key
    }

    /// Append one duration sample.
    pub fn push(&mut self, duration_us: f64) {
        self.samples.push(duration_us);
    }

    /// The samples in insertion order.
    pub fn samples(&self) -> &[f64] {
        &self.samples
    }

    /// Number of samples in the group.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Whether the group holds no samples.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Compute the group's statistics from a sorted snapshot.
    ///
    /// The group's own insertion-ordered list is left untouched. Groups
    /// with fewer than two samples cannot produce a sample standard
    /// deviation and are rejected outright rather than yielding NaN.
    pub fn stats(&self) -> Result<GroupStats, StatsError> {
        let size = self.samples.len();
        if size < 2 {
            return Err(StatsError::InsufficientSamples {
                key: self.key.clone(),
                got: size,
            });
        }

        let mut sorted = self.samples.clone();
        sorted.sort_by(|a, b| a.total_cmp(b));

        let mean = mean_of(&sorted);
        let stddev = population_stddev(&sorted, mean);

        // The sample mean intentionally shares the population mean's
        // formula and divisor; only the stddev divisor differs.
        let sample_mean = mean_of(&sorted);
        let sample_stddev = sample_stddev_of(&sorted, sample_mean);

        Ok(GroupStats {
            size,
            mean,
            stddev,
            sample_mean,
            sample_stddev,
            median: median_of_sorted(&sorted),
            min: sorted[0],
            max: sorted[size - 1],
        })
    }
}

/// Derived statistics for one sample group.
///
/// Never persisted independently of its group; always recomputed on demand
/// from the current sample values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GroupStats {
    /// Number of samples at computation time.
    pub size: usize,
    /// Population mean.
    pub mean: f64,
    /// Population standard deviation (divisor `size`).
    pub stddev: f64,
    /// Sample mean (same formula as `mean`; see module docs).
    pub sample_mean: f64,
    /// Sample standard deviation (divisor `size - 1`).
    pub sample_stddev: f64,
    /// Median under the fixed offset rule.
    pub median: f64,
    /// Smallest sample.
    pub min: f64,
    /// Largest sample.
    pub max: f64,
}

/// Errors from statistics computation.
#[derive(Debug, Clone, PartialEq)]
pub enum StatsError {
    /// The group holds too few samples for the requested estimators.
    InsufficientSamples {
        /// The offending group.
        key: GroupKey,
        /// Samples present.
        got: usize,
    },
}

impl fmt::Display for StatsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatsError::InsufficientSamples { key, got } => write!(
                f,
                "insufficient samples for group {}: got {}, need at least 2",
                key, got
            ),
        }
    }
}

impl std::error::Error for StatsError {}

/// Mean with a fixed reduction order: each element is divided by the count
/// before summation.
pub fn mean_of(values: &[f64]) -> f64 {
    let size = values.len() as f64;
    values.iter().map(|v| v / size).sum()
}

/// Population standard deviation (divisor = count).
pub fn population_stddev(values: &[f64], mean: f64) -> f64 {
    let size = values.len() as f64;
    values
        .iter()
        .map(|v| (v - mean).powi(2) / size)
        .sum::<f64>()
        .sqrt()
}

/// Sample standard deviation with Bessel's correction (divisor = count − 1).
///
/// Callers must guarantee `values.len() >= 2`; [`SampleGroup::stats`]
/// enforces this with [`StatsError::InsufficientSamples`].
pub fn sample_stddev_of(values: &[f64], mean: f64) -> f64 {
    debug_assert!(values.len() >= 2, "sample stddev needs at least 2 values");
    let unbiased = (values.len() - 1) as f64;
    values
        .iter()
        .map(|v| (v - mean).powi(2) / unbiased)
        .sum::<f64>()
        .sqrt()
}

/// Index of the median in a sorted list of `size` elements.
///
/// `floor(size / 2)`, plus one when the size is odd and greater than 2.
/// Intentionally asymmetric from the conventional even-size average.
pub fn median_offset(size: usize) -> usize {
    size / 2 + usize::from(size > 2 && size % 2 == 1)
}

/// Median of an ascending-sorted, non-empty list under the offset rule.
pub fn median_of_sorted(sorted: &[f64]) -> f64 {
    sorted[median_offset(sorted.len())]
}

/// Group records by (test, length), preserving per-group insertion order.
pub fn group_records<'a, I>(records: I) -> BTreeMap<GroupKey, SampleGroup>
where
    I: IntoIterator<Item = &'a MeasurementRecord>,
{
    let mut groups: BTreeMap<GroupKey, SampleGroup> = BTreeMap::new();
    for record in records {
        let key = GroupKey::of(record);
        groups
            .entry(key.clone())
            .or_insert_with(|| SampleGroup::new(key))
            .push(record.duration_us);
    }
    groups
}

/// Group records and compute statistics for every group, in key order.
pub fn aggregate<'a, I>(records: I) -> Result<Vec<(GroupKey, GroupStats)>, StatsError>
where
    I: IntoIterator<Item = &'a MeasurementRecord>,
{
    group_records(records)
        .into_iter()
        .map(|(key, group)| group.stats().map(|stats| (key, stats)))
        .collect()
}
