//! Properties of the statistics aggregation engine.

use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;

use escbench::record::{MeasurementRecord, Provenance};
use escbench::stats::{
    self, group_records, mean_of, median_of_sorted, median_offset, GroupKey, SampleGroup,
    StatsError,
};

fn record(test: &str, length: usize, duration_us: f64) -> MeasurementRecord {
    MeasurementRecord {
        test: test.to_string(),
        length,
        runs: 10,
        duration_us,
        source: Provenance::Auto,
    }
}

// =============================================================================
// ORDER-STATISTIC LAWS
// =============================================================================

#[test]
fn median_offset_law_on_sorted_values() {
    let values = [10.0, 20.0, 30.0, 40.0, 50.0, 60.0, 70.0];
    let expected = [10.0, 20.0, 30.0, 30.0, 40.0, 40.0, 50.0];
    for size in 1..=7 {
        let prefix = &values[..size];
        let offset = median_offset(size);
        assert_eq!(
            median_of_sorted(prefix),
            expected[size - 1],
            "size {} offset {}",
            size,
            offset
        );
    }
}

#[test]
fn median_and_mean_bounded_by_min_and_max() {
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(99);
    for trial in 0..50 {
        let size = rng.random_range(2..40);
        let mut group = SampleGroup::new(GroupKey {
            test: "t".to_string(),
            length: 10,
        });
        for _ in 0..size {
            group.push(rng.random_range(0.0..1000.0));
        }
        let stats = group.stats().unwrap();
        assert!(
            stats.min <= stats.median && stats.median <= stats.max,
            "trial {}: median out of bounds",
            trial
        );
        assert!(
            stats.min <= stats.mean && stats.mean <= stats.max,
            "trial {}: mean out of bounds",
            trial
        );
    }
}

// =============================================================================
// ESTIMATORS
// =============================================================================

#[test]
fn single_sample_signals_insufficient_samples() {
    let groups = group_records(&[record("A", 10, 5.0)]);
    let err = groups.values().next().unwrap().stats().unwrap_err();
    assert!(matches!(
        err,
        StatsError::InsufficientSamples { got: 1, .. }
    ));
}

#[test]
fn scenario_three_records_one_group() {
    let records = [
        record("A", 10, 5.0),
        record("A", 10, 7.0),
        record("A", 10, 6.0),
    ];
    let ordered = stats::aggregate(&records).unwrap();
    assert_eq!(ordered.len(), 1);
    let (key, s) = &ordered[0];
    assert_eq!(key.test, "A");
    assert_eq!(key.length, 10);
    assert_eq!(s.size, 3);
    assert_eq!(s.mean, 6.0);
    assert_eq!(s.median, 6.0);
    assert_eq!(s.min, 5.0);
    assert_eq!(s.max, 7.0);
}

#[test]
fn sample_mean_duplicates_population_mean() {
    let records = [
        record("A", 10, 1.0),
        record("A", 10, 2.0),
        record("A", 10, 4.0),
        record("A", 10, 8.0),
    ];
    let ordered = stats::aggregate(&records).unwrap();
    let (_, s) = &ordered[0];
    assert_eq!(s.mean, s.sample_mean);
    // The stddevs differ through their divisors alone.
    assert!(s.sample_stddev > s.stddev);
}

#[test]
fn mean_uses_per_element_division() {
    // Per-element division stays finite even where sum-then-divide
    // overflows to infinity.
    let huge = f64::MAX / 2.0;
    let values = [huge, huge, huge, huge];
    assert!(mean_of(&values).is_finite());
}

// =============================================================================
// GROUPING
// =============================================================================

#[test]
fn grouping_is_by_test_and_length_only() {
    let records = [
        record("A", 10, 1.0),
        record("A", 100, 2.0),
        record("A", 10, 3.0),
    ];
    let groups = group_records(&records);
    assert_eq!(groups.len(), 2);

    let key = GroupKey {
        test: "A".to_string(),
        length: 10,
    };
    assert_eq!(groups.get(&key).map(|g| g.len()), Some(2));
}

#[test]
fn provenance_merges_into_one_group() {
    let mut seed = record("A", 10, 1.0);
    seed.source = Provenance::Seed;
    let mut user = record("A", 10, 2.0);
    user.source = Provenance::User;
    let auto = record("A", 10, 3.0);

    let groups = group_records([&seed, &user, &auto]);
    assert_eq!(groups.len(), 1);
    assert_eq!(groups.values().next().unwrap().len(), 3);
}
