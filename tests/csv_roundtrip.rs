//! Delimited-text export/ingestion round trips.

use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;

use escbench::csv::{self, CsvError};
use escbench::record::{MeasurementRecord, Provenance};
use escbench::stats;

fn dataset(rng: &mut Xoshiro256PlusPlus) -> Vec<MeasurementRecord> {
    let mut records = Vec::new();
    for test in ["char_match", "byte_lookup"] {
        for length in [10usize, 100] {
            for _ in 0..5 {
                records.push(MeasurementRecord {
                    test: test.to_string(),
                    length,
                    runs: 10,
                    duration_us: rng.random_range(0.5..50.0),
                    source: Provenance::Auto,
                });
            }
        }
    }
    records
}

#[test]
fn stats_export_reparses_within_rounding() {
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(3);
    let records = dataset(&mut rng);
    let groups = stats::aggregate(&records).unwrap();

    let mut buf = Vec::new();
    csv::write_stats(&mut buf, &groups).unwrap();
    let rows = csv::read_stats(buf.as_slice()).unwrap();

    assert_eq!(rows.len(), groups.len());
    for (row, (key, s)) in rows.iter().zip(&groups) {
        assert_eq!(row.name, key.test);
        assert_eq!(row.length, key.length);
        assert_eq!(row.stats.size, s.size);
        // 3-decimal output admits half-a-thousandth of rounding error.
        for (got, want) in [
            (row.stats.mean, s.mean),
            (row.stats.stddev, s.stddev),
            (row.stats.sample_mean, s.sample_mean),
            (row.stats.sample_stddev, s.sample_stddev),
            (row.stats.median, s.median),
            (row.stats.min, s.min),
            (row.stats.max, s.max),
        ] {
            assert!((got - want).abs() <= 0.0005, "got {}, want {}", got, want);
        }
    }
}

#[test]
fn stats_rows_come_out_in_key_order() {
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(5);
    let records = dataset(&mut rng);
    let groups = stats::aggregate(&records).unwrap();

    let mut buf = Vec::new();
    csv::write_stats(&mut buf, &groups).unwrap();
    let rows = csv::read_stats(buf.as_slice()).unwrap();

    let keys: Vec<_> = rows.iter().map(|r| (r.name.clone(), r.length)).collect();
    let mut sorted = keys.clone();
    sorted.sort();
    assert_eq!(keys, sorted);
}

#[test]
fn quoted_test_ids_survive_both_tables() {
    let awkward = "esc,\"v2\"";
    let records = vec![
        MeasurementRecord {
            test: awkward.to_string(),
            length: 10,
            runs: 10,
            duration_us: 1.0,
            source: Provenance::Auto,
        },
        MeasurementRecord {
            test: awkward.to_string(),
            length: 10,
            runs: 10,
            duration_us: 3.0,
            source: Provenance::Auto,
        },
    ];

    let mut raw = Vec::new();
    csv::write_records(&mut raw, &records).unwrap();
    let back = csv::read_records(raw.as_slice(), None).unwrap();
    assert_eq!(back.records[0].test, awkward);

    let groups = stats::aggregate(&back.records).unwrap();
    let mut table = Vec::new();
    csv::write_stats(&mut table, &groups).unwrap();
    let rows = csv::read_stats(table.as_slice()).unwrap();
    assert_eq!(rows[0].name, awkward);
}

#[test]
fn ingestion_keeps_only_requested_provenance() {
    let input = "\
source,test,length,runs,duration
seed,char_match,2000,50,4.0
auto,char_match,10,10,1.0
user,char_match,10,10,2.0
auto,char_match,10,10,3.0
";
    let ingestion = csv::read_records(input.as_bytes(), Some(Provenance::Auto)).unwrap();
    assert_eq!(ingestion.records.len(), 2);
    assert_eq!(ingestion.filtered_out, 2);
    assert!(ingestion.rejected.is_empty());
    assert!(ingestion
        .records
        .iter()
        .all(|r| r.source == Provenance::Auto));
}

#[test]
fn bad_rows_are_reported_but_not_fatal() {
    let input = "\
source,test,length,runs,duration
auto,ok,10,10,1.0
auto,bad,ten,10,1.0
elsewhere,bad,10,10,1.0
auto,ok,10,10,2.0
";
    let ingestion = csv::read_records(input.as_bytes(), None).unwrap();
    assert_eq!(ingestion.records.len(), 2);
    assert_eq!(ingestion.rejected.len(), 2);
    assert_eq!(ingestion.rejected[0].line, 3);
    assert_eq!(ingestion.rejected[1].line, 4);
}

#[test]
fn unterminated_quote_aborts_ingestion() {
    let input = "\
source,test,length,runs,duration
auto,\"broken,10,10,1.0
auto,fine,10,10,1.0
";
    let err = csv::read_records(input.as_bytes(), None).unwrap_err();
    assert!(matches!(err, CsvError::UnterminatedQuote { .. }));
}
