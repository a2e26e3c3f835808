//! Interactive session behavior: async delivery, gating, normalization.

use std::time::Duration;

use escbench::candidates::{self, Candidate};
use escbench::config::BenchConfig;
use escbench::record::Provenance;
use escbench::session::{RequestError, Session};

const PUMP: Duration = Duration::from_secs(10);

fn drain(session: &mut Session, expected: usize) {
    while session.results().len() + session.failures().len() < expected {
        assert!(
            session.pump(PUMP) > 0,
            "worker idle before delivering {} outcomes",
            expected
        );
    }
}

#[test]
fn user_request_delivers_async_result() {
    let mut session = Session::start(BenchConfig::default());
    session
        .request(Provenance::User, "char_match", 100, 10)
        .unwrap();
    drain(&mut session, 1);

    let result = &session.results()[0];
    assert_eq!(result.record.test, "char_match");
    assert_eq!(result.record.length, 100);
    assert_eq!(result.record.runs, 10);
    assert_eq!(result.record.source, Provenance::User);
    assert!(result.mean_us.is_finite() && result.mean_us >= 0.0);
}

#[test]
fn normalized_mean_is_identity_at_reference_point() {
    let mut session = Session::start(BenchConfig::default());
    let length = session.config().reference_length();
    let runs = session.config().reference_runs();
    session
        .request(Provenance::User, "byte_lookup", length, runs)
        .unwrap();
    drain(&mut session, 1);

    let result = &session.results()[0];
    assert_eq!(result.normalized_mean_us, result.mean_us);
}

#[test]
fn results_are_prepended_newest_first() {
    let mut session = Session::start(BenchConfig::default());
    session
        .request(Provenance::User, "replace_chain", 10, 10)
        .unwrap();
    session
        .request(Provenance::User, "slice_scan", 10, 10)
        .unwrap();
    drain(&mut session, 2);

    // The worker delivers in request order; the log shows newest first.
    assert_eq!(session.results()[0].record.test, "slice_scan");
    assert_eq!(session.results()[1].record.test, "replace_chain");
}

#[test]
fn unknown_test_is_rejected_at_submission() {
    let session = Session::start(BenchConfig::default());
    let err = session
        .request(Provenance::User, "h9", 10, 10)
        .unwrap_err();
    assert_eq!(err, RequestError::UnknownTest("h9".to_string()));
}

#[test]
fn auto_requests_deduplicate_while_in_flight() {
    let mut session = Session::start(BenchConfig::default());

    assert!(session.request_auto("char_match", 10, 10).unwrap());
    // Second auto request is gated while the first is outstanding.
    assert!(!session.request_auto("char_match", 10, 10).unwrap());

    drain(&mut session, 1);
    // Draining the auto outcome reopens the gate.
    assert!(session.request_auto("char_match", 10, 10).unwrap());
    drain(&mut session, 2);
}

#[test]
fn user_requests_are_never_gated() {
    let mut session = Session::start(BenchConfig::default());
    assert!(session.request_auto("char_match", 10, 10).unwrap());
    // A user request passes while an auto request is still outstanding.
    session
        .request(Provenance::User, "char_match", 10, 10)
        .unwrap();
    drain(&mut session, 2);
}

#[test]
fn seed_warms_every_candidate_at_reference_point() {
    let mut session = Session::start(BenchConfig::default());
    session.seed().unwrap();
    drain(&mut session, candidates::CANDIDATES.len());

    let length = session.config().reference_length();
    for result in session.results() {
        assert_eq!(result.record.source, Provenance::Seed);
        assert_eq!(result.record.length, length);
    }
}

#[test]
fn candidate_panic_surfaces_as_failure_without_corrupting_results() {
    fn fine(s: &str) -> String {
        s.to_string()
    }
    fn explodes(_: &str) -> String {
        panic!("candidate exploded");
    }

    let registry = vec![
        Candidate {
            id: "fine",
            name: "fine",
            summary: "returns its input",
            func: fine,
        },
        Candidate {
            id: "explodes",
            name: "explodes",
            summary: "always panics",
            func: explodes,
        },
    ];
    let mut session = Session::with_candidates(BenchConfig::default(), registry);

    session.request(Provenance::User, "fine", 10, 10).unwrap();
    session
        .request(Provenance::User, "explodes", 10, 10)
        .unwrap();
    session.request(Provenance::User, "fine", 10, 10).unwrap();
    drain(&mut session, 3);

    assert_eq!(session.results().len(), 2);
    assert_eq!(session.failures().len(), 1);
    let failure = &session.failures()[0];
    assert_eq!(failure.test, "explodes");
    assert!(failure.message.contains("candidate exploded"));
}

#[test]
fn failed_auto_request_still_reopens_the_gate() {
    fn explodes(_: &str) -> String {
        panic!("boom");
    }
    let registry = vec![Candidate {
        id: "explodes",
        name: "explodes",
        summary: "always panics",
        func: explodes,
    }];
    let mut session = Session::with_candidates(BenchConfig::default(), registry);

    assert!(session.request_auto("explodes", 10, 10).unwrap());
    assert!(!session.request_auto("explodes", 10, 10).unwrap());
    drain(&mut session, 1);
    // The failure outcome cleared the in-flight flag.
    assert!(session.request_auto("explodes", 10, 10).unwrap());
    drain(&mut session, 2);
}

#[test]
fn auto_tick_picks_parameters_from_the_configured_lists() {
    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256PlusPlus;

    let mut rng = Xoshiro256PlusPlus::seed_from_u64(11);
    let mut session = Session::start(BenchConfig::default());
    assert!(session.auto_tick(&mut rng).unwrap());
    drain(&mut session, 1);

    let record = &session.results()[0].record;
    assert_eq!(record.source, Provenance::Auto);
    assert!(session.config().lengths.contains(&record.length));
    assert!(session.config().run_counts.contains(&record.runs));
}
