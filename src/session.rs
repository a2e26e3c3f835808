//! Interactive benchmark session: asynchronous requests, an append-only
//! results log, and auto-request deduplication.
//!
//! One worker thread owns measurement; requesters never block on it.
//! Results arrive out of request order and are prepended to the log, so
//! consumers always see the newest result first and never match results to
//! requests by index. The log is owned by the session and exposed to
//! renderers as a read-only snapshot.

use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use log::{debug, warn};
use rand::Rng;
use serde::Serialize;

use crate::candidates::{self, Candidate};
use crate::config::BenchConfig;
use crate::input;
use crate::measurement;
use crate::record::{MeasurementRecord, Provenance};

/// One benchmark request, as handed to the worker.
#[derive(Debug, Clone)]
pub struct BenchRequest {
    /// Origin of the request.
    pub source: Provenance,
    /// Candidate id to measure.
    pub test: String,
    /// Input size in bytes.
    pub length: usize,
    /// Iterations per pass.
    pub runs: u32,
}

/// One delivered benchmark result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BenchResult {
    /// The record emitted by the harness.
    pub record: MeasurementRecord,
    /// Mean per-call duration in microseconds.
    pub mean_us: f64,
    /// Mean scaled onto the configured reference axis.
    pub normalized_mean_us: f64,
}

/// A candidate that failed while being measured.
///
/// The failure is delivered to the requester like a result; prior records
/// are unaffected and the request is not retried.
#[derive(Debug, Clone)]
pub struct CandidateFailure {
    /// Origin of the failed request.
    pub source: Provenance,
    /// Candidate id that failed.
    pub test: String,
    /// Stringified panic payload.
    pub message: String,
}

impl fmt::Display for CandidateFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "candidate '{}' failed: {}", self.test, self.message)
    }
}

/// Errors raised when submitting a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestError {
    /// The candidate id is not registered.
    UnknownTest(String),
    /// The worker thread is gone; the session is unusable.
    WorkerGone,
}

impl fmt::Display for RequestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestError::UnknownTest(id) => write!(f, "unknown test id '{}'", id),
            RequestError::WorkerGone => write!(f, "benchmark worker has shut down"),
        }
    }
}

impl std::error::Error for RequestError {}

enum WorkerOutcome {
    Done(BenchResult),
    Failed(CandidateFailure),
}

/// An interactive benchmark session.
pub struct Session {
    config: BenchConfig,
    registry: Arc<Vec<Candidate>>,
    requests: Option<Sender<BenchRequest>>,
    outcomes: Receiver<WorkerOutcome>,
    results: Vec<BenchResult>,
    failures: Vec<CandidateFailure>,
    auto_in_flight: AtomicBool,
    worker: Option<JoinHandle<()>>,
}

impl Session {
    /// Start a session over the built-in candidate registry.
    pub fn start(config: BenchConfig) -> Self {
        Self::with_candidates(config, candidates::CANDIDATES.to_vec())
    }

    /// Start a session over a caller-supplied candidate set.
    ///
    /// # Panics
    ///
    /// Panics if `registry` is empty.
    pub fn with_candidates(config: BenchConfig, registry: Vec<Candidate>) -> Self {
        assert!(!registry.is_empty(), "registry must not be empty");
        let registry = Arc::new(registry);

        let (req_tx, req_rx) = mpsc::channel::<BenchRequest>();
        let (out_tx, out_rx) = mpsc::channel::<WorkerOutcome>();

        let worker_config = config.clone();
        let worker_registry = Arc::clone(&registry);
        let worker =
            std::thread::spawn(move || worker_loop(worker_config, worker_registry, req_rx, out_tx));

        Self {
            config,
            registry,
            requests: Some(req_tx),
            outcomes: out_rx,
            results: Vec::new(),
            failures: Vec::new(),
            auto_in_flight: AtomicBool::new(false),
            worker: Some(worker),
        }
    }

    /// The session's configuration.
    pub fn config(&self) -> &BenchConfig {
        &self.config
    }

    /// Submit a request. Returns as soon as the request is queued.
    ///
    /// Seed- and user-provenance requests are never gated; for gated auto
    /// requests use [`Session::request_auto`].
    pub fn request(
        &self,
        source: Provenance,
        test: &str,
        length: usize,
        runs: u32,
    ) -> Result<(), RequestError> {
        if !self.registry.iter().any(|c| c.id == test) {
            return Err(RequestError::UnknownTest(test.to_string()));
        }
        let req = BenchRequest {
            source,
            test: test.to_string(),
            length,
            runs,
        };
        debug!("queueing {:?} request for '{}'", source, test);
        self.requests
            .as_ref()
            .ok_or(RequestError::WorkerGone)?
            .send(req)
            .map_err(|_| RequestError::WorkerGone)
    }

    /// Submit an auto request unless one is already outstanding.
    ///
    /// Returns `Ok(true)` if dispatched, `Ok(false)` if deduplicated by the
    /// in-flight gate. The gate clears when the outstanding auto outcome is
    /// drained by [`Session::poll`] or [`Session::pump`].
    pub fn request_auto(&self, test: &str, length: usize, runs: u32) -> Result<bool, RequestError> {
        if self
            .auto_in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("auto request skipped, one already in flight");
            return Ok(false);
        }
        match self.request(Provenance::Auto, test, length, runs) {
            Ok(()) => Ok(true),
            Err(e) => {
                self.auto_in_flight.store(false, Ordering::Release);
                Err(e)
            }
        }
    }

    /// Dispatch one gated auto request with randomly picked parameters.
    pub fn auto_tick<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<bool, RequestError> {
        let test = self.registry[rng.random_range(0..self.registry.len())].id;
        let length = self.config.lengths[rng.random_range(0..self.config.lengths.len())];
        let runs = self.config.run_counts[rng.random_range(0..self.config.run_counts.len())];
        self.request_auto(test, length, runs)
    }

    /// Issue one seed-provenance warm-up request per candidate at the
    /// normalization reference point.
    pub fn seed(&self) -> Result<(), RequestError> {
        let length = self.config.reference_length();
        let runs = self.config.reference_runs();
        for c in self.registry.iter() {
            self.request(Provenance::Seed, c.id, length, runs)?;
        }
        Ok(())
    }

    /// The candidates this session can measure.
    pub fn candidates(&self) -> &[Candidate] {
        &self.registry
    }

    /// Drain delivered outcomes without blocking. Returns how many arrived.
    pub fn poll(&mut self) -> usize {
        let mut drained = 0;
        loop {
            match self.outcomes.try_recv() {
                Ok(outcome) => {
                    self.absorb(outcome);
                    drained += 1;
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        drained
    }

    /// Wait up to `timeout` for at least one outcome, then drain the rest
    /// without blocking. Returns how many arrived.
    pub fn pump(&mut self, timeout: Duration) -> usize {
        match self.outcomes.recv_timeout(timeout) {
            Ok(outcome) => {
                self.absorb(outcome);
                1 + self.poll()
            }
            Err(_) => 0,
        }
    }

    /// Read-only snapshot of delivered results, newest first.
    pub fn results(&self) -> &[BenchResult] {
        &self.results
    }

    /// Candidate failures delivered so far, oldest first.
    pub fn failures(&self) -> &[CandidateFailure] {
        &self.failures
    }

    fn absorb(&mut self, outcome: WorkerOutcome) {
        let source = match &outcome {
            WorkerOutcome::Done(result) => result.record.source,
            WorkerOutcome::Failed(failure) => failure.source,
        };
        if source == Provenance::Auto {
            self.auto_in_flight.store(false, Ordering::Release);
        }
        match outcome {
            WorkerOutcome::Done(result) => self.results.insert(0, result),
            WorkerOutcome::Failed(failure) => {
                warn!("{}", failure);
                self.failures.push(failure);
            }
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        // Closing the request channel ends the worker loop.
        self.requests.take();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

fn worker_loop(
    config: BenchConfig,
    registry: Arc<Vec<Candidate>>,
    requests: Receiver<BenchRequest>,
    outcomes: Sender<WorkerOutcome>,
) {
    while let Ok(req) = requests.recv() {
        let outcome = run_one(&config, &registry, &req);
        if outcomes.send(outcome).is_err() {
            break;
        }
    }
}

fn run_one(config: &BenchConfig, registry: &[Candidate], req: &BenchRequest) -> WorkerOutcome {
    // Request submission validated the id; a miss here means the registry
    // changed underneath us, which it cannot.
    let func = match registry.iter().find(|c| c.id == req.test) {
        Some(c) => c.func,
        None => {
            return WorkerOutcome::Failed(CandidateFailure {
                source: req.source,
                test: req.test.clone(),
                message: "candidate disappeared from registry".to_string(),
            })
        }
    };

    let input = input::generate(req.length);
    let shape = config.shape;
    let runs = req.runs;

    // Panics are caught only at this worker boundary; the harness itself
    // lets them unwind. The payload travels to the requester as a failure
    // outcome so other in-flight and prior records stay intact.
    let measured = catch_unwind(AssertUnwindSafe(|| {
        measurement::measure_shaped(func, &input, runs, shape)
    }));

    match measured {
        Ok(mean_us) => {
            let record = MeasurementRecord {
                test: req.test.clone(),
                length: req.length,
                runs: req.runs,
                duration_us: mean_us,
                source: req.source,
            };
            let normalized_mean_us = config.normalized_mean(mean_us, req.length, req.runs);
            WorkerOutcome::Done(BenchResult {
                record,
                mean_us,
                normalized_mean_us,
            })
        }
        Err(payload) => WorkerOutcome::Failed(CandidateFailure {
            source: req.source,
            test: req.test.clone(),
            message: panic_message(payload.as_ref()),
        }),
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "candidate panicked".to_string()
    }
}
