//! # escbench
//!
//! Compare candidate implementations of a hot string-escaping function
//! across input sizes and run counts: measure durations in-process,
//! aggregate samples into summary statistics, and stream datasets through
//! external rendering stages.
//!
//! ## Quick start
//!
//! ```no_run
//! use std::time::Duration;
//!
//! use escbench::config::BenchConfig;
//! use escbench::record::Provenance;
//! use escbench::session::Session;
//!
//! let mut session = Session::start(BenchConfig::default());
//! session.seed().unwrap();
//! session.request(Provenance::User, "char_match", 1000, 50).unwrap();
//! while session.pump(Duration::from_secs(1)) > 0 {}
//! for result in session.results() {
//!     println!("{}: {:.3} us", result.record.test, result.mean_us);
//! }
//! ```
//!
//! ## Offline aggregation
//!
//! Raw datasets (one duration per row) aggregate into per-(test, length)
//! statistics with fixed estimator and ordering rules so exported tables
//! stay comparable; see [`stats`] and [`csv`]. The [`pipeline`] module
//! chains the aggregation with external plot and post-processing commands
//! over OS pipes, joined through a single [`pipeline::Fence`].

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod candidates;
pub mod config;
pub mod csv;
pub mod input;
pub mod measurement;
pub mod pipeline;
pub mod record;
pub mod session;
pub mod stats;
pub mod table;

pub use config::{BenchConfig, MeasureShape};
pub use record::{MeasurementRecord, Provenance};
pub use session::{BenchResult, Session};
pub use stats::{GroupKey, GroupStats, SampleGroup, StatsError};
