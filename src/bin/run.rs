//! escbench-run: run benchmarks and print the results table.
//!
//! By default every candidate is measured across the full parameter grid
//! with user provenance, after one seed pass per candidate to warm the
//! optimizer. With `--ticks` the driver instead dispatches gated
//! auto-provenance requests with randomized parameters, mirroring the
//! recurring-timer regime.

use std::fs::File;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use log::warn;

use escbench::candidates;
use escbench::config::{BenchConfig, MeasureShape};
use escbench::csv;
use escbench::record::Provenance;
use escbench::session::Session;
use escbench::table::{self, ResultFilter};

#[derive(Debug, Parser)]
#[command(name = "escbench-run", about = "Run escape benchmarks and print results")]
struct Args {
    /// Run this many randomized auto ticks instead of the grid sweep.
    #[arg(long, default_value_t = 0)]
    ticks: u32,

    /// Delay between auto ticks, in milliseconds.
    #[arg(long, default_value_t = 100)]
    interval_ms: u64,

    /// Independent passes per measurement (1 = single pass).
    #[arg(long, default_value_t = 1)]
    passes: u32,

    /// Write the raw records to this dataset file.
    #[arg(long)]
    csv: Option<PathBuf>,

    /// Show only rows for this candidate id.
    #[arg(long)]
    filter_test: Option<String>,

    /// Show only rows for this input length.
    #[arg(long)]
    filter_length: Option<usize>,

    /// Show only rows for this run count.
    #[arg(long)]
    filter_runs: Option<u32>,

    /// Show only rows with this provenance (seed, auto, user).
    #[arg(long)]
    filter_source: Option<String>,

    /// Sort rows by (test, length, runs) instead of newest first.
    #[arg(long)]
    sort: bool,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let shape = if args.passes > 1 {
        MeasureShape::Repeated { passes: args.passes }
    } else {
        MeasureShape::SinglePass
    };
    let config = BenchConfig::new().shape(shape);

    let mut session = Session::start(config.clone());

    // Warm-up pass, one seed request per candidate.
    session.seed().context("failed to queue seed requests")?;
    let mut expected = candidates::CANDIDATES.len();

    if args.ticks > 0 {
        let mut rng = rand::rng();
        for _ in 0..args.ticks {
            if session
                .auto_tick(&mut rng)
                .context("failed to queue auto tick")?
            {
                expected += 1;
            }
            std::thread::sleep(Duration::from_millis(args.interval_ms));
            session.poll();
        }
    } else {
        for candidate in candidates::CANDIDATES {
            for &length in &config.lengths {
                for &runs in &config.run_counts {
                    session
                        .request(Provenance::User, candidate.id, length, runs)
                        .context("failed to queue benchmark request")?;
                    expected += 1;
                }
            }
        }
    }

    // Drain until every queued request has delivered an outcome.
    while session.results().len() + session.failures().len() < expected {
        if session.pump(Duration::from_secs(10)) == 0 {
            warn!(
                "worker idle with {} of {} outcomes delivered",
                session.results().len() + session.failures().len(),
                expected
            );
            break;
        }
    }
    for failure in session.failures() {
        warn!("{}", failure);
    }

    let filter = ResultFilter {
        test: args.filter_test,
        length: args.filter_length,
        runs: args.filter_runs,
        source: args
            .filter_source
            .as_deref()
            .map(str::parse)
            .transpose()
            .context("invalid --filter-source value")?,
    };

    let mut rows = table::render(session.results(), &filter);
    if args.sort {
        table::sort_rows(&mut rows);
    }
    println!("{}", config.norm_label());
    print!("{}", table::format_table(&rows));

    if let Some(path) = args.csv {
        let records: Vec<_> = session
            .results()
            .iter()
            .map(|r| r.record.clone())
            .collect();
        let mut file = File::create(&path)
            .with_context(|| format!("failed to create {}", path.display()))?;
        csv::write_records(&mut file, &records)
            .with_context(|| format!("failed to write {}", path.display()))?;
    }
    Ok(())
}
