//! escbench-agg: aggregate a raw benchmark dataset into summary statistics.
//!
//! Reads the dataset from standard input and writes one statistics row per
//! (test, length) group to standard output, in CSV by default or JSON with
//! `--json`. Malformed rows are logged and skipped; structural corruption
//! aborts.

use std::io::{self, Write};

use anyhow::Context;
use clap::Parser;
use log::warn;

use escbench::csv::{self, StatsRow};
use escbench::record::Provenance;
use escbench::stats;

#[derive(Debug, Parser)]
#[command(name = "escbench-agg", about = "Aggregate a raw benchmark dataset")]
struct Args {
    /// Provenance to keep: seed, auto, user, or all.
    #[arg(long, default_value = "auto")]
    keep: String,

    /// Emit JSON instead of CSV.
    #[arg(long)]
    json: bool,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let keep = match args.keep.as_str() {
        "all" => None,
        other => Some(
            other
                .parse::<Provenance>()
                .context("invalid --keep value")?,
        ),
    };

    let ingestion =
        csv::read_records(io::stdin().lock(), keep).context("failed to read dataset")?;
    for issue in &ingestion.rejected {
        warn!("skipping bad row: {}", issue);
    }

    let groups = stats::aggregate(&ingestion.records).context("aggregation failed")?;

    let mut stdout = io::stdout().lock();
    if args.json {
        let rows: Vec<StatsRow> = groups
            .into_iter()
            .map(|(key, stats)| StatsRow {
                name: key.test,
                length: key.length,
                stats,
            })
            .collect();
        serde_json::to_writer_pretty(&mut stdout, &rows).context("failed to write JSON")?;
        writeln!(stdout)?;
    } else {
        csv::write_stats(&mut stdout, &groups).context("failed to write statistics")?;
    }
    Ok(())
}
