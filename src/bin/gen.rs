//! escbench-gen: render plot artifacts from a raw dataset.
//!
//! Each artifact streams the dataset through
//! [aggregate → plot command → minify-or-pass-through] over OS pipes. All
//! invocations share one fence; the command succeeds only if every
//! registered unit joined clean.

use std::fs;
use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::Parser;

use escbench::pipeline::{aggregate_stage, Fence, Pipeline, Stage};
use escbench::record::Provenance;

#[derive(Debug, Parser)]
#[command(name = "escbench-gen", about = "Render plot artifacts from a raw dataset")]
struct Args {
    /// Raw results dataset (CSV).
    results: PathBuf,

    /// Directory receiving the artifacts.
    #[arg(long, default_value = "out")]
    out_dir: PathBuf,

    /// Line-plot command producing sizes.svg on stdout.
    #[arg(long, default_value = "plot-line.py")]
    line_plot: PathBuf,

    /// Horizontal-bar-plot command producing times.svg on stdout.
    #[arg(long, default_value = "plot-barh.py")]
    barh_plot: PathBuf,

    /// SVG minifier; degrades to a pass-through when not installed.
    #[arg(long, default_value = "/usr/bin/minify")]
    minify: PathBuf,

    /// Provenance to aggregate: seed, auto, user, or all.
    #[arg(long, default_value = "auto")]
    keep: String,
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

    fs::create_dir_all(&args.out_dir)
        .with_context(|| format!("failed to create {}", args.out_dir.display()))?;

    let artifacts = [("sizes.svg", &args.line_plot), ("times.svg", &args.barh_plot)];

    let mut fence = Fence::new();
    for (dst_name, plot_cmd) in artifacts {
        let dst = args.out_dir.join(dst_name);
        let stages = vec![
            aggregate_stage(keep),
            Stage::command("plot", plot_cmd, vec![]),
            Stage::command_or_pass_through(
                "minify",
                &args.minify,
                // The minifier runs as an intermediate pipe, so it needs the
                // mime type spelled out rather than inferring it from a path.
                vec!["--mime".to_string(), "image/svg+xml".to_string()],
            ),
        ];
        Pipeline::new(stages)
            .spawn(&mut fence, &args.results, &dst)
            .with_context(|| format!("failed to wire pipeline for {}", dst.display()))?;
    }

    let report = fence.wait();
    if let Some(failure) = report.first_failure() {
        let detail = failure
            .result
            .as_ref()
            .err()
            .map(|e| e.to_string())
            .unwrap_or_default();
        bail!("stage '{}' failed: {}", failure.name, detail);
    }
    Ok(())
}
