//! Filtered tabular rendering of live benchmark results.
//!
//! The table shows one row per delivered result, newest first, with
//! equality filters over the record fields. Numeric cells render with three
//! fractional digits; the underlying results keep full precision.

use colored::Colorize;

use crate::record::Provenance;
use crate::session::BenchResult;

/// Equality filters over result rows.
///
/// `None` in a field means "no constraint"; a set field admits only rows
/// whose record matches it exactly.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultFilter {
    /// Required candidate id, if any.
    pub test: Option<String>,
    /// Required input length, if any.
    pub length: Option<usize>,
    /// Required run count, if any.
    pub runs: Option<u32>,
    /// Required provenance, if any.
    pub source: Option<Provenance>,
}

impl ResultFilter {
    /// A filter admitting every row.
    pub fn any() -> Self {
        Self::default()
    }

    /// Whether a result passes every set constraint.
    pub fn matches(&self, result: &BenchResult) -> bool {
        let r = &result.record;
        self.test.as_deref().is_none_or(|t| t == r.test)
            && self.length.is_none_or(|l| l == r.length)
            && self.runs.is_none_or(|n| n == r.runs)
            && self.source.is_none_or(|s| s == r.source)
    }
}

/// Select the rows passing `filter`, preserving the input order.
pub fn render<'a>(results: &'a [BenchResult], filter: &ResultFilter) -> Vec<&'a BenchResult> {
    results.iter().filter(|r| filter.matches(r)).collect()
}

/// Stable-sort rows by (test, length, runs).
///
/// Rows comparing equal keep their relative (delivery) order.
pub fn sort_rows(rows: &mut [&BenchResult]) {
    rows.sort_by(|a, b| {
        (&a.record.test, a.record.length, a.record.runs).cmp(&(
            &b.record.test,
            b.record.length,
            b.record.runs,
        ))
    });
}

/// Format rows as an aligned terminal table with a colored header.
pub fn format_table(rows: &[&BenchResult]) -> String {
    let mut out = String::new();
    let header = format!(
        "{:<22} {:>12} {:>12} {:>8} {:>6} {:>8}",
        "TEST", "MEAN (\u{3bc}s)", "NORM (\u{3bc}s)", "LENGTH", "RUNS", "SOURCE"
    );
    out.push_str(&header.bold().to_string());
    out.push('\n');

    for row in rows {
        let r = &row.record;
        out.push_str(&format!(
            "{:<22} {:>12.3} {:>12.3} {:>8} {:>6} {:>8}\n",
            r.test, row.mean_us, row.normalized_mean_us, r.length, r.runs, r.source
        ));
    }
    out
}
