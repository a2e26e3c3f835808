//! Delimited-text ingestion and export.
//!
//! Raw datasets are comma-delimited with a header row. A field containing
//! the delimiter, a quote, or a line break is wrapped in quotes with
//! embedded quotes doubled; the parser reverses exactly that rule. Malformed
//! rows are reported individually with enough context to locate them and do
//! not abort the rest of the ingestion; an unterminated quote is structural
//! corruption and fails the whole parse.

use std::borrow::Cow;
use std::fmt;
use std::io::{self, Read, Write};

use crate::record::{MeasurementRecord, Provenance};
use crate::stats::{GroupKey, GroupStats};

/// Column order of the raw-dataset format.
const RECORD_COLUMNS: [&str; 5] = ["source", "test", "length", "runs", "duration"];

/// Column order of the aggregated-statistics format.
const STATS_COLUMNS: [&str; 10] = [
    "name",
    "length",
    "mean",
    "stddev",
    "sample_mean",
    "sample_stddev",
    "median",
    "min",
    "max",
    "num_samples",
];

/// Errors that fail an entire read or write.
#[derive(Debug)]
pub enum CsvError {
    /// IO error on the underlying stream.
    Io(io::Error),

    /// The input has no header row.
    MissingHeader,

    /// A required column is absent from the header.
    MissingColumn {
        /// The column that was expected.
        name: &'static str,
    },

    /// A quoted field was never closed. The format is corrupt; nothing
    /// after this point can be trusted.
    UnterminatedQuote {
        /// Line where the unterminated field started (1-indexed).
        line: usize,
    },

    /// A value in a strict table (statistics re-parse) failed to parse.
    InvalidValue {
        /// Line where the value was found (1-indexed).
        line: usize,
        /// The offending value.
        value: String,
    },
}

impl fmt::Display for CsvError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CsvError::Io(e) => write!(f, "IO error: {}", e),
            CsvError::MissingHeader => write!(f, "input has no header row"),
            CsvError::MissingColumn { name } => {
                write!(f, "header is missing required column '{}'", name)
            }
            CsvError::UnterminatedQuote { line } => {
                write!(f, "unterminated quoted field starting at line {}", line)
            }
            CsvError::InvalidValue { line, value } => {
                write!(f, "invalid value at line {}: '{}'", line, value)
            }
        }
    }
}

impl std::error::Error for CsvError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CsvError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for CsvError {
    fn from(e: io::Error) -> Self {
        CsvError::Io(e)
    }
}

/// One row that failed to parse as a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowIssue {
    /// Line the row started on (1-indexed).
    pub line: usize,
    /// The row's raw fields, re-joined for reporting.
    pub content: String,
    /// What went wrong.
    pub message: String,
}

impl fmt::Display for RowIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {} ({})", self.line, self.message, self.content)
    }
}

/// Outcome of ingesting a raw dataset.
#[derive(Debug)]
pub struct Ingestion {
    /// Records that parsed cleanly and matched the provenance filter.
    pub records: Vec<MeasurementRecord>,
    /// Rows that failed to parse, with location context.
    pub rejected: Vec<RowIssue>,
    /// Rows that parsed but were excluded by the provenance filter.
    pub filtered_out: usize,
}

/// Quote a field if it contains the delimiter, a quote, or a line break.
///
/// Embedded quotes are doubled and the field is wrapped in quotes.
pub fn escape_field(field: &str) -> Cow<'_, str> {
    if field.contains([',', '"', '\n', '\r']) {
        Cow::Owned(format!("\"{}\"", field.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(field)
    }
}

/// Write one row of fields, applying the quoting rule.
fn write_row<W: Write>(w: &mut W, fields: &[&str]) -> io::Result<()> {
    let joined: Vec<Cow<'_, str>> = fields.iter().map(|f| escape_field(f)).collect();
    writeln!(w, "{}", joined.join(","))
}

/// Parse an entire delimited-text input into rows of fields.
///
/// Rows are tagged with the line they started on. Blank lines are skipped.
/// Quoted fields may contain delimiters, doubled quotes, and line breaks.
pub fn parse_rows(input: &str) -> Result<Vec<(usize, Vec<String>)>, CsvError> {
    let mut rows: Vec<(usize, Vec<String>)> = Vec::new();
    let mut row: Vec<String> = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut any_field_data = false;

    let mut line = 1usize;
    let mut row_line = 1usize;
    let mut quote_line = 1usize;

    let mut chars = input.chars().peekable();
    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' => {
                    if chars.peek() == Some(&'"') {
                        chars.next();
                        field.push('"');
                    } else {
                        in_quotes = false;
                    }
                }
                '\n' => {
                    line += 1;
                    field.push('\n');
                }
                _ => field.push(c),
            }
            continue;
        }

        match c {
            '"' => {
                in_quotes = true;
                quote_line = line;
                any_field_data = true;
            }
            ',' => {
                row.push(std::mem::take(&mut field));
                any_field_data = true;
            }
            '\r' | '\n' => {
                if c == '\r' && chars.peek() == Some(&'\n') {
                    chars.next();
                }
                if any_field_data || !row.is_empty() {
                    row.push(std::mem::take(&mut field));
                    rows.push((row_line, std::mem::take(&mut row)));
                }
                any_field_data = false;
                line += 1;
                row_line = line;
            }
            _ => {
                field.push(c);
                any_field_data = true;
            }
        }
    }

    if in_quotes {
        return Err(CsvError::UnterminatedQuote { line: quote_line });
    }
    if any_field_data || !row.is_empty() {
        row.push(field);
        rows.push((row_line, row));
    }

    Ok(rows)
}

/// Locate each required column in a header row, case-insensitively.
fn column_indexes<const N: usize>(
    header: &[String],
    required: &[&'static str; N],
) -> Result<[usize; N], CsvError> {
    let mut indexes = [0usize; N];
    for (slot, &name) in indexes.iter_mut().zip(required.iter()) {
        *slot = header
            .iter()
            .position(|h| h.trim().eq_ignore_ascii_case(name))
            .ok_or(CsvError::MissingColumn { name })?;
    }
    Ok(indexes)
}

/// Parse one data row into a record, or explain why it cannot be one.
fn row_to_record(fields: &[String], idx: &[usize; 5]) -> Result<MeasurementRecord, String> {
    let max_idx = *idx.iter().max().unwrap_or(&0);
    if fields.len() <= max_idx {
        return Err(format!(
            "expected at least {} columns, got {}",
            max_idx + 1,
            fields.len()
        ));
    }

    let source: Provenance = fields[idx[0]]
        .trim()
        .parse()
        .map_err(|e: crate::record::UnknownProvenance| e.to_string())?;
    let test = fields[idx[1]].trim().to_string();
    if test.is_empty() {
        return Err("empty test id".to_string());
    }
    let length: usize = fields[idx[2]]
        .trim()
        .parse()
        .map_err(|_| format!("invalid length '{}'", fields[idx[2]]))?;
    let runs: u32 = fields[idx[3]]
        .trim()
        .parse()
        .map_err(|_| format!("invalid run count '{}'", fields[idx[3]]))?;
    if runs == 0 {
        return Err("run count must be positive".to_string());
    }
    let duration_us: f64 = fields[idx[4]]
        .trim()
        .parse()
        .map_err(|_| format!("invalid duration '{}'", fields[idx[4]]))?;
    if !duration_us.is_finite() || duration_us < 0.0 {
        return Err(format!("duration must be non-negative, got {}", duration_us));
    }

    Ok(MeasurementRecord {
        test,
        length,
        runs,
        duration_us,
        source,
    })
}

/// Read a raw dataset, keeping rows whose provenance matches `keep`.
///
/// `keep: None` admits every provenance. Malformed rows land in
/// [`Ingestion::rejected`]; only structural corruption or a bad header
/// fails the call.
pub fn read_records<R: Read>(
    mut reader: R,
    keep: Option<Provenance>,
) -> Result<Ingestion, CsvError> {
    let mut input = String::new();
    reader.read_to_string(&mut input)?;

    let rows = parse_rows(&input)?;
    let mut iter = rows.into_iter();
    let (_, header) = iter.next().ok_or(CsvError::MissingHeader)?;
    let idx = column_indexes(&header, &RECORD_COLUMNS)?;

    let mut ingestion = Ingestion {
        records: Vec::new(),
        rejected: Vec::new(),
        filtered_out: 0,
    };

    for (line, fields) in iter {
        match row_to_record(&fields, &idx) {
            Ok(record) => {
                if keep.is_some_and(|p| record.source != p) {
                    ingestion.filtered_out += 1;
                } else {
                    ingestion.records.push(record);
                }
            }
            Err(message) => ingestion.rejected.push(RowIssue {
                line,
                content: fields.join(","),
                message,
            }),
        }
    }

    Ok(ingestion)
}

/// Write a raw dataset: header plus one row per record.
///
/// Durations are written at full precision; the 3-decimal rounding rule
/// applies only to aggregated statistics.
pub fn write_records<W: Write>(w: &mut W, records: &[MeasurementRecord]) -> io::Result<()> {
    write_row(w, &RECORD_COLUMNS)?;
    for r in records {
        let length = r.length.to_string();
        let runs = r.runs.to_string();
        let duration = r.duration_us.to_string();
        write_row(w, &[r.source.as_str(), &r.test, &length, &runs, &duration])?;
    }
    Ok(())
}

/// Write aggregated statistics: one row per group, floats rounded to three
/// decimal places, rows already in key order.
pub fn write_stats<W: Write>(w: &mut W, groups: &[(GroupKey, GroupStats)]) -> io::Result<()> {
    write_row(w, &STATS_COLUMNS)?;
    for (key, s) in groups {
        let fields = [
            key.test.clone(),
            key.length.to_string(),
            format!("{:.3}", s.mean),
            format!("{:.3}", s.stddev),
            format!("{:.3}", s.sample_mean),
            format!("{:.3}", s.sample_stddev),
            format!("{:.3}", s.median),
            format!("{:.3}", s.min),
            format!("{:.3}", s.max),
            s.size.to_string(),
        ];
        let refs: Vec<&str> = fields.iter().map(|f| f.as_str()).collect();
        write_row(w, &refs)?;
    }
    Ok(())
}

/// One parsed row of an aggregated-statistics table.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct StatsRow {
    /// Candidate id.
    pub name: String,
    /// Input length.
    pub length: usize,
    /// The statistics, as exported (3-decimal precision).
    pub stats: GroupStats,
}

/// Re-parse an aggregated-statistics table written by [`write_stats`].
pub fn read_stats<R: Read>(mut reader: R) -> Result<Vec<StatsRow>, CsvError> {
    let mut input = String::new();
    reader.read_to_string(&mut input)?;

    let rows = parse_rows(&input)?;
    let mut iter = rows.into_iter();
    let (_, header) = iter.next().ok_or(CsvError::MissingHeader)?;
    let idx = column_indexes(&header, &STATS_COLUMNS)?;

    let mut out = Vec::new();
    for (line, fields) in iter {
        let get = |i: usize| -> Result<&str, CsvError> {
            fields.get(idx[i]).map(|s| s.trim()).ok_or_else(|| {
                CsvError::InvalidValue {
                    line,
                    value: fields.join(","),
                }
            })
        };
        let num = |i: usize| -> Result<f64, CsvError> {
            let raw = get(i)?;
            raw.parse().map_err(|_| CsvError::InvalidValue {
                line,
                value: raw.to_string(),
            })
        };
        let int = |i: usize| -> Result<usize, CsvError> {
            let raw = get(i)?;
            raw.parse().map_err(|_| CsvError::InvalidValue {
                line,
                value: raw.to_string(),
            })
        };
        out.push(StatsRow {
            name: get(0)?.to_string(),
            length: int(1)?,
            stats: GroupStats {
                mean: num(2)?,
                stddev: num(3)?,
                sample_mean: num(4)?,
                sample_stddev: num(5)?,
                median: num(6)?,
                min: num(7)?,
                max: num(8)?,
                size: int(9)?,
            },
        });
    }
    Ok(out)
}
