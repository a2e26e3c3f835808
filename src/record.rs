//! Measurement records and request provenance.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Origin of a benchmark request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provenance {
    /// Warm-up request issued once per candidate at startup.
    Seed,
    /// Timer-triggered request with randomized parameters.
    Auto,
    /// Manually triggered request.
    User,
}

impl Provenance {
    /// Canonical lowercase name, as stored in datasets.
    pub fn as_str(&self) -> &'static str {
        match self {
            Provenance::Seed => "seed",
            Provenance::Auto => "auto",
            Provenance::User => "user",
        }
    }
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown provenance name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownProvenance(pub String);

impl fmt::Display for UnknownProvenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unknown provenance '{}' (expected one of: seed, auto, user)",
            self.0
        )
    }
}

impl std::error::Error for UnknownProvenance {}

impl FromStr for Provenance {
    type Err = UnknownProvenance;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "seed" => Ok(Provenance::Seed),
            "auto" => Ok(Provenance::Auto),
            "user" => Ok(Provenance::User),
            other => Err(UnknownProvenance(other.to_string())),
        }
    }
}

/// One observed duration for a (test, length, runs, provenance) request.
///
/// Immutable once created; producers hand copies to consumers. The duration
/// is the mean per-call elapsed time in microseconds as reported by the
/// measurement harness.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasurementRecord {
    /// Candidate id this duration was measured for.
    pub test: String,
    /// Input size in bytes.
    pub length: usize,
    /// Iterations measured in the pass that produced this duration.
    pub runs: u32,
    /// Mean per-call duration in microseconds.
    pub duration_us: f64,
    /// Origin of the triggering request.
    pub source: Provenance,
}
