//! Error types for element decoding, propagation and file handling

use thiserror::Error;

/// Failure to turn a pair of TLE lines into a usable planet.
///
/// Raised at construction and restoration time. An adapter is never
/// returned alongside one of these.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("TLE line {line} has {length} columns, expected {expected}")]
    LineLength {
        line: u8,
        length: usize,
        expected: usize,
    },

    #[error("TLE line {line} contains non-ASCII characters")]
    NonAscii { line: u8 },

    #[error("TLE line {line} starts with {found:?}, expected '{line}'")]
    LineNumber { line: u8, found: char },

    #[error("TLE line {line} checksum mismatch: computed {computed}, found {found:?}")]
    Checksum { line: u8, computed: u8, found: char },

    #[error("TLE line {line}: invalid {field} field {value:?}")]
    Field {
        line: u8,
        field: &'static str,
        value: String,
    },

    #[error("TLE lines describe different objects: line 1 has catalog {line1}, line 2 has {line2}")]
    CatalogMismatch { line1: u32, line2: u32 },

    #[error("invalid element set: {reason}")]
    InvalidElements { reason: String },

    #[error("{oracle} rejected the element set: {message}")]
    Rejected {
        oracle: &'static str,
        message: String,
    },

    #[error("invalid planet identity: {reason}")]
    InvalidIdentity { reason: String },
}

/// Failure to produce a state vector for one requested epoch.
///
/// Does not invalidate the adapter; other epochs can still be queried.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PropagationError {
    #[error("epoch {mjd2000} (MJD2000) is not a representable date")]
    InvalidEpoch { mjd2000: f64 },

    #[error("propagation failed {minutes_since_epoch:.3} min from element epoch: {message}")]
    Oracle {
        minutes_since_epoch: f64,
        message: String,
    },

    #[error("non-finite state vector {minutes_since_epoch:.3} min from element epoch")]
    Degenerate { minutes_since_epoch: f64 },

    #[error("Kepler's equation did not converge (M = {mean_anomaly} rad, e = {eccentricity})")]
    NoConvergence {
        mean_anomaly: f64,
        eccentricity: f64,
    },
}

/// Failure to parse a textual epoch.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unrecognised epoch {input:?} (expected RFC 3339, YYYY-MM-DD[ HH:MM:SS], or mjd2000:<days>)")]
pub struct EpochParseError {
    pub input: String,
}

/// Crate-level error for operations that touch files or text catalogs.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Propagation(#[from] PropagationError),

    #[error(transparent)]
    Epoch(#[from] EpochParseError),

    #[error("catalog line {line}: {message}")]
    Catalog { line: usize, message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
