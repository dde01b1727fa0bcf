//! Configuration helpers for ephemeris queries

use serde::{Deserialize, Serialize};

use super::frame::{Frame, CANONICAL_FRAME};

/// Oracle selection for building planets from TLEs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OracleType {
    /// SGP4/SDP4 via satkit
    Sgp4,
    /// Unperturbed two-body motion of the TLE mean elements
    Kepler,
}

impl OracleType {
    /// Display name for the oracle
    pub fn name(&self) -> &'static str {
        match self {
            Self::Sgp4 => "SGP4/SDP4 (satkit)",
            Self::Kepler => "Two-body Kepler",
        }
    }

    /// Short description of when to use this oracle
    pub fn description(&self) -> &'static str {
        match self {
            Self::Sgp4 => "Standard analytic propagation for TLEs. Use this for real ephemerides.",
            Self::Kepler => "Mean elements without perturbations. Only for comparison and sanity checks.",
        }
    }

    pub fn all() -> &'static [OracleType] {
        &[OracleType::Sgp4, OracleType::Kepler]
    }

    pub fn is_sgp4(&self) -> bool {
        matches!(self, Self::Sgp4)
    }
}

/// Settings for ephemeris queries made through the command line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EphemerisSettings {
    pub oracle: OracleType,
    /// Frame results are reported in
    pub output_frame: Frame,
    /// Warn when querying further than this from the element epoch (days)
    pub stale_after_days: f64,
}

impl Default for EphemerisSettings {
    fn default() -> Self {
        Self {
            oracle: OracleType::Sgp4,
            output_frame: CANONICAL_FRAME,
            stale_after_days: 30.0,
        }
    }
}

impl EphemerisSettings {
    /// Two-body comparison settings
    pub fn kepler() -> Self {
        Self {
            oracle: OracleType::Kepler,
            ..Default::default()
        }
    }

    pub fn with_frame(mut self, frame: Frame) -> Self {
        self.output_frame = frame;
        self
    }

    pub fn with_stale_after_days(mut self, days: f64) -> Self {
        self.stale_after_days = days;
        self
    }

    /// Whether elements this many days old (either direction) are past their useful life
    pub fn is_stale(&self, age_days: f64) -> bool {
        age_days.abs() > self.stale_after_days
    }
}
