//! Inertial reference frames and the rotations between them
//!
//! SGP4 reports states in TEME (true equator, mean equinox of the query
//! epoch). Planets in the toolbox report GCRF, so every SGP4 state is rotated
//! with satkit's TEME→GCRF quaternion for the query epoch.

use std::fmt;

use nalgebra::{Matrix3, Rotation3};
use serde::{Deserialize, Serialize};

use crate::epoch::Epoch;
use crate::error::PropagationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "UPPERCASE")]
pub enum Frame {
    /// True equator, mean equinox (SGP4 output)
    Teme,
    /// Geocentric celestial reference frame
    Gcrf,
}

/// Frame every planet's `eph` reports in
pub const CANONICAL_FRAME: Frame = Frame::Gcrf;

impl Frame {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Teme => "TEME",
            Self::Gcrf => "GCRF",
        }
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Rotation taking vectors expressed in `from` to `to` at `epoch`
pub fn rotation(from: Frame, to: Frame, epoch: &Epoch) -> Result<Rotation3<f64>, PropagationError> {
    match (from, to) {
        (Frame::Teme, Frame::Gcrf) => teme_to_gcrf(epoch),
        (Frame::Gcrf, Frame::Teme) => Ok(teme_to_gcrf(epoch)?.inverse()),
        _ => Ok(Rotation3::identity()),
    }
}

fn teme_to_gcrf(epoch: &Epoch) -> Result<Rotation3<f64>, PropagationError> {
    let instant = epoch.to_instant()?;
    let q_teme_to_gcrf = satkit::frametransform::qteme2gcrf(&instant);
    let rotation = q_teme_to_gcrf.to_rotation_matrix();
    let m = rotation.matrix();
    Ok(Rotation3::from_matrix_unchecked(Matrix3::from_fn(|row, col| {
        m[(row, col)]
    })))
}
