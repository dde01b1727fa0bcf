//! Two-body propagation of TLE mean elements
//!
//! Ignores drag and every perturbation SGP4 models. Useful as a reference
//! when comparing against SGP4 and as an oracle with no external numerics.

use nalgebra::Vector3;

use super::frame::Frame;
use super::oracle::{NativeState, Sgp4Oracle};
use crate::data::{OrbitalElements, TleRecord, MU_EARTH_WGS72_KM3_S2};
use crate::error::{ParseError, PropagationError};
use crate::planet::KeplerianElements;

#[derive(Debug, Clone, Copy)]
pub struct KeplerOracle {
    /// Gravitational parameter used to turn mean motion into a semi-major axis (m³/s²)
    pub mu: f64,
}

impl Default for KeplerOracle {
    fn default() -> Self {
        Self {
            mu: MU_EARTH_WGS72_KM3_S2 * 1e9,
        }
    }
}

/// Elements at the TLE epoch plus the mean motion used to advance them
#[derive(Debug, Clone, Copy)]
pub struct KeplerState {
    elements: KeplerianElements,
    mean_motion_rad_s: f64,
}

impl KeplerState {
    pub fn elements(&self) -> &KeplerianElements {
        &self.elements
    }
}

impl Sgp4Oracle for KeplerOracle {
    type State = KeplerState;

    fn name(&self) -> &'static str {
        "two-body Kepler"
    }

    fn native_frame(&self) -> Frame {
        Frame::Teme
    }

    fn build(&self, _record: &TleRecord, elements: &OrbitalElements) -> Result<KeplerState, ParseError> {
        if !(self.mu > 0.0 && self.mu.is_finite()) {
            return Err(ParseError::Rejected {
                oracle: self.name(),
                message: format!("gravitational parameter {} must be positive", self.mu),
            });
        }
        let n = elements.mean_motion_rad_s();
        let mut kepler = elements.keplerian();
        kepler.semi_major_axis = (self.mu / (n * n)).cbrt();

        Ok(KeplerState {
            elements: kepler,
            mean_motion_rad_s: n,
        })
    }

    fn propagate(
        &self,
        state: &KeplerState,
        minutes_since_epoch: f64,
    ) -> Result<NativeState, PropagationError> {
        let mut elements = state.elements;
        elements.mean_anomaly += state.mean_motion_rad_s * minutes_since_epoch * 60.0;
        let (position, velocity): (Vector3<f64>, Vector3<f64>) = elements.to_state(self.mu)?;

        Ok(NativeState {
            position_km: position / 1000.0,
            velocity_km_s: velocity / 1000.0,
        })
    }
}
