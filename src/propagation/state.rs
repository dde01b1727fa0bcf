//! State vectors returned by planet ephemeris queries

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use super::frame::{self, Frame};
use crate::epoch::Epoch;
use crate::error::PropagationError;

/// Position and velocity of a body at one epoch
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StateVector {
    /// Position (meters)
    pub position: Vector3<f64>,

    /// Velocity (m/s)
    pub velocity: Vector3<f64>,

    /// Epoch of this state
    pub epoch: Epoch,

    /// Frame both vectors are expressed in
    pub frame: Frame,
}

impl StateVector {
    pub fn new(position: Vector3<f64>, velocity: Vector3<f64>, epoch: Epoch, frame: Frame) -> Self {
        Self {
            position,
            velocity,
            epoch,
            frame,
        }
    }

    /// Create from position/velocity in kilometers and km/s
    pub fn from_km(pos_km: Vector3<f64>, vel_km_s: Vector3<f64>, epoch: Epoch, frame: Frame) -> Self {
        Self::new(pos_km * 1000.0, vel_km_s * 1000.0, epoch, frame)
    }

    pub fn position_km(&self) -> Vector3<f64> {
        self.position / 1000.0
    }

    pub fn velocity_km_s(&self) -> Vector3<f64> {
        self.velocity / 1000.0
    }

    /// Distance from Earth center in meters
    pub fn radius(&self) -> f64 {
        self.position.norm()
    }

    /// Altitude above the mean Earth radius in meters
    pub fn altitude(&self) -> f64 {
        self.radius() - EARTH_RADIUS_M
    }

    pub fn altitude_km(&self) -> f64 {
        self.altitude() / 1000.0
    }

    pub fn speed(&self) -> f64 {
        self.velocity.norm()
    }

    pub fn is_finite(&self) -> bool {
        self.position.iter().chain(self.velocity.iter()).all(|x| x.is_finite())
    }

    /// Specific orbital energy (vis-viva) in J/kg
    pub fn specific_energy(&self, mu: f64) -> f64 {
        0.5 * self.velocity.norm_squared() - mu / self.position.norm()
    }

    /// Semi-major axis in meters (negative for hyperbolic)
    pub fn semi_major_axis(&self, mu: f64) -> f64 {
        -mu / (2.0 * self.specific_energy(mu))
    }

    /// Orbital period in seconds (only for elliptical orbits)
    pub fn period(&self, mu: f64) -> Option<f64> {
        let a = self.semi_major_axis(mu);
        if a > 0.0 && a.is_finite() {
            Some(2.0 * std::f64::consts::PI * (a.powi(3) / mu).sqrt())
        } else {
            None
        }
    }

    /// The same state expressed in another frame
    pub fn expressed_in(&self, target: Frame) -> Result<Self, PropagationError> {
        let rotation = frame::rotation(self.frame, target, &self.epoch)?;
        Ok(Self::new(
            rotation * self.position,
            rotation * self.velocity,
            self.epoch,
            target,
        ))
    }
}

/// Earth's gravitational parameter (GM) in m³/s²
pub const MU_EARTH: f64 = 3.986004418e14;

/// Earth's mean radius in meters
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_vector_iss() {
        // Approximate ISS orbit: 420 km altitude, ~7.66 km/s
        let r = EARTH_RADIUS_M + 420_000.0;
        let v = (MU_EARTH / r).sqrt();

        let state = StateVector::new(
            Vector3::new(r, 0.0, 0.0),
            Vector3::new(0.0, v, 0.0),
            Epoch::from_mjd2000(9500.0),
            Frame::Gcrf,
        );

        assert!((state.altitude_km() - 420.0).abs() < 1.0);
        assert!((state.speed() / 1000.0 - 7.66).abs() < 0.1);

        let period = state.period(MU_EARTH).unwrap();
        assert!((period / 60.0 - 92.0).abs() < 2.0); // ~92 minutes
    }

    #[test]
    fn test_unit_helpers() {
        let state = StateVector::from_km(
            Vector3::new(7000.0, 0.0, 0.0),
            Vector3::new(0.0, 7.5, 0.0),
            Epoch::from_mjd2000(0.0),
            Frame::Teme,
        );
        assert_eq!(state.position.x, 7_000_000.0);
        assert_eq!(state.velocity.y, 7_500.0);
        assert_eq!(state.position_km().x, 7000.0);
        assert!(state.is_finite());

        let mut broken = state;
        broken.velocity.z = f64::NAN;
        assert!(!broken.is_finite());
    }

    #[test]
    fn test_escape_has_no_period() {
        let r = EARTH_RADIUS_M + 420_000.0;
        let state = StateVector::new(
            Vector3::new(r, 0.0, 0.0),
            Vector3::new(0.0, (2.0 * MU_EARTH / r).sqrt() * 1.1, 0.0),
            Epoch::from_mjd2000(0.0),
            Frame::Gcrf,
        );
        assert!(state.period(MU_EARTH).is_none());
    }

    #[test]
    fn test_same_frame_is_unchanged() {
        let state = StateVector::new(
            Vector3::new(1.0, 2.0, 3.0),
            Vector3::new(4.0, 5.0, 6.0),
            Epoch::from_mjd2000(100.0),
            Frame::Gcrf,
        );
        assert_eq!(state.expressed_in(Frame::Gcrf).unwrap(), state);
    }
}
