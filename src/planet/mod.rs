//! Generic planet contract and the TLE-backed planet
//!
//! The toolbox treats every body with an ephemeris as a [`Planet`]. A planet
//! carries a small [`PlanetIdentity`] (name, gravitational parameters, radii)
//! and answers "where are you at this epoch" with a [`StateVector`].

mod elements;
mod tle_planet;

pub use elements::KeplerianElements;
pub use tle_planet::{SavedTlePlanet, TlePlanet};

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::epoch::Epoch;
use crate::error::{ParseError, PropagationError};
use crate::propagation::StateVector;

/// Fields every planet carries, independent of how its ephemeris is computed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanetIdentity {
    pub name: String,
    /// Gravitational parameter of the body being orbited (m³/s²)
    pub mu_central_body: f64,
    /// Gravitational parameter of the planet itself (m³/s²)
    pub mu_self: f64,
    /// Body radius (m)
    pub radius: f64,
    /// Minimum safe distance from the body centre (m)
    pub safe_radius: f64,
}

impl PlanetIdentity {
    pub fn validate(&self) -> Result<(), ParseError> {
        let invalid = |reason: String| Err(ParseError::InvalidIdentity { reason });
        if !(self.mu_central_body > 0.0 && self.mu_central_body.is_finite()) {
            return invalid(format!(
                "central body gravitational parameter {} must be positive",
                self.mu_central_body
            ));
        }
        if !(self.mu_self > 0.0 && self.mu_self.is_finite()) {
            return invalid(format!(
                "gravitational parameter {} must be positive",
                self.mu_self
            ));
        }
        if !(self.radius > 0.0 && self.radius.is_finite()) {
            return invalid(format!("radius {} must be positive", self.radius));
        }
        if !(self.safe_radius >= self.radius && self.safe_radius.is_finite()) {
            return invalid(format!(
                "safe radius {} must be at least the radius {}",
                self.safe_radius, self.radius
            ));
        }
        Ok(())
    }
}

/// A body whose state can be computed at any epoch
///
/// Implementations must be usable from several threads at once: `eph` takes
/// `&self` and never mutates the planet.
pub trait Planet: fmt::Debug + Send + Sync {
    fn identity(&self) -> &PlanetIdentity;

    /// Position (m) and velocity (m/s) at `when`, in the canonical inertial frame
    fn eph(&self, when: Epoch) -> Result<StateVector, PropagationError>;

    /// Independent copy behind a trait object
    fn box_clone(&self) -> Box<dyn Planet>;

    fn name(&self) -> &str {
        &self.identity().name
    }

    /// Osculating elements at `when`, or `None` if the state is not elliptical
    fn osculating_elements(&self, when: Epoch) -> Result<Option<KeplerianElements>, PropagationError> {
        let state = self.eph(when)?;
        Ok(KeplerianElements::from_state(
            &state.position,
            &state.velocity,
            self.identity().mu_central_body,
        ))
    }

    /// Osculating period in seconds at `when`
    fn period(&self, when: Epoch) -> Result<Option<f64>, PropagationError> {
        let state = self.eph(when)?;
        Ok(state.period(self.identity().mu_central_body))
    }
}

impl Clone for Box<dyn Planet> {
    fn clone(&self) -> Self {
        self.box_clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity() -> PlanetIdentity {
        PlanetIdentity {
            name: "test".to_string(),
            mu_central_body: 3.986e14,
            mu_self: 1.0,
            radius: 1.0,
            safe_radius: 1.0,
        }
    }

    #[test]
    fn test_identity_validation() {
        assert!(identity().validate().is_ok());

        let mut bad = identity();
        bad.mu_central_body = 0.0;
        assert!(matches!(bad.validate(), Err(ParseError::InvalidIdentity { .. })));

        let mut bad = identity();
        bad.safe_radius = 0.5;
        assert!(bad.validate().is_err());

        let mut bad = identity();
        bad.radius = f64::NAN;
        assert!(bad.validate().is_err());
    }
}
