//! Classical Keplerian elements and their conversion to and from state vectors

use std::f64::consts::{PI, TAU};

use nalgebra::{Rotation3, Vector3};
use serde::{Deserialize, Serialize};

use crate::error::PropagationError;

const KEPLER_TOLERANCE: f64 = 1e-14;
const KEPLER_MAX_ITERATIONS: usize = 50;

/// Below this the orbit is treated as circular or equatorial
const SINGULAR_EPSILON: f64 = 1e-11;

/// Elliptical Keplerian elements (SI units, radians)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KeplerianElements {
    /// Semi-major axis (m)
    pub semi_major_axis: f64,
    pub eccentricity: f64,
    pub inclination: f64,
    /// Right ascension of the ascending node
    pub raan: f64,
    pub arg_perigee: f64,
    pub mean_anomaly: f64,
}

impl KeplerianElements {
    /// Osculating elements of a position (m) / velocity (m/s) pair
    ///
    /// Returns `None` for parabolic, hyperbolic or degenerate states. For
    /// circular orbits the argument of perigee is zero and the anomaly is
    /// measured from the node; for equatorial orbits the node is zero.
    pub fn from_state(position: &Vector3<f64>, velocity: &Vector3<f64>, mu: f64) -> Option<Self> {
        let r = position.norm();
        let v2 = velocity.norm_squared();
        let h = position.cross(velocity);
        let h_norm = h.norm();
        if r <= 0.0 || h_norm <= 0.0 || mu <= 0.0 {
            return None;
        }

        let energy = 0.5 * v2 - mu / r;
        if energy >= 0.0 {
            return None;
        }
        let semi_major_axis = -mu / (2.0 * energy);

        let e_vec = (position * (v2 - mu / r) - velocity * position.dot(velocity)) / mu;
        let eccentricity = e_vec.norm();
        let inclination = (h.z / h_norm).clamp(-1.0, 1.0).acos();

        let node = Vector3::z().cross(&h);
        let node_norm = node.norm();
        let equatorial = node_norm < SINGULAR_EPSILON * h_norm;
        let circular = eccentricity < SINGULAR_EPSILON;

        let raan = if equatorial {
            0.0
        } else {
            node.y.atan2(node.x).rem_euclid(TAU)
        };
        // Reference direction in the orbital plane: the node, or x for equatorial orbits
        let reference = if equatorial {
            Vector3::x()
        } else {
            node / node_norm
        };
        let h_unit = h / h_norm;
        let angle_from_reference = |target: &Vector3<f64>| {
            let sin = reference.cross(target).dot(&h_unit);
            let cos = reference.dot(target);
            sin.atan2(cos).rem_euclid(TAU)
        };

        let (arg_perigee, true_anomaly) = if circular {
            (0.0, angle_from_reference(position))
        } else {
            let arg_perigee = angle_from_reference(&e_vec);
            let sin = e_vec.cross(position).dot(&h_unit) / eccentricity;
            let cos = e_vec.dot(position) / eccentricity;
            (arg_perigee, sin.atan2(cos))
        };

        let eccentric_anomaly = 2.0
            * (((1.0 - eccentricity) / (1.0 + eccentricity)).sqrt() * (true_anomaly / 2.0).tan())
                .atan();
        let mean_anomaly =
            (eccentric_anomaly - eccentricity * eccentric_anomaly.sin()).rem_euclid(TAU);

        Some(Self {
            semi_major_axis,
            eccentricity,
            inclination,
            raan,
            arg_perigee,
            mean_anomaly,
        })
    }

    /// Period in seconds
    pub fn period(&self, mu: f64) -> f64 {
        TAU * (self.semi_major_axis.powi(3) / mu).sqrt()
    }

    /// Mean motion in rad/s
    pub fn mean_motion(&self, mu: f64) -> f64 {
        (mu / self.semi_major_axis.powi(3)).sqrt()
    }

    /// Eccentric anomaly for the current mean anomaly (Newton iteration)
    pub fn eccentric_anomaly(&self) -> Result<f64, PropagationError> {
        let e = self.eccentricity;
        let m = self.mean_anomaly.rem_euclid(TAU);
        let mut big_e = if e < 0.8 { m } else { PI };

        for _ in 0..KEPLER_MAX_ITERATIONS {
            let delta = (big_e - e * big_e.sin() - m) / (1.0 - e * big_e.cos());
            big_e -= delta;
            if delta.abs() < KEPLER_TOLERANCE {
                return Ok(big_e);
            }
        }

        Err(PropagationError::NoConvergence {
            mean_anomaly: m,
            eccentricity: e,
        })
    }

    /// Position (m) and velocity (m/s) in the frame the elements are referred to
    pub fn to_state(&self, mu: f64) -> Result<(Vector3<f64>, Vector3<f64>), PropagationError> {
        let a = self.semi_major_axis;
        let e = self.eccentricity;
        let big_e = self.eccentric_anomaly()?;
        let (sin_e, cos_e) = big_e.sin_cos();
        let root = (1.0 - e * e).sqrt();
        let r = a * (1.0 - e * cos_e);

        let position_pf = Vector3::new(a * (cos_e - e), a * root * sin_e, 0.0);
        let velocity_pf = Vector3::new(-sin_e, root * cos_e, 0.0) * ((mu * a).sqrt() / r);

        let rotation = Rotation3::from_axis_angle(&Vector3::z_axis(), self.raan)
            * Rotation3::from_axis_angle(&Vector3::x_axis(), self.inclination)
            * Rotation3::from_axis_angle(&Vector3::z_axis(), self.arg_perigee);

        Ok((rotation * position_pf, rotation * velocity_pf))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::propagation::MU_EARTH;
    use approx::assert_relative_eq;

    #[test]
    fn test_circular_equatorial_orbit() {
        let r = 7_000_000.0;
        let v = (MU_EARTH / r).sqrt();
        let elements = KeplerianElements::from_state(
            &Vector3::new(0.0, r, 0.0),
            &Vector3::new(-v, 0.0, 0.0),
            MU_EARTH,
        )
        .unwrap();

        assert_relative_eq!(elements.semi_major_axis, r, max_relative = 1e-12);
        assert!(elements.eccentricity < 1e-12);
        assert_relative_eq!(elements.inclination, 0.0);
        assert_relative_eq!(elements.raan, 0.0);
        assert_relative_eq!(elements.mean_anomaly, PI / 2.0, epsilon = 1e-9);
    }

    #[test]
    fn test_state_conversion_preserves_elements() {
        let original = KeplerianElements {
            semi_major_axis: 24_534_805.0,
            eccentricity: 0.7258491,
            inclination: 7.0496_f64.to_radians(),
            raan: 179.8238_f64.to_radians(),
            arg_perigee: 296.0482_f64.to_radians(),
            mean_anomaly: 8.3061_f64.to_radians(),
        };

        let (position, velocity) = original.to_state(MU_EARTH).unwrap();
        let recovered = KeplerianElements::from_state(&position, &velocity, MU_EARTH).unwrap();

        assert_relative_eq!(recovered.semi_major_axis, original.semi_major_axis, max_relative = 1e-9);
        assert_relative_eq!(recovered.eccentricity, original.eccentricity, epsilon = 1e-9);
        assert_relative_eq!(recovered.inclination, original.inclination, epsilon = 1e-9);
        assert_relative_eq!(recovered.raan, original.raan, epsilon = 1e-9);
        assert_relative_eq!(recovered.arg_perigee, original.arg_perigee, epsilon = 1e-9);
        assert_relative_eq!(recovered.mean_anomaly, original.mean_anomaly, epsilon = 1e-9);
    }

    #[test]
    fn test_perigee_radius() {
        let elements = KeplerianElements {
            semi_major_axis: 10_000_000.0,
            eccentricity: 0.3,
            inclination: 0.5,
            raan: 1.0,
            arg_perigee: 2.0,
            mean_anomaly: 0.0,
        };
        let (position, _) = elements.to_state(MU_EARTH).unwrap();
        assert_relative_eq!(position.norm(), 7_000_000.0, max_relative = 1e-12);
    }

    #[test]
    fn test_hyperbolic_state_has_no_elements() {
        let r = 7_000_000.0;
        let escape = (2.0 * MU_EARTH / r).sqrt();
        assert!(KeplerianElements::from_state(
            &Vector3::new(r, 0.0, 0.0),
            &Vector3::new(0.0, escape * 1.01, 0.0),
            MU_EARTH
        )
        .is_none());
    }

    #[test]
    fn test_high_eccentricity_converges() {
        let elements = KeplerianElements {
            semi_major_axis: 1.0e8,
            eccentricity: 0.99,
            inclination: 0.0,
            raan: 0.0,
            arg_perigee: 0.0,
            mean_anomaly: 0.01,
        };
        let big_e = elements.eccentric_anomaly().unwrap();
        assert_relative_eq!(big_e - 0.99 * big_e.sin(), 0.01, epsilon = 1e-12);
    }
}
