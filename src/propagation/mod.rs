//! Orbital propagation module
//!
//! Planets never talk to a propagator library directly. They go through the
//! [`Sgp4Oracle`] trait, which has two implementations:
//!
//! ## SGP4 (`SatkitSgp4`)
//!
//! satkit's SGP4/SDP4. This is the oracle real ephemerides use. States come
//! out in TEME and are rotated to GCRF by the planet.
//!
//! ## Two-body (`KeplerOracle`)
//!
//! Unperturbed Kepler motion of the TLE mean elements, for comparison runs
//! and sanity checks.
//!
//! # Example
//!
//! ```ignore
//! use tle_planet::propagation::*;
//!
//! let settings = EphemerisSettings::default();
//! let state = planet.eph(epoch)?.expressed_in(settings.output_frame)?;
//! ```

mod frame;
mod kepler;
mod oracle;
mod propagator;
mod settings;
mod state;

pub use frame::{rotation, Frame, CANONICAL_FRAME};
pub use kepler::{KeplerOracle, KeplerState};
pub use oracle::{NativeState, Sgp4Oracle};
pub use propagator::{SatkitSgp4, Sgp4State};
pub use settings::{EphemerisSettings, OracleType};
pub use state::{StateVector, EARTH_RADIUS_M, MU_EARTH};
