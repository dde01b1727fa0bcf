//! Earth-orbiting planets backed by Two-Line Element sets
//!
//! A [`TlePlanet`] is built from the two raw lines of a TLE and answers
//! ephemeris queries through SGP4/SDP4. Only the lines and the planet's
//! identity are persisted; everything else is rebuilt on restore.
//!
//! ```ignore
//! use tle_planet::{Epoch, TlePlanet};
//!
//! let planet = TlePlanet::new(line1, line2)?;
//! let state = planet.eph(Epoch::now())?;
//! println!("{} km from the geocentre", state.radius() / 1000.0);
//! ```

pub mod data;
pub mod epoch;
pub mod error;
pub mod planet;
pub mod propagation;

pub use data::{OrbitalElements, TleRecord};
pub use epoch::Epoch;
pub use error::{Error, ParseError, PropagationError, Result};
pub use planet::{KeplerianElements, Planet, PlanetIdentity, SavedTlePlanet, TlePlanet};
pub use propagation::{Frame, SatkitSgp4, Sgp4Oracle, StateVector};
