//! The propagation oracle seam
//!
//! A [`TlePlanet`](crate::planet::TlePlanet) never calls an SGP4 library
//! directly. It goes through [`Sgp4Oracle`], which bundles the three things
//! the adapter needs from the outside world:
//!
//! - decoding two TLE lines into [`OrbitalElements`]
//! - building opaque propagator state from those elements
//! - producing a native state vector some minutes after the element epoch
//!
//! The production oracle is [`SatkitSgp4`](super::SatkitSgp4). Tests inject
//! deterministic fakes.

use nalgebra::Vector3;

use super::frame::Frame;
use crate::data::{OrbitalElements, TleRecord};
use crate::error::{ParseError, PropagationError};

/// State vector in the oracle's own units and frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NativeState {
    pub position_km: Vector3<f64>,
    pub velocity_km_s: Vector3<f64>,
}

impl NativeState {
    pub fn is_finite(&self) -> bool {
        self.position_km
            .iter()
            .chain(self.velocity_km_s.iter())
            .all(|x| x.is_finite())
    }
}

/// Element decoding and propagation capability
///
/// Implementations must be deterministic: the same record must always decode
/// to the same elements and the same offset must always propagate to the same
/// state (or the same error). `propagate` may be called concurrently on one
/// shared state.
pub trait Sgp4Oracle: Send + Sync {
    /// Propagator state built from one element set
    type State: Clone + Send + Sync;

    fn name(&self) -> &'static str;

    /// Frame of the vectors returned by `propagate`
    fn native_frame(&self) -> Frame;

    /// Decode both lines into one consistent element set
    fn parse(&self, record: &TleRecord) -> Result<OrbitalElements, ParseError> {
        OrbitalElements::decode(record)
    }

    fn build(&self, record: &TleRecord, elements: &OrbitalElements) -> Result<Self::State, ParseError>;

    fn propagate(
        &self,
        state: &Self::State,
        minutes_since_epoch: f64,
    ) -> Result<NativeState, PropagationError>;
}
