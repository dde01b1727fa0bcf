//! SGP4 propagation using satkit

use std::fmt;

use nalgebra::Vector3;
use satkit::sgp4::{sgp4_full, GravConst, OpsMode, SGP4Error};

use super::frame::Frame;
use super::oracle::{NativeState, Sgp4Oracle};
use crate::data::{OrbitalElements, TleRecord};
use crate::error::{ParseError, PropagationError};

/// satkit's SGP4/SDP4 implementation
///
/// Runs with the WGS-72 constants and AFSPC operation mode that element sets
/// are fitted with. satkit picks the deep-space branch itself from the
/// orbital period. Output is TEME, meters and m/s; [`NativeState`] carries km
/// and km/s.
#[derive(Debug, Clone, Copy, Default)]
pub struct SatkitSgp4;

/// One SGP4 evaluation; failures are reported through the error code, not the vectors
fn run_sgp4(
    tle: &mut satkit::TLE,
    when: satkit::Instant,
) -> Result<(Vector3<f64>, Vector3<f64>), String> {
    let (pos, vel, errs) = sgp4_full(tle, &[when], GravConst::WGS72, OpsMode::AFSPC);
    match errs.first() {
        Some(SGP4Error::SGP4Success) => {}
        Some(err) => return Err(format!("{:?}", err)),
        None => return Err("no result returned".to_string()),
    }

    // pos and vel are in TEME frame, in meters and m/s
    let pos = pos.column(0);
    let vel = vel.column(0);
    Ok((
        Vector3::new(pos[0], pos[1], pos[2]),
        Vector3::new(vel[0], vel[1], vel[2]),
    ))
}

/// Element set with its SGP4 record already initialized
#[derive(Clone)]
pub struct Sgp4State {
    tle: satkit::TLE,
    deep_space: bool,
}

impl Sgp4State {
    pub fn tle(&self) -> &satkit::TLE {
        &self.tle
    }

    pub fn is_deep_space(&self) -> bool {
        self.deep_space
    }
}

impl fmt::Debug for Sgp4State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sgp4State")
            .field("epoch", &self.tle.epoch)
            .field("deep_space", &self.deep_space)
            .finish()
    }
}

impl Sgp4Oracle for SatkitSgp4 {
    type State = Sgp4State;

    fn name(&self) -> &'static str {
        "satkit SGP4"
    }

    fn native_frame(&self) -> Frame {
        Frame::Teme
    }

    fn build(&self, record: &TleRecord, elements: &OrbitalElements) -> Result<Sgp4State, ParseError> {
        let rejected = |message: String| ParseError::Rejected {
            oracle: self.name(),
            message,
        };

        let mut tle = satkit::TLE::load_2line(record.line1().trim_end(), record.line2().trim_end())
            .map_err(|e| rejected(e.to_string()))?;

        // The first call initializes the SGP4 record stored inside the TLE;
        // later clones carry it along so queries start from a ready state
        let epoch = tle.epoch;
        run_sgp4(&mut tle, epoch).map_err(rejected)?;

        log::trace!(
            "Initialized SGP4 for catalog {} ({})",
            elements.catalog_number,
            if elements.is_deep_space() { "SDP4" } else { "SGP4" }
        );

        Ok(Sgp4State {
            tle,
            deep_space: elements.is_deep_space(),
        })
    }

    fn propagate(
        &self,
        state: &Sgp4State,
        minutes_since_epoch: f64,
    ) -> Result<NativeState, PropagationError> {
        // sgp4 needs a mutable TLE; work on a copy so the shared state stays untouched
        let mut tle = state.tle.clone();
        let when = tle.epoch + satkit::Duration::from_seconds(minutes_since_epoch * 60.0);

        let (position_m, velocity_m_s) =
            run_sgp4(&mut tle, when).map_err(|message| PropagationError::Oracle {
                minutes_since_epoch,
                message,
            })?;

        Ok(NativeState {
            position_km: position_m / 1000.0,
            velocity_km_s: velocity_m_s / 1000.0,
        })
    }
}
