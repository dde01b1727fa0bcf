//! Toolbox epochs
//!
//! An [`Epoch`] is a UTC instant counted in days since 2000-01-01 00:00:00
//! (MJD2000). Every planet in the toolbox is queried with this type; the
//! SGP4 side works in minutes since the element epoch instead.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{EpochParseError, PropagationError};

/// Modified Julian date of 2000-01-01 00:00:00
pub const MJD_AT_MJD2000: f64 = 51_544.0;

/// Julian date minus modified Julian date
pub const JD_MINUS_MJD: f64 = 2_400_000.5;

pub const SECONDS_PER_DAY: f64 = 86_400.0;
pub const MINUTES_PER_DAY: f64 = 1_440.0;

/// Unix time of 2000-01-01 00:00:00 UTC
const UNIX_AT_MJD2000: i64 = 946_684_800;

/// Beyond this many microseconds from 2000 chrono cannot represent the date
const MAX_MICROS: f64 = 8.0e18;

/// Absolute UTC epoch in MJD2000 days
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Epoch {
    mjd2000: f64,
}

impl Epoch {
    pub fn from_mjd2000(days: f64) -> Self {
        Self { mjd2000: days }
    }

    pub fn from_mjd(mjd: f64) -> Self {
        Self::from_mjd2000(mjd - MJD_AT_MJD2000)
    }

    pub fn from_jd(jd: f64) -> Self {
        Self::from_mjd(jd - JD_MINUS_MJD)
    }

    pub fn from_datetime(dt: &DateTime<Utc>) -> Self {
        let seconds = (dt.timestamp() - UNIX_AT_MJD2000) as f64
            + dt.timestamp_subsec_nanos() as f64 * 1e-9;
        Self::from_mjd2000(seconds / SECONDS_PER_DAY)
    }

    /// Epoch from a calendar year and a fractional day of year (1.0 = Jan 1 00:00)
    ///
    /// This is how TLE epochs are written.
    pub fn from_year_day(year: i32, day_of_year: f64) -> Option<Self> {
        if !day_of_year.is_finite() || day_of_year < 1.0 {
            return None;
        }
        let jan1 = NaiveDate::from_ymd_opt(year, 1, 1)?;
        let base = NaiveDate::from_ymd_opt(2000, 1, 1)?;
        let days = jan1.signed_duration_since(base).num_days() as f64;
        Some(Self::from_mjd2000(days + day_of_year - 1.0))
    }

    pub fn now() -> Self {
        Self::from_datetime(&Utc::now())
    }

    pub fn mjd2000(&self) -> f64 {
        self.mjd2000
    }

    pub fn mjd(&self) -> f64 {
        self.mjd2000 + MJD_AT_MJD2000
    }

    pub fn jd(&self) -> f64 {
        self.mjd() + JD_MINUS_MJD
    }

    pub fn is_finite(&self) -> bool {
        self.mjd2000.is_finite()
    }

    /// Days elapsed from `other` to `self` (negative if `self` is earlier)
    pub fn days_since(&self, other: &Epoch) -> f64 {
        self.mjd2000 - other.mjd2000
    }

    pub fn minutes_since(&self, other: &Epoch) -> f64 {
        self.days_since(other) * MINUTES_PER_DAY
    }

    pub fn add_seconds(&self, seconds: f64) -> Self {
        Self::from_mjd2000(self.mjd2000 + seconds / SECONDS_PER_DAY)
    }

    /// Calendar form, rounded to the microsecond
    pub fn to_datetime(&self) -> Option<DateTime<Utc>> {
        let micros = (self.mjd2000 * SECONDS_PER_DAY * 1e6).round();
        if !micros.is_finite() || micros.abs() > MAX_MICROS {
            return None;
        }
        let micros = micros as i64;
        let secs = micros.div_euclid(1_000_000) + UNIX_AT_MJD2000;
        let nanos = (micros.rem_euclid(1_000_000) * 1_000) as u32;
        DateTime::from_timestamp(secs, nanos)
    }

    /// Convert to the time type used by satkit
    pub fn to_instant(&self) -> Result<satkit::Instant, PropagationError> {
        let invalid = || PropagationError::InvalidEpoch {
            mjd2000: self.mjd2000,
        };
        let dt = self.to_datetime().ok_or_else(invalid)?;
        let second = dt.second() as f64 + dt.nanosecond() as f64 * 1e-9;
        satkit::Instant::from_datetime(
            dt.year() as i32,
            dt.month() as i32,
            dt.day() as i32,
            dt.hour() as i32,
            dt.minute() as i32,
            second,
        )
        .map_err(|_| invalid())
    }
}

impl From<DateTime<Utc>> for Epoch {
    fn from(dt: DateTime<Utc>) -> Self {
        Self::from_datetime(&dt)
    }
}

impl fmt::Display for Epoch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_datetime() {
            Some(dt) => write!(f, "{}", dt.format("%Y-%m-%dT%H:%M:%S%.6fZ")),
            None => write!(f, "MJD2000 {}", self.mjd2000),
        }
    }
}

impl FromStr for Epoch {
    type Err = EpochParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let input = s.trim();
        let err = || EpochParseError {
            input: s.to_string(),
        };

        let prefixed: [(&str, fn(f64) -> Epoch); 3] = [
            ("mjd2000:", Epoch::from_mjd2000),
            ("mjd:", Epoch::from_mjd),
            ("jd:", Epoch::from_jd),
        ];
        for (prefix, make) in prefixed {
            if let Some(days) = input.strip_prefix(prefix) {
                let days: f64 = days.trim().parse().map_err(|_| err())?;
                if !days.is_finite() {
                    return Err(err());
                }
                return Ok(make(days));
            }
        }

        if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
            return Ok(Self::from_datetime(&dt.with_timezone(&Utc)));
        }
        for format in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
            if let Ok(naive) = NaiveDateTime::parse_from_str(input, format) {
                return Ok(Self::from_datetime(&naive.and_utc()));
            }
        }
        NaiveDate::parse_from_str(input, "%Y-%m-%d")
            .ok()
            .and_then(|date| date.and_hms_opt(0, 0, 0))
            .map(|naive| Self::from_datetime(&naive.and_utc()))
            .ok_or_else(err)
    }
}
