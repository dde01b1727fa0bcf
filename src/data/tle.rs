//! Two-Line Element records and their fixed-column decoding
//!
//! https://en.wikipedia.org/wiki/Two-line_element_set

use std::f64::consts::PI;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::epoch::{Epoch, MINUTES_PER_DAY, SECONDS_PER_DAY};
use crate::error::ParseError;
use crate::planet::KeplerianElements;

/// Sample element set used when no lines are supplied
pub const DEFAULT_LINE1: &str =
    "1 23177U 94040C   06175.45752052  .00000386  00000-0  76590-3 0    95";
pub const DEFAULT_LINE2: &str =
    "2 23177   7.0496 179.8238 7258491 296.0482   8.3061  2.25906668 97438";

pub const TLE_LINE_LENGTH: usize = 69;

/// Earth gravitational parameter of the WGS-72 model used by SGP4 (km³/s²)
pub const MU_EARTH_WGS72_KM3_S2: f64 = 398_600.8;

/// Earth equatorial radius of the WGS-72 model (km)
pub const EARTH_RADIUS_WGS72_KM: f64 = 6_378.135;

/// Orbits at or above this period are propagated with the deep-space (SDP4) terms
pub const DEEP_SPACE_PERIOD_MINUTES: f64 = 225.0;

/// The two raw lines of one element set, exactly as supplied
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TleRecord {
    line1: String,
    line2: String,
}

impl TleRecord {
    pub fn new(line1: impl Into<String>, line2: impl Into<String>) -> Self {
        Self {
            line1: line1.into(),
            line2: line2.into(),
        }
    }

    pub fn line1(&self) -> &str {
        &self.line1
    }

    pub fn line2(&self) -> &str {
        &self.line2
    }

    /// Catalog number from line 1, without validating the rest of the record
    pub fn catalog_number(&self) -> Option<u32> {
        self.line1
            .get(2..7)
            .and_then(|field| parse_catalog_number(field, 1).ok())
    }
}

impl Default for TleRecord {
    fn default() -> Self {
        Self::new(DEFAULT_LINE1, DEFAULT_LINE2)
    }
}

/// Decoded mean elements of one TLE
///
/// Angles are in degrees and mean motion in revolutions per day, as written
/// in the TLE. Use the helper methods for derived quantities.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrbitalElements {
    pub catalog_number: u32,
    pub classification: char,
    /// Launch year, launch number and piece, e.g. `94040C`
    pub international_designator: String,
    pub epoch: Epoch,
    /// First derivative of mean motion divided by two (rev/day²)
    pub mean_motion_dot: f64,
    /// Second derivative of mean motion divided by six (rev/day³)
    pub mean_motion_ddot: f64,
    /// B* drag term (1/earth radii)
    pub bstar: f64,
    pub ephemeris_type: u8,
    pub element_set_number: u32,
    pub inclination_deg: f64,
    pub raan_deg: f64,
    pub eccentricity: f64,
    pub arg_perigee_deg: f64,
    pub mean_anomaly_deg: f64,
    /// Revolutions per day
    pub mean_motion: f64,
    pub revolution_number: u32,
}

impl OrbitalElements {
    /// Decode and validate both lines of a record
    pub fn decode(record: &TleRecord) -> Result<Self, ParseError> {
        let line1 = checked_line(record.line1(), 1)?;
        let line2 = checked_line(record.line2(), 2)?;

        let catalog1 = parse_catalog_number(&line1[2..7], 1)?;
        let catalog2 = parse_catalog_number(&line2[2..7], 2)?;
        if catalog1 != catalog2 {
            return Err(ParseError::CatalogMismatch {
                line1: catalog1,
                line2: catalog2,
            });
        }

        let year = parse_field::<i32>(line1, 18..20, 1, "epoch year")?;
        let day = parse_field::<f64>(line1, 20..32, 1, "epoch day")?;
        let full_year = if year < 57 { 2000 + year } else { 1900 + year };
        let epoch = Epoch::from_year_day(full_year, day)
            .filter(|_| day < 367.0)
            .ok_or_else(|| field_error(line1, 20..32, 1, "epoch day"))?;

        let ephemeris_type = match line1.as_bytes()[62] {
            b' ' => 0,
            c if c.is_ascii_digit() => c - b'0',
            _ => return Err(field_error(line1, 62..63, 1, "ephemeris type")),
        };

        let elements = Self {
            catalog_number: catalog1,
            classification: line1.as_bytes()[7] as char,
            international_designator: line1[9..17].trim().to_string(),
            epoch,
            mean_motion_dot: parse_field(line1, 33..43, 1, "mean motion derivative")?,
            mean_motion_ddot: parse_exponent(line1, 44..52, 1, "mean motion second derivative")?,
            bstar: parse_exponent(line1, 53..61, 1, "bstar")?,
            ephemeris_type,
            element_set_number: parse_field_or_zero(line1, 64..68, 1, "element set number")?,
            inclination_deg: parse_field(line2, 8..16, 2, "inclination")?,
            raan_deg: parse_field(line2, 17..25, 2, "right ascension")?,
            eccentricity: parse_implied_decimal(line2, 26..33, 2, "eccentricity")?,
            arg_perigee_deg: parse_field(line2, 34..42, 2, "argument of perigee")?,
            mean_anomaly_deg: parse_field(line2, 43..51, 2, "mean anomaly")?,
            mean_motion: parse_field(line2, 52..63, 2, "mean motion")?,
            revolution_number: parse_field_or_zero(line2, 63..68, 2, "revolution number")?,
        };
        elements.validate()?;
        Ok(elements)
    }

    fn validate(&self) -> Result<(), ParseError> {
        let invalid = |reason: String| Err(ParseError::InvalidElements { reason });
        let values = [
            ("mean motion derivative", self.mean_motion_dot),
            ("mean motion second derivative", self.mean_motion_ddot),
            ("bstar", self.bstar),
            ("right ascension", self.raan_deg),
            ("argument of perigee", self.arg_perigee_deg),
            ("mean anomaly", self.mean_anomaly_deg),
            ("mean motion", self.mean_motion),
        ];
        if let Some((name, value)) = values.iter().find(|(_, v)| !v.is_finite()) {
            return invalid(format!("{name} {value} is not finite"));
        }
        if !(self.mean_motion > 0.0) {
            return invalid(format!("mean motion {} rev/day is not positive", self.mean_motion));
        }
        if !(0.0..1.0).contains(&self.eccentricity) {
            return invalid(format!("eccentricity {} is not elliptical", self.eccentricity));
        }
        if !(0.0..=180.0).contains(&self.inclination_deg) {
            return invalid(format!("inclination {} deg out of range", self.inclination_deg));
        }
        Ok(())
    }

    /// Orbital period in minutes
    pub fn period_minutes(&self) -> f64 {
        MINUTES_PER_DAY / self.mean_motion
    }

    /// Whether SGP4 switches to its deep-space (SDP4) branch for this orbit
    pub fn is_deep_space(&self) -> bool {
        self.period_minutes() >= DEEP_SPACE_PERIOD_MINUTES
    }

    /// Mean motion in rad/s
    pub fn mean_motion_rad_s(&self) -> f64 {
        self.mean_motion * 2.0 * PI / SECONDS_PER_DAY
    }

    /// Semi-major axis in km implied by the mean motion
    pub fn semi_major_axis_km(&self) -> f64 {
        let n = self.mean_motion_rad_s();
        (MU_EARTH_WGS72_KM3_S2 / (n * n)).cbrt()
    }

    /// Perigee and apogee altitude above the WGS-72 equator (km)
    pub fn perigee_apogee_km(&self) -> (f64, f64) {
        let a_km = self.semi_major_axis_km();
        let perigee_km = a_km * (1.0 - self.eccentricity) - EARTH_RADIUS_WGS72_KM;
        let apogee_km = a_km * (1.0 + self.eccentricity) - EARTH_RADIUS_WGS72_KM;
        (perigee_km, apogee_km)
    }

    /// COSPAR identifier such as `1994-040C`, if the designator is filled in
    pub fn cospar_id(&self) -> Option<String> {
        let designator = self.international_designator.as_str();
        if designator.len() < 5 || !designator.is_ascii() {
            return None;
        }
        let year: u32 = designator[0..2].parse().ok()?;
        let full_year = if year < 57 { 2000 + year } else { 1900 + year };
        Some(format!("{}-{}", full_year, &designator[2..]))
    }

    /// Mean elements as Keplerian elements (SI units, radians)
    pub fn keplerian(&self) -> KeplerianElements {
        KeplerianElements {
            semi_major_axis: self.semi_major_axis_km() * 1000.0,
            eccentricity: self.eccentricity,
            inclination: self.inclination_deg.to_radians(),
            raan: self.raan_deg.to_radians(),
            arg_perigee: self.arg_perigee_deg.to_radians(),
            mean_anomaly: self.mean_anomaly_deg.to_radians(),
        }
    }
}

impl fmt::Display for OrbitalElements {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (perigee_km, apogee_km) = self.perigee_apogee_km();
        writeln!(f, "Catalog number: {}", self.catalog_number)?;
        writeln!(f, "Epoch: {} (MJD2000 {:.8})", self.epoch, self.epoch.mjd2000())?;
        writeln!(
            f,
            "Inclination: {:.4} deg, RAAN: {:.4} deg, eccentricity: {:.7}",
            self.inclination_deg, self.raan_deg, self.eccentricity
        )?;
        writeln!(
            f,
            "Argument of perigee: {:.4} deg, mean anomaly: {:.4} deg",
            self.arg_perigee_deg, self.mean_anomaly_deg
        )?;
        writeln!(
            f,
            "Mean motion: {:.8} rev/day (period {:.2} min, {})",
            self.mean_motion,
            self.period_minutes(),
            if self.is_deep_space() { "SDP4" } else { "SGP4" }
        )?;
        write!(
            f,
            "Perigee/apogee altitude: {:.1} / {:.1} km, B*: {:e}",
            perigee_km, apogee_km, self.bstar
        )
    }
}

/// Trim trailing whitespace, then check length, charset, line number and checksum
fn checked_line(raw: &str, line: u8) -> Result<&str, ParseError> {
    let text = raw.trim_end();
    if !text.is_ascii() {
        return Err(ParseError::NonAscii { line });
    }
    if text.len() != TLE_LINE_LENGTH {
        return Err(ParseError::LineLength {
            line,
            length: text.len(),
            expected: TLE_LINE_LENGTH,
        });
    }

    let bytes = text.as_bytes();
    let found = bytes[0] as char;
    if found != char::from(b'0' + line) || bytes[1] != b' ' {
        return Err(ParseError::LineNumber { line, found });
    }

    let computed = checksum(&text[..TLE_LINE_LENGTH - 1]);
    let found = bytes[TLE_LINE_LENGTH - 1] as char;
    if found.to_digit(10) != Some(u32::from(computed)) {
        return Err(ParseError::Checksum {
            line,
            computed,
            found,
        });
    }
    Ok(text)
}

/// Modulo-10 sum of digits, with each minus sign counting as one
pub fn checksum(text: &str) -> u8 {
    let sum: u32 = text
        .chars()
        .map(|c| match c {
            '-' => 1,
            c => c.to_digit(10).unwrap_or(0),
        })
        .sum();
    (sum % 10) as u8
}

fn field_error(text: &str, range: std::ops::Range<usize>, line: u8, field: &'static str) -> ParseError {
    ParseError::Field {
        line,
        field,
        value: text[range].to_string(),
    }
}

fn parse_field<T: std::str::FromStr>(
    text: &str,
    range: std::ops::Range<usize>,
    line: u8,
    field: &'static str,
) -> Result<T, ParseError> {
    let raw = text[range.clone()].trim();
    // Rust's float parser also takes `nan` and `inf`, which no TLE field may hold
    if !raw
        .bytes()
        .all(|b| b.is_ascii_digit() || matches!(b, b'.' | b'+' | b'-'))
    {
        return Err(field_error(text, range, line, field));
    }
    raw.parse()
        .map_err(|_| field_error(text, range, line, field))
}

fn parse_field_or_zero(
    text: &str,
    range: std::ops::Range<usize>,
    line: u8,
    field: &'static str,
) -> Result<u32, ParseError> {
    if text[range.clone()].trim().is_empty() {
        return Ok(0);
    }
    parse_field(text, range, line, field)
}

/// Digits with an implied leading decimal point, e.g. `7258491` = 0.7258491
fn parse_implied_decimal(
    text: &str,
    range: std::ops::Range<usize>,
    line: u8,
    field: &'static str,
) -> Result<f64, ParseError> {
    let digits = text[range.clone()].trim();
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(field_error(text, range, line, field));
    }
    format!("0.{digits}")
        .parse()
        .map_err(|_| field_error(text, range, line, field))
}

/// Implied-decimal mantissa with a power-of-ten suffix, e.g. ` 76590-3` = 0.76590e-3
fn parse_exponent(
    text: &str,
    range: std::ops::Range<usize>,
    line: u8,
    field: &'static str,
) -> Result<f64, ParseError> {
    let raw = text[range.clone()].trim();
    if raw.is_empty() {
        return Ok(0.0);
    }
    let err = || field_error(text, range.clone(), line, field);

    let (sign, rest) = match raw.as_bytes()[0] {
        b'-' => (-1.0, &raw[1..]),
        b'+' => (1.0, &raw[1..]),
        _ => (1.0, raw),
    };
    let split = rest.rfind(|c| c == '-' || c == '+').ok_or_else(err)?;
    let (mantissa, exponent) = rest.split_at(split);
    let mantissa = mantissa.trim_start_matches('.');
    if mantissa.is_empty() || !mantissa.bytes().all(|b| b.is_ascii_digit()) {
        return Err(err());
    }
    let exponent: i32 = exponent.parse().map_err(|_| err())?;
    let mantissa: f64 = format!("0.{mantissa}").parse().map_err(|_| err())?;
    Ok(sign * mantissa * 10f64.powi(exponent))
}

/// Catalog numbers are five digits, or Alpha-5 (a letter standing for 10-33, skipping I and O)
fn parse_catalog_number(field: &str, line: u8) -> Result<u32, ParseError> {
    let err = || ParseError::Field {
        line,
        field: "catalog number",
        value: field.to_string(),
    };
    let trimmed = field.trim();
    let first = trimmed.chars().next().ok_or_else(err)?;
    if first.is_ascii_uppercase() {
        let rest: u32 = trimmed[1..].parse().map_err(|_| err())?;
        let prefix = match first {
            'I' | 'O' => return Err(err()),
            'A'..='H' => first as u32 - 'A' as u32 + 10,
            'J'..='N' => first as u32 - 'A' as u32 + 9,
            _ => first as u32 - 'A' as u32 + 8,
        };
        Ok(prefix * 10_000 + rest)
    } else {
        trimmed.parse().map_err(|_| err())
    }
}
