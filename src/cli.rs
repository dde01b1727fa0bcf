use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use nalgebra::Vector3;
use serde::Serialize;

use tle_planet::data::{self, TleRecord, EARTH_RADIUS_WGS72_KM};
use tle_planet::epoch::Epoch;
use tle_planet::planet::{SavedTlePlanet, TlePlanet};
use tle_planet::propagation::{
    EphemerisSettings, Frame, KeplerOracle, OracleType, SatkitSgp4, Sgp4Oracle, StateVector,
};

/// Where the element set comes from
///
/// With no source flags the built-in sample element set is used.
#[derive(Args, Debug, Clone)]
pub struct SourceArgs {
    /// TLE line 1 (requires --line2)
    #[arg(long, requires = "line2", conflicts_with_all = ["catalog", "saved"])]
    pub line1: Option<String>,
    /// TLE line 2 (requires --line1)
    #[arg(long, requires = "line1")]
    pub line2: Option<String>,
    /// 2-line or 3-line TLE catalog, optionally gzipped
    #[arg(long, requires = "norad", conflicts_with = "saved")]
    pub catalog: Option<PathBuf>,
    /// Catalog number to pick from --catalog
    #[arg(long)]
    pub norad: Option<u32>,
    /// Planet previously written by `save`
    #[arg(long)]
    pub saved: Option<PathBuf>,
    /// Propagation model
    #[arg(long, value_enum, default_value_t = OracleType::Sgp4)]
    pub oracle: OracleType,
    /// Warn when querying further than this many days from the element epoch
    #[arg(long, default_value_t = 30.0)]
    pub stale_after_days: f64,
}

impl SourceArgs {
    fn settings(&self, frame: Frame) -> EphemerisSettings {
        let base = match self.oracle {
            OracleType::Sgp4 => EphemerisSettings::default(),
            OracleType::Kepler => EphemerisSettings::kepler(),
        };
        base.with_frame(frame)
            .with_stale_after_days(self.stale_after_days)
    }
}

#[derive(Args, Debug, Clone)]
pub struct InfoArgs {
    #[command(flatten)]
    pub source: SourceArgs,
}

#[derive(Args, Debug, Clone)]
pub struct EphArgs {
    #[command(flatten)]
    pub source: SourceArgs,
    /// Query epoch (RFC 3339, `YYYY-MM-DD[ HH:MM:SS]`, or `mjd2000:<days>`); defaults to the element epoch
    #[arg(long)]
    pub at: Option<Epoch>,
    /// Frame of the reported vectors
    #[arg(long, value_enum, default_value_t = Frame::Gcrf)]
    pub frame: Frame,
}

#[derive(Args, Debug, Clone)]
pub struct TrackArgs {
    #[command(flatten)]
    pub source: SourceArgs,
    /// Output JSON file path
    #[arg(long, default_value = "out/track.json")]
    pub output: PathBuf,
    /// First sample; defaults to the element epoch
    #[arg(long)]
    pub start: Option<Epoch>,
    /// Time span in hours
    #[arg(long, default_value_t = 24.0)]
    pub hours: f64,
    /// Sample spacing in seconds
    #[arg(long, default_value_t = 60)]
    pub step_seconds: u64,
    /// Frame of the reported vectors
    #[arg(long, value_enum, default_value_t = Frame::Gcrf)]
    pub frame: Frame,
}

#[derive(Args, Debug, Clone)]
pub struct SaveArgs {
    #[command(flatten)]
    pub source: SourceArgs,
    /// Output JSON file path
    #[arg(long, default_value = "out/planet.json")]
    pub output: PathBuf,
    /// Override the planet name
    #[arg(long)]
    pub name: Option<String>,
}

enum Source {
    Record { record: TleRecord, name: Option<String> },
    Saved(SavedTlePlanet),
}

fn resolve_source(args: &SourceArgs) -> Result<Source> {
    if let (Some(line1), Some(line2)) = (&args.line1, &args.line2) {
        return Ok(Source::Record {
            record: TleRecord::new(line1.as_str(), line2.as_str()),
            name: None,
        });
    }

    if let Some(path) = &args.catalog {
        let norad = args
            .norad
            .ok_or_else(|| anyhow!("--catalog needs --norad"))?;
        let entries = data::load_tle_catalog(path)
            .with_context(|| format!("Failed to load TLE catalog: {:?}", path))?;
        let entry = data::find_by_catalog_number(&entries, norad)
            .ok_or_else(|| anyhow!("catalog number {} not found in {:?}", norad, path))?;
        return Ok(Source::Record {
            record: entry.record.clone(),
            name: entry.name.clone(),
        });
    }

    if let Some(path) = &args.saved {
        let saved = data::load_saved_planet(path)
            .with_context(|| format!("Failed to read saved planet: {:?}", path))?;
        return Ok(Source::Saved(saved));
    }

    log::info!("No element set given, using the built-in sample");
    Ok(Source::Record {
        record: TleRecord::default(),
        name: None,
    })
}

fn build_planet<O: Sgp4Oracle>(source: Source, oracle: O) -> Result<TlePlanet<O>> {
    let planet = match source {
        Source::Record { record, name } => {
            let planet = TlePlanet::with_oracle(record, oracle)?;
            match name {
                Some(name) => planet.with_name(name),
                None => planet,
            }
        }
        Source::Saved(saved) => TlePlanet::restore_with(saved, oracle)?,
    };
    log::debug!("Built planet {}", planet.identity().name);
    Ok(planet)
}

/// Build the planet with the requested oracle and hand it to a generic runner
macro_rules! with_planet {
    ($source:expr, |$planet:ident| $body:expr) => {{
        let source = resolve_source($source)?;
        match $source.oracle {
            OracleType::Sgp4 => {
                let $planet = build_planet(source, SatkitSgp4)?;
                $body
            }
            OracleType::Kepler => {
                let $planet = build_planet(source, KeplerOracle::default())?;
                $body
            }
        }
    }};
}

fn warn_if_stale<O: Sgp4Oracle>(planet: &TlePlanet<O>, settings: &EphemerisSettings, when: Epoch) {
    let age = planet.tle_age_days(when);
    if settings.is_stale(age) {
        log::warn!(
            "Querying {} {:.1} days from its element epoch; SGP4 accuracy degrades quickly",
            planet.identity().name,
            age
        );
    }
}

pub fn run_info(args: InfoArgs) -> Result<()> {
    with_planet!(&args.source, |planet| print_info(&planet))
}

fn print_info<O: Sgp4Oracle>(planet: &TlePlanet<O>) -> Result<()> {
    let elements = planet.elements();
    let (perigee, apogee) = elements.perigee_apogee_km();

    println!("{}", planet);
    println!();
    println!("{}", elements);
    println!(
        "  period {:.2} min, perigee {:.1} km, apogee {:.1} km ({})",
        elements.period_minutes(),
        perigee,
        apogee,
        if elements.is_deep_space() { "deep space" } else { "near Earth" }
    );
    println!(
        "  element set is {:.1} days old",
        planet.tle_age_days(Epoch::now())
    );
    Ok(())
}

fn xyz(v: &Vector3<f64>) -> [f64; 3] {
    [v.x, v.y, v.z]
}

#[derive(Debug, Serialize)]
struct EphemerisRecord {
    name: String,
    epoch_utc: String,
    mjd2000: f64,
    frame: Frame,
    position_m: [f64; 3],
    velocity_m_s: [f64; 3],
    altitude_km: f64,
    tle_age_days: f64,
}

impl EphemerisRecord {
    fn new(name: &str, state: &StateVector, tle_age_days: f64) -> Self {
        Self {
            name: name.to_string(),
            epoch_utc: state.epoch.to_string(),
            mjd2000: state.epoch.mjd2000(),
            frame: state.frame,
            position_m: xyz(&state.position),
            velocity_m_s: xyz(&state.velocity),
            altitude_km: state.radius() / 1000.0 - EARTH_RADIUS_WGS72_KM,
            tle_age_days,
        }
    }
}

pub fn run_eph(args: EphArgs) -> Result<()> {
    let settings = args.source.settings(args.frame);
    with_planet!(&args.source, |planet| print_eph(&planet, &settings, args.at))
}

fn print_eph<O: Sgp4Oracle>(
    planet: &TlePlanet<O>,
    settings: &EphemerisSettings,
    at: Option<Epoch>,
) -> Result<()> {
    let when = at.unwrap_or_else(|| planet.reference_epoch());
    warn_if_stale(planet, settings, when);

    let state = planet
        .eph_in(when, settings.output_frame)
        .with_context(|| format!("Failed to propagate {} to {}", planet.identity().name, when))?;
    let record = EphemerisRecord::new(&planet.identity().name, &state, planet.tle_age_days(when));
    println!("{}", serde_json::to_string_pretty(&record)?);
    Ok(())
}

#[derive(Debug, Serialize)]
struct TrackSample {
    epoch_utc: String,
    mjd2000: f64,
    position_m: [f64; 3],
    velocity_m_s: [f64; 3],
}

#[derive(Debug, Serialize)]
struct TrackFailure {
    mjd2000: f64,
    error: String,
}

#[derive(Debug, Serialize)]
struct TrackFile {
    generated_at: String,
    planet: SavedTlePlanet,
    oracle: &'static str,
    frame: Frame,
    start_utc: String,
    hours: f64,
    step_seconds: u64,
    samples: Vec<TrackSample>,
    failures: Vec<TrackFailure>,
}

/// Largest number of steps a single track may hold
const MAX_TRACK_STEPS: u64 = 1_000_000;

/// Number of steps after the start sample, checked against [`MAX_TRACK_STEPS`]
fn track_steps(hours: f64, step_seconds: u64) -> Result<u64> {
    if step_seconds == 0 {
        return Err(anyhow!("step-seconds must be > 0"));
    }
    if hours <= 0.0 || !hours.is_finite() {
        return Err(anyhow!("hours must be > 0"));
    }
    let steps = ((hours * 3600.0) / step_seconds as f64).ceil();
    if steps > MAX_TRACK_STEPS as f64 {
        return Err(anyhow!(
            "{} hours at {} s steps needs {} samples, the limit is {}; use a larger --step-seconds",
            hours,
            step_seconds,
            steps,
            MAX_TRACK_STEPS
        ));
    }
    Ok(steps as u64)
}

pub fn run_track(args: TrackArgs) -> Result<()> {
    track_steps(args.hours, args.step_seconds)?;
    let settings = args.source.settings(args.frame);
    with_planet!(&args.source, |planet| write_track(&planet, &settings, &args))
}

fn write_track<O: Sgp4Oracle>(
    planet: &TlePlanet<O>,
    settings: &EphemerisSettings,
    args: &TrackArgs,
) -> Result<()> {
    let start = args.start.unwrap_or_else(|| planet.reference_epoch());
    let steps = track_steps(args.hours, args.step_seconds)?;
    let end = start.add_seconds(steps as f64 * args.step_seconds as f64);
    warn_if_stale(planet, settings, start);
    warn_if_stale(planet, settings, end);

    log::info!(
        "Sampling {} for {} hours ({} samples)...",
        planet.identity().name,
        args.hours,
        steps + 1
    );

    let progress = ProgressBar::new(steps + 1);
    progress.set_style(
        ProgressStyle::with_template(
            "{elapsed_precise} {bar:40.cyan/blue} {pos}/{len} {percent}% ETA {eta_precise}",
        )?
        .progress_chars("##-"),
    );

    let mut samples = Vec::with_capacity(steps as usize + 1);
    let mut failures = Vec::new();
    for step in 0..=steps {
        let when = start.add_seconds(step as f64 * args.step_seconds as f64);
        match planet.eph_in(when, settings.output_frame) {
            Ok(state) => samples.push(TrackSample {
                epoch_utc: when.to_string(),
                mjd2000: when.mjd2000(),
                position_m: xyz(&state.position),
                velocity_m_s: xyz(&state.velocity),
            }),
            Err(e) => failures.push(TrackFailure {
                mjd2000: when.mjd2000(),
                error: e.to_string(),
            }),
        }
        progress.inc(1);
    }
    progress.finish_and_clear();

    if !failures.is_empty() {
        log::warn!("{} of {} samples failed to propagate", failures.len(), steps + 1);
    }

    let track = TrackFile {
        generated_at: chrono::Utc::now().to_rfc3339(),
        planet: planet.saved(),
        oracle: planet.oracle().name(),
        frame: settings.output_frame,
        start_utc: start.to_string(),
        hours: args.hours,
        step_seconds: args.step_seconds,
        samples,
        failures,
    };

    if let Some(parent) = args.output.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let file = std::fs::File::create(&args.output)
        .with_context(|| format!("Failed to create {:?}", args.output))?;
    serde_json::to_writer_pretty(file, &track)?;
    log::info!("Wrote {} samples to {:?}", track.samples.len(), args.output);
    Ok(())
}

pub fn run_save(args: SaveArgs) -> Result<()> {
    with_planet!(&args.source, |planet| save(planet, &args))
}

fn save<O: Sgp4Oracle>(planet: TlePlanet<O>, args: &SaveArgs) -> Result<()> {
    let planet = match &args.name {
        Some(name) => planet.with_name(name.as_str()),
        None => planet,
    };
    if let Some(parent) = args.output.parent() {
        std::fs::create_dir_all(parent)?;
    }
    data::save_planet(&planet, &args.output)
        .with_context(|| format!("Failed to save planet to {:?}", args.output))?;
    Ok(())
}

pub fn list_oracles() -> Result<()> {
    for oracle in OracleType::all() {
        println!("{:8} {}", format!("{:?}", oracle).to_lowercase(), oracle.name());
        println!("         {}", oracle.description());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_track_steps() {
        assert_eq!(track_steps(24.0, 60).unwrap(), 1440);
        // A partial final step still gets a sample
        assert_eq!(track_steps(1.0, 7).unwrap(), 515);
        assert_eq!(track_steps(1e-6, 3600).unwrap(), 1);
    }

    #[test]
    fn test_track_steps_rejects_bad_arguments() {
        assert!(track_steps(24.0, 0).is_err());
        assert!(track_steps(0.0, 60).is_err());
        assert!(track_steps(-1.0, 60).is_err());
        assert!(track_steps(f64::NAN, 60).is_err());
        assert!(track_steps(f64::INFINITY, 60).is_err());
    }

    #[test]
    fn test_track_steps_are_capped() {
        let err = track_steps(1e12, 60).unwrap_err();
        assert!(err.to_string().contains("limit"), "{err}");

        // 5000 hours at 18 s lands exactly on the limit
        assert_eq!(track_steps(5000.0, 18).unwrap(), MAX_TRACK_STEPS);
        assert!(track_steps(5000.01, 18).is_err());
    }
}
