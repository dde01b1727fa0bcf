//! tle-planet - TLE-backed planet ephemerides
//!
//! Command line front end for inspecting element sets, querying state
//! vectors, sampling tracks and saving planets for later runs.

mod cli;

use anyhow::Result;
use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "tle-planet", version, about = "Ephemerides of Earth satellites from TLEs")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show the decoded element set and planet identity
    Info(cli::InfoArgs),
    /// Position and velocity at one epoch, as JSON
    Eph(cli::EphArgs),
    /// Sample the ephemeris over a time span into a JSON file
    Track(cli::TrackArgs),
    /// Write the planet in its saved JSON form
    Save(cli::SaveArgs),
    /// List the available propagation models
    Oracles,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match Cli::parse().command {
        Command::Info(args) => cli::run_info(args),
        Command::Eph(args) => cli::run_eph(args),
        Command::Track(args) => cli::run_track(args),
        Command::Save(args) => cli::run_save(args),
        Command::Oracles => cli::list_oracles(),
    }
}
