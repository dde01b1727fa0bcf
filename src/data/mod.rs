//! TLE records, their decoding, and loading them from catalog files

mod loader;
mod tle;

pub use loader::*;
pub use tle::*;
