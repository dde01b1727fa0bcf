//! Loading TLE catalogs and saved planets from disk

use std::fs::File;
use std::io::{BufReader, BufWriter, Read};
use std::path::Path;

use flate2::read::GzDecoder;

use super::tle::TleRecord;
use crate::error::{Error, Result};
use crate::planet::{SavedTlePlanet, TlePlanet};
use crate::propagation::Sgp4Oracle;

/// One element set from a catalog file, with its name line if the catalog had one
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogEntry {
    pub name: Option<String>,
    pub record: TleRecord,
    /// 1-based line number of line 1 in the source text
    pub line: usize,
}

impl CatalogEntry {
    pub fn catalog_number(&self) -> Option<u32> {
        self.record.catalog_number()
    }
}

/// Parse a 2-line or 3-line TLE catalog
///
/// Name lines may carry the `0 ` prefix used by 3LE files. Blank lines are
/// skipped. Element lines are not validated here; that happens when a planet
/// is built from the record.
pub fn parse_tle_catalog(text: &str) -> Result<Vec<CatalogEntry>> {
    let mut entries = Vec::new();
    let mut name: Option<String> = None;
    let mut lines = text
        .lines()
        .enumerate()
        .map(|(i, l)| (i + 1, l.trim_end()))
        .filter(|(_, l)| !l.is_empty());

    while let Some((number, line)) = lines.next() {
        if line.starts_with("1 ") {
            let (_, line2) = lines.next().ok_or_else(|| Error::Catalog {
                line: number,
                message: "line 1 without a following line 2".to_string(),
            })?;
            if !line2.starts_with("2 ") {
                return Err(Error::Catalog {
                    line: number + 1,
                    message: format!("expected line 2, found {:?}", line2),
                });
            }
            entries.push(CatalogEntry {
                name: name.take(),
                record: TleRecord::new(line, line2),
                line: number,
            });
        } else if line.starts_with("2 ") {
            return Err(Error::Catalog {
                line: number,
                message: "line 2 without a preceding line 1".to_string(),
            });
        } else if let Some(previous) = name.replace(clean_name(line)) {
            log::debug!("Name line {:?} has no element set, ignoring", previous);
        }
    }

    Ok(entries)
}

fn clean_name(line: &str) -> String {
    line.strip_prefix("0 ").unwrap_or(line).trim().to_string()
}

/// Load a TLE catalog, transparently decompressing `.gz` files
pub fn load_tle_catalog(path: impl AsRef<Path>) -> Result<Vec<CatalogEntry>> {
    let path = path.as_ref();
    log::info!("Loading TLE catalog from {:?}", path);

    let reader = BufReader::new(File::open(path)?);
    let mut text = String::new();
    if path.extension().is_some_and(|ext| ext == "gz") {
        GzDecoder::new(reader).read_to_string(&mut text)?;
    } else {
        let mut reader = reader;
        reader.read_to_string(&mut text)?;
    }

    let entries = parse_tle_catalog(&text)?;
    log::info!("Loaded {} element sets", entries.len());
    Ok(entries)
}

/// Find the element set for one catalog number
pub fn find_by_catalog_number(entries: &[CatalogEntry], catalog_number: u32) -> Option<&CatalogEntry> {
    entries
        .iter()
        .find(|entry| entry.catalog_number() == Some(catalog_number))
}

/// Write a planet's saved form as pretty JSON
pub fn save_planet<O: Sgp4Oracle>(planet: &TlePlanet<O>, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(writer, &planet.saved())?;
    log::info!("Saved planet {} to {:?}", planet.identity().name, path);
    Ok(())
}

/// Read a saved planet without rebuilding it
pub fn load_saved_planet(path: impl AsRef<Path>) -> Result<SavedTlePlanet> {
    let path = path.as_ref();
    log::info!("Loading saved planet from {:?}", path);
    let reader = BufReader::new(File::open(path)?);
    Ok(serde_json::from_reader(reader)?)
}

/// Read and rebuild a saved planet with the given oracle
pub fn load_planet_with<O: Sgp4Oracle>(path: impl AsRef<Path>, oracle: O) -> Result<TlePlanet<O>> {
    let saved = load_saved_planet(path)?;
    Ok(TlePlanet::restore_with(saved, oracle)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{DEFAULT_LINE1, DEFAULT_LINE2};

    const ISS_LINE1: &str = "1 25544U 98067A   08264.51782528 -.00002182  00000-0 -11606-4 0  2927";
    const ISS_LINE2: &str = "2 25544  51.6416 247.4627 0006703 130.5360 325.0288 15.72125391563537";

    #[test]
    fn test_two_line_catalog() {
        let text = format!("{DEFAULT_LINE1}\n{DEFAULT_LINE2}\n\n{ISS_LINE1}\n{ISS_LINE2}\n");
        let entries = parse_tle_catalog(&text).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].name, None);
        assert_eq!(entries[0].catalog_number(), Some(23177));
        assert_eq!(entries[1].line, 4);
        assert_eq!(entries[1].record, TleRecord::new(ISS_LINE1, ISS_LINE2));
    }

    #[test]
    fn test_three_line_catalog() {
        let text = format!("0 ISS (ZARYA)\r\n{ISS_LINE1}\r\n{ISS_LINE2}\r\nSAMPLE\n{DEFAULT_LINE1}\n{DEFAULT_LINE2}\n");
        let entries = parse_tle_catalog(&text).unwrap();
        assert_eq!(entries[0].name.as_deref(), Some("ISS (ZARYA)"));
        assert_eq!(entries[1].name.as_deref(), Some("SAMPLE"));

        let found = find_by_catalog_number(&entries, 25544).unwrap();
        assert_eq!(found.record.line2(), ISS_LINE2);
        assert!(find_by_catalog_number(&entries, 1).is_none());
    }

    #[test]
    fn test_dangling_lines() {
        let missing_line2 = format!("{ISS_LINE1}\n");
        assert!(matches!(
            parse_tle_catalog(&missing_line2),
            Err(Error::Catalog { line: 1, .. })
        ));

        let orphan_line2 = format!("NAME\n{ISS_LINE2}\n");
        assert!(matches!(
            parse_tle_catalog(&orphan_line2),
            Err(Error::Catalog { line: 2, .. })
        ));
    }
}
