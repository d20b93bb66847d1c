// Licensed under the Apache-2.0 license

//! Memory usage statistics from a GNU ld map file.
//!
//! The map file is scanned once, top to bottom. Rows of the
//! `Memory Configuration` table become [`MemoryRegion`]s; output section
//! records after the `Linker script and memory map` heading become
//! [`OutputSection`]s, with any `*fill*` padding that follows a section
//! charged to it. Each section is then attributed to the region containing
//! its start address.

mod report;
mod scan;

pub use report::StatsReport;

use scan::MapScanner;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MapStatsError {
    #[error("could not open map file {path:?}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed reading map file {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Heading lines that switch the scanner between the parts of a map file.
///
/// GNU ld translates these when run under a non-English locale, so the
/// defaults only match maps produced with `LC_ALL=C` or an English locale.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Headings {
    pub memory_configuration: &'static str,
    pub memory_map: &'static str,
}

impl Headings {
    pub const ENGLISH: Headings = Headings {
        memory_configuration: "Memory Configuration",
        memory_map: "Linker script and memory map",
    };
    pub const ITALIAN: Headings = Headings {
        memory_configuration: "Configurazione della memoria",
        memory_map: "Script del linker e mappa della memoria",
    };
}

impl Default for Headings {
    fn default() -> Self {
        Self::ENGLISH
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryRegion {
    pub name: String,
    pub origin: u64,
    pub length: u64,
    pub used: u64,
}

impl MemoryRegion {
    /// Whether `addr` falls in `[origin, origin + length)`.
    pub fn contains(&self, addr: u64) -> bool {
        addr >= self.origin && addr - self.origin < self.length
    }

    /// `bytes` as a percentage of the region length, or `None` for a
    /// zero-length region.
    pub fn percent_of(&self, bytes: u64) -> Option<f64> {
        if self.length == 0 {
            None
        } else {
            Some(100.0 * bytes as f64 / self.length as f64)
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputSection {
    pub name: String,
    pub start: u64,
    pub size: u64,
    pub fill: u64,
    /// Name of the region holding `start`, if any.
    pub region: Option<String>,
}

/// Regions in map file order and output sections sorted by name.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryUsage {
    pub regions: Vec<MemoryRegion>,
    pub sections: BTreeMap<String, OutputSection>,
}

impl MemoryUsage {
    pub fn from_map_file(path: &Path) -> Result<Self, MapStatsError> {
        Self::from_map_file_with(path, &Headings::default())
    }

    /// Like [`MemoryUsage::from_map_file`], for a map written by a linker
    /// running under another locale.
    pub fn from_map_file_with(path: &Path, headings: &Headings) -> Result<Self, MapStatsError> {
        let file = File::open(path).map_err(|source| MapStatsError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(BufReader::new(file), headings).map_err(|source| MapStatsError::Read {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn parse(reader: impl BufRead, headings: &Headings) -> io::Result<Self> {
        let mut usage = MapScanner::new(headings).scan(reader)?;
        usage.attribute_sections();
        Ok(usage)
    }

    pub fn region(&self, name: &str) -> Option<&MemoryRegion> {
        self.regions.iter().find(|r| r.name == name)
    }

    pub fn section(&self, name: &str) -> Option<&OutputSection> {
        self.sections.get(name)
    }

    /// Charges every section to the first region, in map file order, whose
    /// address range contains the section start.
    fn attribute_sections(&mut self) {
        for section in self.sections.values_mut() {
            let mut candidates = self
                .regions
                .iter()
                .enumerate()
                .filter(|(_, r)| r.contains(section.start))
                .map(|(i, _)| i);
            let Some(idx) = candidates.next() else {
                log::debug!(
                    "Section {} at 0x{:x} is outside every memory region",
                    section.name,
                    section.start
                );
                continue;
            };
            let overlapping: Vec<&str> = candidates
                .map(|i| self.regions[i].name.as_str())
                .collect();
            if !overlapping.is_empty() {
                log::warn!(
                    "Section {} at 0x{:x} also lies in {:?}; counting it against {}",
                    section.name,
                    section.start,
                    overlapping,
                    self.regions[idx].name
                );
            }
            let region = &mut self.regions[idx];
            region.used = region.used.saturating_add(section.size);
            section.region = Some(region.name.clone());
        }

        for region in self.regions.iter().filter(|r| r.used > r.length) {
            log::warn!(
                "Memory region {} is overcommitted: {} bytes used of {}",
                region.name,
                region.used,
                region.length
            );
        }
    }
}
