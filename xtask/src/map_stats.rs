// Licensed under the Apache-2.0 license

use anyhow::Result;
use clap::ValueEnum;
use std::io::Write;
use std::path::Path;
use wbuild_builder::map_stats::StatsReport;
use wbuild_builder::{Headings, MemoryUsage};

/// Language of the headings in the map file. GNU ld translates them
/// according to the locale it runs under.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub(crate) enum MapLanguage {
    #[default]
    English,
    Italian,
}

impl MapLanguage {
    pub(crate) fn headings(self) -> &'static Headings {
        match self {
            MapLanguage::English => &Headings::ENGLISH,
            MapLanguage::Italian => &Headings::ITALIAN,
        }
    }
}

pub(crate) fn map_stats(map: &Path, json: bool, language: MapLanguage) -> Result<()> {
    let usage = MemoryUsage::from_map_file_with(map, language.headings())?;
    let mut out = std::io::stdout().lock();
    write_usage(&usage, json, &mut out)
}

fn write_usage(usage: &MemoryUsage, json: bool, out: &mut impl Write) -> Result<()> {
    if json {
        serde_json::to_writer_pretty(&mut *out, usage)?;
        writeln!(out)?;
    } else {
        write!(out, "{}", StatsReport::new(usage))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn usage() -> MemoryUsage {
        MemoryUsage::parse(
            "Memory Configuration\nRAM 0x80000000 0x4000\nLinker script and memory map\n.bss 0x80001000 0x180\n".as_bytes(),
            &Headings::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_json() {
        let mut out = Vec::new();
        write_usage(&usage(), true, &mut out).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(value["regions"][0]["name"], "RAM");
        assert_eq!(value["regions"][0]["used"], 0x180);
        assert_eq!(value["sections"][".bss"]["region"], "RAM");
        assert_eq!(value["sections"][".bss"]["fill"], 0);
    }

    #[test]
    fn test_tables() {
        let mut out = Vec::new();
        write_usage(&usage(), false, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("      2.34   .bss                         384 (0)           RAM"));
    }

    #[test]
    fn test_missing_map() {
        let dir = tempfile::tempdir().unwrap();
        assert!(map_stats(&dir.path().join("none.map"), false, MapLanguage::English).is_err());
    }

    #[test]
    fn test_language_headings() {
        assert_eq!(MapLanguage::default().headings(), &Headings::default());
        assert_eq!(
            MapLanguage::Italian.headings().memory_configuration,
            "Configurazione della memoria"
        );
    }
}
