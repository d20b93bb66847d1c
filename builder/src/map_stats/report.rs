// Licensed under the Apache-2.0 license

use super::{MemoryRegion, MemoryUsage};
use std::fmt;

const BANNER: &str = "########################";
const SECTION_RULE_WIDTH: usize = 77;
const REGION_RULE_WIDTH: usize = 60;

/// Text report of a [`MemoryUsage`], optionally preceded by the output of
/// the toolchain `size` tool.
///
/// ```text
/// ~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~
///   Uses [%]   Output Sections      Size [byte] (fill)        Memory
/// ~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~
///      78.27   .bss                     1538872 (15)          LIM
///      16.09   .text                     316400 (242)         LIM
///
/// ~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~
///   Used [%]   Memory               Size [byte] (used)
/// ~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~
///      97.91   LIM                      1966080 (1924912)
/// ```
pub struct StatsReport<'a> {
    usage: &'a MemoryUsage,
    size_report: Option<&'a str>,
}

impl<'a> StatsReport<'a> {
    pub fn new(usage: &'a MemoryUsage) -> Self {
        Self {
            usage,
            size_report: None,
        }
    }

    pub fn with_size_report(mut self, size_report: &'a str) -> Self {
        self.size_report = Some(size_report);
        self
    }

    fn section_table(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rule = "~".repeat(SECTION_RULE_WIDTH);
        writeln!(f)?;
        writeln!(f, "{rule}")?;
        line(
            f,
            format!(
                "{:>10}{:<20}{:>15}{:<15}{:<15}",
                "Uses [%]", "   Output Sections", "Size [byte]", " (fill)", "Memory"
            ),
        )?;
        writeln!(f, "{rule}")?;
        for section in self.usage.sections.values() {
            let Some(region) = section
                .region
                .as_deref()
                .and_then(|name| self.usage.region(name))
            else {
                continue;
            };
            line(
                f,
                format!(
                    "{:>10}{:<20}{:>15}{:<15}{:<15}",
                    percent(region, section.size),
                    format!("   {}", section.name),
                    section.size,
                    format!(" ({})", section.fill),
                    region.name
                ),
            )?;
        }
        Ok(())
    }

    fn region_table(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rule = "~".repeat(REGION_RULE_WIDTH);
        writeln!(f)?;
        writeln!(f, "{rule}")?;
        line(
            f,
            format!(
                "{:>10}{:<20}{:>15}{:<15}",
                "Used [%]", "   Memory", "Size [byte]", " (used)"
            ),
        )?;
        writeln!(f, "{rule}")?;
        for region in self.usage.regions.iter().filter(|r| r.used > 0) {
            line(
                f,
                format!(
                    "{:>10}{:<20}{:>15}{:<15}",
                    percent(region, region.used),
                    format!("   {}", region.name),
                    region.length,
                    format!(" ({})", region.used)
                ),
            )?;
        }
        Ok(())
    }
}

impl fmt::Display for StatsReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f)?;
        writeln!(f, "{BANNER}")?;
        writeln!(f, "Size Information Below")?;
        writeln!(f, "{BANNER}")?;
        if let Some(size_report) = self.size_report {
            writeln!(f)?;
            write!(f, "{size_report}")?;
            if !size_report.ends_with('\n') {
                writeln!(f)?;
            }
        }
        self.section_table(f)?;
        self.region_table(f)?;
        writeln!(f)?;
        writeln!(f, "{BANNER}")
    }
}

fn line(f: &mut fmt::Formatter<'_>, text: String) -> fmt::Result {
    writeln!(f, "{}", text.trim_end())
}

fn percent(region: &MemoryRegion, bytes: u64) -> String {
    match region.percent_of(bytes) {
        Some(pct) => format!("{pct:.2}"),
        None => {
            log::warn!("Memory region {} has zero length", region.name);
            "n/a".to_string()
        }
    }
}
