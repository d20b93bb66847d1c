// Licensed under the Apache-2.0 license

use super::{Headings, MemoryRegion, MemoryUsage, OutputSection};
use regex::{Captures, Regex};
use std::collections::btree_map::Entry;
use std::io::{self, BufRead};
use std::sync::LazyLock;

// All patterns are anchored at the start of the line. Indented lines in the
// memory map describe input sections and are skipped, except `*fill*`.
static MEMORY_ROW: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<name>\w+)\s+(?P<origin>0x[0-9a-fA-F]+)\s+(?P<length>0x[0-9a-fA-F]+)")
        .unwrap()
});
static SECTION_ONE_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<name>\.\S+)\s+(?P<start>0x[0-9a-fA-F]+)\s+(?P<size>0x[0-9a-fA-F]+)").unwrap()
});
static SECTION_NAME_ONLY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?P<name>\.\S+)$").unwrap());
static SECTION_CONTINUATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s+(?P<start>0x[0-9a-fA-F]+)\s+(?P<size>0x[0-9a-fA-F]+)").unwrap()
});
static FILL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*\*fill\*\s+(?P<addr>0x[0-9a-fA-F]+)\s+(?P<length>0x[0-9a-fA-F]+)").unwrap()
});

fn hex(caps: &Captures, group: &str) -> Option<u64> {
    u64::from_str_radix(caps[group].trim_start_matches("0x"), 16).ok()
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum ScanState {
    Idle,
    Memories,
    /// `current` is the section that `*fill*` records are charged to.
    Sections { current: Option<String> },
}

/// Line source with an explicit one-line advance for two-line records.
///
/// Object paths in a map are not guaranteed to be UTF-8; invalid bytes are
/// replaced rather than failing the whole scan.
struct MapLines<B> {
    reader: B,
    buf: Vec<u8>,
    line_no: usize,
}

impl<B: BufRead> MapLines<B> {
    fn new(reader: B) -> Self {
        Self {
            reader,
            buf: Vec::new(),
            line_no: 0,
        }
    }

    fn advance(&mut self) -> io::Result<Option<String>> {
        self.buf.clear();
        if self.reader.read_until(b'\n', &mut self.buf)? == 0 {
            return Ok(None);
        }
        self.line_no += 1;
        if self.buf.ends_with(b"\n") {
            self.buf.pop();
            if self.buf.ends_with(b"\r") {
                self.buf.pop();
            }
        }
        let line = String::from_utf8_lossy(&self.buf);
        if let std::borrow::Cow::Owned(_) = line {
            log::debug!("Line {}: replaced invalid UTF-8", self.line_no);
        }
        Ok(Some(line.into_owned()))
    }
}

pub(super) struct MapScanner<'h> {
    headings: &'h Headings,
    state: ScanState,
    usage: MemoryUsage,
}

impl<'h> MapScanner<'h> {
    pub(super) fn new(headings: &'h Headings) -> Self {
        Self {
            headings,
            state: ScanState::Idle,
            usage: MemoryUsage::default(),
        }
    }

    /// Consumes the map file. Sections are not yet attributed to regions.
    pub(super) fn scan(mut self, reader: impl BufRead) -> io::Result<MemoryUsage> {
        let mut lines = MapLines::new(reader);
        while let Some(line) = lines.advance()? {
            self.classify(&line);
            match self.state {
                ScanState::Idle => {}
                ScanState::Memories => self.memory_row(&line),
                ScanState::Sections { .. } => self.section_line(&line, &mut lines)?,
            }
        }
        Ok(self.usage)
    }

    fn classify(&mut self, line: &str) {
        if line.starts_with(self.headings.memory_configuration) {
            self.state = ScanState::Memories;
        } else if line.starts_with(self.headings.memory_map) {
            self.state = ScanState::Idle;
        } else if line.starts_with('.') && !matches!(self.state, ScanState::Sections { .. }) {
            self.state = ScanState::Sections { current: None };
        }
    }

    fn memory_row(&mut self, line: &str) {
        let Some(caps) = MEMORY_ROW.captures(line) else {
            return;
        };
        let (Some(origin), Some(length)) = (hex(&caps, "origin"), hex(&caps, "length")) else {
            return;
        };
        let region = MemoryRegion {
            name: caps["name"].to_string(),
            origin,
            length,
            used: 0,
        };
        match self.usage.regions.iter_mut().find(|r| r.name == region.name) {
            Some(existing) => *existing = region,
            None => self.usage.regions.push(region),
        }
    }

    fn section_line<B: BufRead>(&mut self, line: &str, lines: &mut MapLines<B>) -> io::Result<()> {
        if let Some(caps) = SECTION_ONE_LINE.captures(line) {
            if let (Some(start), Some(size)) = (hex(&caps, "start"), hex(&caps, "size")) {
                self.open_section(&caps["name"], start, size);
            }
            return Ok(());
        }

        if let Some(caps) = SECTION_NAME_ONLY.captures(line) {
            let name = &caps["name"];
            let Some(next) = lines.advance()? else {
                return Ok(());
            };
            let values = SECTION_CONTINUATION
                .captures(&next)
                .and_then(|caps| Some((hex(&caps, "start")?, hex(&caps, "size")?)));
            match values {
                Some((start, size)) => self.open_section(name, start, size),
                None => log::debug!(
                    "Line {}: no address and size following section {}",
                    lines.line_no,
                    name
                ),
            }
            return Ok(());
        }

        if let Some(caps) = FILL.captures(line) {
            let Some(length) = hex(&caps, "length") else {
                return Ok(());
            };
            let ScanState::Sections { current } = &self.state else {
                return Ok(());
            };
            match current.as_ref().and_then(|name| self.usage.sections.get_mut(name)) {
                Some(section) => section.fill = section.fill.saturating_add(length),
                None => log::debug!(
                    "Line {}: ignoring {} fill bytes outside any output section",
                    lines.line_no,
                    length
                ),
            }
        }
        Ok(())
    }

    fn open_section(&mut self, name: &str, start: u64, size: u64) {
        let current = match self.usage.sections.entry(name.to_string()) {
            Entry::Vacant(entry) => {
                entry.insert(OutputSection {
                    name: name.to_string(),
                    start,
                    size,
                    fill: 0,
                    region: None,
                });
                Some(name.to_string())
            }
            Entry::Occupied(_) => {
                log::debug!("Ignoring duplicate output section {}", name);
                None
            }
        };
        self.state = ScanState::Sections { current };
    }
}
