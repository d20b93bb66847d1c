// Licensed under the Apache-2.0 license

//! Steps run by the build once `<name>.elf` has been linked.

use crate::map_stats::{Headings, MemoryUsage, StatsReport};
use crate::{bind_mss_header, objcopy, size_report, size_tool};
use anyhow::{Context, Result};
use std::io::Write;
use std::path::{Path, PathBuf};

pub struct PostBuildArgs<'a> {
    /// Target name; artifacts are `<name>.map`, `<name>.elf` and `<name>.bin`.
    pub name: &'a str,
    pub variant: &'a str,
    pub build_dir: &'a Path,
    pub size: Option<&'a str>,
    pub objcopy: Option<&'a str>,
    pub mss_header: bool,
    /// Headings of the map file, which depend on the linker's locale.
    pub headings: &'a Headings,
}

pub fn artifact_path(build_dir: &Path, variant: &str, name: &str, extension: &str) -> PathBuf {
    build_dir.join(variant).join(format!("{name}.{extension}"))
}

/// Prints the size report and memory usage tables for the target to `out`.
///
/// The map file is analyzed before anything is written, so a missing map
/// leaves `out` untouched.
pub fn post_build_stats(args: &PostBuildArgs, out: &mut dyn Write) -> Result<MemoryUsage> {
    let map = artifact_path(args.build_dir, args.variant, args.name, "map");
    let usage = MemoryUsage::from_map_file_with(&map, args.headings)
        .with_context(|| format!("memory statistics for target {} failed", args.name))?;

    let elf = artifact_path(args.build_dir, args.variant, args.name, "elf");
    let size = args.size.map(str::to_string).unwrap_or_else(size_tool);
    let size_output = match size_report(&size, &elf) {
        Ok(output) => Some(output),
        Err(err) => {
            log::warn!("Skipping size report for {}: {:#}", elf.display(), err);
            None
        }
    };

    let mut report = StatsReport::new(&usage);
    if let Some(size_output) = size_output.as_deref() {
        report = report.with_size_report(size_output);
    }
    write!(out, "{report}")?;
    Ok(usage)
}

pub fn post_build(args: &PostBuildArgs, out: &mut dyn Write) -> Result<()> {
    post_build_stats(args, out)?;
    if args.mss_header {
        let bin = artifact_path(args.build_dir, args.variant, args.name, "bin");
        let objcopy = args.objcopy.map(str::to_string).unwrap_or_else(objcopy);
        bind_mss_header(&bin, &objcopy)
            .with_context(|| format!("binding MSS header for target {} failed", args.name))?;
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;

    const MAP: &str = "\
Memory Configuration

Name             Origin             Length             Attributes
LIM              0x0000000008000000 0x00000000001e0000 xrw

Linker script and memory map

.text           0x0000000008000000     0x1000
 *fill*         0x0000000008000ff0       0x10
";

    fn args<'a>(build_dir: &'a Path) -> PostBuildArgs<'a> {
        PostBuildArgs {
            name: "sysctrlapp",
            variant: "release",
            build_dir,
            size: Some("wbuild-no-such-size-tool"),
            objcopy: None,
            mss_header: false,
            headings: &Headings::ENGLISH,
        }
    }

    #[test]
    fn test_artifact_path() {
        assert_eq!(
            artifact_path(Path::new("build"), "debug", "c3boot", "map"),
            Path::new("build/debug/c3boot.map")
        );
    }

    #[test]
    fn test_stats() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("release")).unwrap();
        std::fs::write(dir.path().join("release/sysctrlapp.map"), MAP).unwrap();

        let mut out = Vec::new();
        let usage = post_build_stats(&args(dir.path()), &mut out).unwrap();
        assert_eq!(usage.region("LIM").unwrap().used, 0x1000);
        assert_eq!(usage.section(".text").unwrap().fill, 0x10);

        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("      0.21   .text                       4096 (16)          LIM"));
    }

    #[test]
    fn test_stats_with_localized_headings() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("release")).unwrap();
        let map = MAP
            .replace("Memory Configuration", Headings::ITALIAN.memory_configuration)
            .replace("Linker script and memory map", Headings::ITALIAN.memory_map);
        std::fs::write(dir.path().join("release/sysctrlapp.map"), map).unwrap();

        let italian = PostBuildArgs {
            headings: &Headings::ITALIAN,
            ..args(dir.path())
        };
        let usage = post_build_stats(&italian, &mut Vec::new()).unwrap();
        assert_eq!(usage.region("LIM").unwrap().used, 0x1000);
    }

    #[test]
    fn test_missing_map_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let mut out = Vec::new();
        let err = post_build(&args(dir.path()), &mut out).unwrap_err();
        assert!(out.is_empty());
        assert!(err.to_string().contains("sysctrlapp"));
        assert!(format!("{err:#}").contains("sysctrlapp.map"));
    }

    #[test]
    fn test_artifacts_are_not_modified() {
        let dir = tempfile::tempdir().unwrap();
        let release = dir.path().join("release");
        std::fs::create_dir(&release).unwrap();
        std::fs::write(release.join("sysctrlapp.map"), MAP).unwrap();

        post_build(&args(dir.path()), &mut Vec::new()).unwrap();

        assert_eq!(std::fs::read_to_string(release.join("sysctrlapp.map")).unwrap(), MAP);
        assert_eq!(std::fs::read_dir(&release).unwrap().count(), 1);
    }
}
