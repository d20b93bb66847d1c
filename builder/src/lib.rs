// Licensed under the Apache-2.0 license

pub mod map_stats;
pub mod mss_header;
mod post_build;
mod size;

pub use map_stats::{Headings, MapStatsError, MemoryRegion, MemoryUsage, OutputSection};
pub use mss_header::{bind_mss_header, BoundImage};
pub use post_build::{artifact_path, post_build, post_build_stats, PostBuildArgs};
pub use size::size_report;

pub const DEFAULT_OBJCOPY: &str = "riscv64-unknown-elf-objcopy";
pub const DEFAULT_SIZE: &str = "riscv64-unknown-elf-size";

/// The objcopy executable: `OBJCOPY` from the environment, else the
/// riscv64 GNU toolchain default.
pub fn objcopy() -> String {
    std::env::var("OBJCOPY").unwrap_or_else(|_| DEFAULT_OBJCOPY.to_string())
}

/// The Berkeley `size` executable: `SIZE` from the environment, else the
/// riscv64 GNU toolchain default.
pub fn size_tool() -> String {
    std::env::var("SIZE").unwrap_or_else(|_| DEFAULT_SIZE.to_string())
}
