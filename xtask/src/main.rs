// Licensed under the Apache-2.0 license

use clap::{Parser, Subcommand};
use map_stats::MapLanguage;
use std::path::PathBuf;

mod map_stats;
mod mss_header;

#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Xtask {
    #[command(subcommand)]
    xtask: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print memory usage from a linker map file
    MapStats {
        /// Path to the map file written by `ld -Map`
        #[arg(long, value_name = "MAP")]
        map: PathBuf,

        /// Print the regions and sections as JSON instead of tables
        #[arg(long, default_value_t = false)]
        json: bool,

        /// Language of the map file headings
        #[arg(long, value_enum, default_value_t = MapLanguage::English)]
        language: MapLanguage,
    },
    /// Run the post-link steps for a firmware target
    PostBuild {
        /// Target name, e.g. `sysctrlapp` for `sysctrlapp.elf`
        #[arg(long)]
        name: String,

        /// Build variant directory under the build directory
        #[arg(long, default_value = "release")]
        variant: String,

        #[arg(long, env = "WBUILD_BUILD_DIR", default_value = "build")]
        build_dir: PathBuf,

        /// Berkeley `size` executable. Default: $SIZE or riscv64-unknown-elf-size
        #[arg(long)]
        size: Option<String>,

        /// objcopy executable. Default: $OBJCOPY or riscv64-unknown-elf-objcopy
        #[arg(long)]
        objcopy: Option<String>,

        /// Also write the PolarFire SoC boot mode 1 image
        #[arg(long, default_value_t = false)]
        mss_header: bool,

        /// Language of the map file headings
        #[arg(long, value_enum, default_value_t = MapLanguage::English)]
        language: MapLanguage,
    },
    /// Prepend the PolarFire SoC boot mode 1 header and convert to Intel HEX
    MssHeader {
        /// Raw firmware binary
        #[arg(value_name = "BIN")]
        bin: PathBuf,

        /// objcopy executable. Default: $OBJCOPY or riscv64-unknown-elf-objcopy
        #[arg(long)]
        objcopy: Option<String>,
    },
}

fn main() {
    let _ = simple_logger::SimpleLogger::new()
        .with_level(log::LevelFilter::Info)
        .env()
        .init();

    let cli = Xtask::parse();
    let result = match &cli.xtask {
        Commands::MapStats {
            map,
            json,
            language,
        } => map_stats::map_stats(map, *json, *language),
        Commands::PostBuild {
            name,
            variant,
            build_dir,
            size,
            objcopy,
            mss_header,
            language,
        } => wbuild_builder::post_build(
            &wbuild_builder::PostBuildArgs {
                name,
                variant,
                build_dir,
                size: size.as_deref(),
                objcopy: objcopy.as_deref(),
                mss_header: *mss_header,
                headings: language.headings(),
            },
            &mut std::io::stdout().lock(),
        ),
        Commands::MssHeader { bin, objcopy } => mss_header::bind(bin, objcopy.as_deref()),
    };
    result.unwrap_or_else(|e| {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    });
}
