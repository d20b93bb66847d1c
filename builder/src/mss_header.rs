// Licensed under the Apache-2.0 license

//! PolarFire SoC boot mode 1 header.
//!
//! In boot mode 1 the MSS pre-boot firmware starts the harts from ENVM.
//! A firmware binary has to be prefixed with the 256 byte header below and
//! loaded at the ENVM base as Intel HEX, which is what `fpgenprog` and
//! Libero SoC program.

use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};
use std::process::Command;

pub const ENVM_BASE_ADDRESS: u32 = 0x2022_0000;
pub const MSS_HEADER_SIZE: usize = 256;

/// `j 0x100`: skip over the header.
const JUMP_OVER_HEADER: u32 = 0x1000_006f;
const HEADER_WORD_1: u32 = 0x0001_f5f0;
const HART_COUNT: usize = 5;
const HART_ENTRY_OFFSET: usize = 8;
const SBIC_OFFSET: usize = 0xd0;
const SBIC_MARKER: &[u8] = b"BOOT MODE 1 DUMMY SBIC";

/// Header taken from the dummy SBIC that `fpgenprog` emits for boot mode 1.
pub const BOOT_MODE_1_HEADER: [u8; MSS_HEADER_SIZE] = boot_mode_1_header();

const fn with_word(
    mut header: [u8; MSS_HEADER_SIZE],
    offset: usize,
    word: u32,
) -> [u8; MSS_HEADER_SIZE] {
    let bytes = word.to_le_bytes();
    let mut i = 0;
    while i < bytes.len() {
        header[offset + i] = bytes[i];
        i += 1;
    }
    header
}

const fn boot_mode_1_header() -> [u8; MSS_HEADER_SIZE] {
    let mut header = [0u8; MSS_HEADER_SIZE];
    header = with_word(header, 0, JUMP_OVER_HEADER);
    header = with_word(header, 4, HEADER_WORD_1);
    let mut hart = 0;
    while hart < HART_COUNT {
        header = with_word(
            header,
            HART_ENTRY_OFFSET + 4 * hart,
            ENVM_BASE_ADDRESS + MSS_HEADER_SIZE as u32,
        );
        hart += 1;
    }

    header = with_word(header, SBIC_OFFSET, u32::MAX);
    let mut i = 0;
    while i < SBIC_MARKER.len() {
        header[SBIC_OFFSET + 4 + i] = SBIC_MARKER[i];
        i += 1;
    }
    // marker is NUL terminated and padded to a word boundary
    with_word(header, SBIC_OFFSET + 4 + SBIC_MARKER.len() + 2, u32::MAX)
}

/// Files written by [`bind_mss_header`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BoundImage {
    pub bin: PathBuf,
    pub hex: PathBuf,
}

impl BoundImage {
    /// `dir/app.bin` binds to `dir/app-bm1-p0.bin` and `dir/app-bm1-p0.hex`.
    pub fn for_binary(bin: &Path) -> Self {
        let stem = bin
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self {
            bin: bin.with_file_name(format!("{stem}-bm1-p0.bin")),
            hex: bin.with_file_name(format!("{stem}-bm1-p0.hex")),
        }
    }
}

/// Writes `BOOT_MODE_1_HEADER` followed by the contents of `input` to
/// `output`. Returns the number of bytes written.
pub fn write_header_bound_bin(input: &Path, output: &Path) -> Result<usize> {
    let payload = std::fs::read(input)
        .with_context(|| format!("could not read binary {}", input.display()))?;
    let mut bin = Vec::with_capacity(MSS_HEADER_SIZE + payload.len());
    bin.extend_from_slice(&BOOT_MODE_1_HEADER);
    bin.extend_from_slice(&payload);
    std::fs::write(output, &bin)
        .with_context(|| format!("could not write {}", output.display()))?;
    Ok(bin.len())
}

/// Converts a raw binary to Intel HEX located at the ENVM base.
pub fn bin_to_envm_ihex(objcopy: &str, bin: &Path, hex: &Path) -> Result<()> {
    let mut cmd = Command::new(objcopy);
    let cmd = cmd
        .args(["-I", "binary", "-O", "ihex", "--change-section-lma"])
        .arg(format!("*+0x{:x}", ENVM_BASE_ADDRESS))
        .arg(bin)
        .arg(hex);
    println!("Executing {:?}", &cmd);
    let status = cmd
        .status()
        .with_context(|| format!("failed to run {objcopy}"))?;
    if !status.success() {
        bail!("objcopy failed to convert {} to Intel HEX", bin.display());
    }
    Ok(())
}

/// Prepends the boot mode 1 header to `bin` and converts the result to
/// Intel HEX next to it. `bin` itself is left untouched.
pub fn bind_mss_header(bin: &Path, objcopy: &str) -> Result<BoundImage> {
    let image = BoundImage::for_binary(bin);
    let len = write_header_bound_bin(bin, &image.bin)?;
    bin_to_envm_ihex(objcopy, &image.bin, &image.hex)?;
    println!(
        "Boot mode 1 image is at {:?} ({} bytes)",
        &image.hex, len
    );
    Ok(image)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_header_layout() {
        let h = &BOOT_MODE_1_HEADER;
        assert_eq!(&h[0..8], &[0x6fu8, 0x00, 0x00, 0x10, 0xf0, 0xf5, 0x01, 0x00]);
        for hart in 0..HART_COUNT {
            let offset = HART_ENTRY_OFFSET + 4 * hart;
            assert_eq!(&h[offset..offset + 4], &[0x00u8, 0x01, 0x22, 0x20]);
        }
        assert!(h[28..0xd0].iter().all(|&b| b == 0));
        assert_eq!(&h[0xd0..0xd4], &[0xffu8; 4]);
        assert_eq!(&h[0xd4..0xea], b"BOOT MODE 1 DUMMY SBIC");
        assert_eq!(&h[0xea..0xec], &[0u8, 0]);
        assert_eq!(&h[0xec..0xf0], &[0xffu8; 4]);
        assert!(h[0xf0..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_bound_paths() {
        let image = BoundImage::for_binary(Path::new("build/release/c3boot.bin"));
        assert_eq!(image.bin, Path::new("build/release/c3boot-bm1-p0.bin"));
        assert_eq!(image.hex, Path::new("build/release/c3boot-bm1-p0.hex"));
    }

    #[test]
    fn test_write_header_bound_bin() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("app.bin");
        let payload = b"\x13\x00\x00\x00firmware";
        std::fs::write(&input, payload).unwrap();

        let image = BoundImage::for_binary(&input);
        let len = write_header_bound_bin(&input, &image.bin).unwrap();

        let bound = std::fs::read(&image.bin).unwrap();
        assert_eq!(len, MSS_HEADER_SIZE + payload.len());
        assert_eq!(&bound[..MSS_HEADER_SIZE], &BOOT_MODE_1_HEADER);
        assert_eq!(&bound[MSS_HEADER_SIZE..], payload);
        assert_eq!(std::fs::read(&input).unwrap(), payload);
    }

    #[test]
    fn test_missing_binary() {
        let dir = tempfile::tempdir().unwrap();
        let err = bind_mss_header(&dir.path().join("missing.bin"), "objcopy").unwrap_err();
        assert!(err.to_string().contains("missing.bin"));
        assert!(!dir.path().join("missing-bm1-p0.bin").exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_objcopy_failure() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("app.bin");
        std::fs::write(&input, b"firmware").unwrap();
        assert!(bind_mss_header(&input, "false").is_err());
    }
}
