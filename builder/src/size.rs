// Licensed under the Apache-2.0 license

use anyhow::{bail, Context, Result};
use std::path::Path;
use std::process::Command;

/// Runs the Berkeley `size` tool on `elf` and returns its stdout.
pub fn size_report(size: &str, elf: &Path) -> Result<String> {
    let mut cmd = Command::new(size);
    cmd.arg(elf);
    log::debug!("Executing {:?}", &cmd);
    let output = cmd
        .output()
        .with_context(|| format!("failed to run {size}"))?;
    if !output.status.success() {
        bail!(
            "{} failed on {}: {}",
            size,
            elf.display(),
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }
    Ok(String::from_utf8(output.stdout)?)
}
