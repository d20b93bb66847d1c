// Licensed under the Apache-2.0 license

use anyhow::Result;
use std::path::Path;

pub(crate) fn bind(bin: &Path, objcopy: Option<&str>) -> Result<()> {
    let objcopy = objcopy
        .map(str::to_string)
        .unwrap_or_else(wbuild_builder::objcopy);
    let image = wbuild_builder::bind_mss_header(bin, &objcopy)?;
    println!("Wrote {:?} and {:?}", image.bin, image.hex);
    Ok(())
}
