//! License placement for the packaged distribution.
//!
//! The upstream LICENSE file is mandatory: a package without it is not
//! redistributable, so a missing source file is a hard failure raised before
//! any artifact is copied.

use anyhow::{bail, Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Copy the license file into `<output_root>/licenses/`.
///
/// Returns the destination path. Fails if the source file does not exist.
pub fn copy_license(license_file: &Path, output_root: &Path) -> Result<PathBuf> {
    if !license_file.is_file() {
        bail!(
            "mandatory license file missing: {}",
            license_file.display()
        );
    }

    let dest_dir = output_root.join("licenses");
    fs::create_dir_all(&dest_dir)
        .with_context(|| format!("creating '{}'", dest_dir.display()))?;

    let file_name = license_file
        .file_name()
        .ok_or_else(|| anyhow::anyhow!("license path has no file name: {}", license_file.display()))?;
    let dst = dest_dir.join(file_name);
    fs::copy(license_file, &dst).with_context(|| {
        format!(
            "copying license {} to {}",
            license_file.display(),
            dst.display()
        )
    })?;

    Ok(dst)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn copies_license_into_licenses_dir() {
        let temp = tempfile::TempDir::new().unwrap();
        let license = temp.path().join("LICENSE");
        fs::write(&license, "Apache License 2.0").unwrap();

        let out = temp.path().join("out");
        let dst = copy_license(&license, &out).unwrap();

        assert_eq!(dst, out.join("licenses/LICENSE"));
        assert_eq!(fs::read_to_string(dst).unwrap(), "Apache License 2.0");
    }

    #[test]
    fn missing_license_is_fatal() {
        let temp = tempfile::TempDir::new().unwrap();
        let result = copy_license(&temp.path().join("LICENSE"), &temp.path().join("out"));
        assert!(result.is_err());
    }
}
