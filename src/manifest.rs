//! Package metadata for downstream consumers.
//!
//! A packaged tree carries a small JSON manifest recording what was built
//! and, most importantly, the library names a consumer must link against.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use time::OffsetDateTime;

use crate::recipe::RecipeConfig;

/// File name of the manifest inside the output root.
pub const MANIFEST_FILE_NAME: &str = "manifest.json";

/// Metadata describing a packaged distribution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageManifest {
    /// Package name.
    pub name: String,
    /// Upstream version that was built.
    pub version: String,
    /// Library names consumers link against.
    pub libs: Vec<String>,
    /// When the package was assembled (unix seconds).
    pub packaged_at_unix: i64,
}

impl PackageManifest {
    /// Build the manifest for a recipe, stamped with the current time.
    pub fn for_recipe(recipe: &RecipeConfig) -> Self {
        Self {
            name: recipe.name.clone(),
            version: recipe.version.clone(),
            libs: vec![recipe.name.clone()],
            packaged_at_unix: OffsetDateTime::now_utc().unix_timestamp(),
        }
    }

    /// Write the manifest into the output root. Returns the file path.
    pub fn write(&self, output_root: &Path) -> Result<PathBuf> {
        let path = output_root.join(MANIFEST_FILE_NAME);
        let json = serde_json::to_string_pretty(self).context("serializing package manifest")?;
        fs::write(&path, json)
            .with_context(|| format!("writing manifest '{}'", path.display()))?;
        Ok(path)
    }

    /// Load a manifest previously written by [`PackageManifest::write`].
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read(path)
            .with_context(|| format!("reading manifest '{}'", path.display()))?;
        serde_json::from_slice(&raw)
            .with_context(|| format!("parsing manifest '{}'", path.display()))
    }
}
