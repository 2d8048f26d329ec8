//! Upstream source retrieval: download, checksum verification, extraction.
//!
//! The TensorFlow source archive is fetched from GitHub as a gzip-compressed
//! tarball, verified against the digest pinned in the recipe, and unpacked
//! into the working directory under the stable [`SOURCE_SUBFOLDER`] name.
//!
//! Downloads are cached under the user cache directory so repeated builds do
//! not re-fetch the archive; a cached file is trusted only if its digest still
//! matches the recipe.

use anyhow::{bail, Context, Result};
use sha2::{Digest, Sha256};
use std::fs::{self, File};
use std::io::{BufReader, Read};
use std::path::{Component, Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;

use crate::recipe::{RecipeConfig, SOURCE_SUBFOLDER};

/// Network timeout for archive downloads.
const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(300);

/// Paths used during source retrieval.
pub struct SourcePaths {
    /// Downloads directory (archive cache).
    pub downloads: PathBuf,
    /// Path to the source archive.
    pub archive: PathBuf,
    /// Unpacked source tree.
    pub source: PathBuf,
}

impl SourcePaths {
    /// Create paths for a recipe under a working directory.
    ///
    /// The archive itself lands in the shared user cache so distinct working
    /// directories reuse one download.
    pub fn new(work_dir: &Path, recipe: &RecipeConfig) -> Self {
        let downloads = cache_dir();
        Self {
            archive: downloads.join(recipe.archive_file_name()),
            source: work_dir.join(SOURCE_SUBFOLDER),
            downloads,
        }
    }
}

/// The shared archive cache directory (`~/.cache/tflite-builder/`).
pub fn cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("/tmp"))
        .join("tflite-builder")
}

/// Clear the archive cache directory.
pub fn clear_cache() -> Result<()> {
    let cache = cache_dir();
    if cache.exists() {
        fs::remove_dir_all(&cache)?;
        fs::create_dir_all(&cache)?;
    }
    Ok(())
}

/// Fetch and unpack the recipe's source archive into the working directory.
///
/// Returns the path of the unpacked source tree (`<work_dir>/source_subfolder`).
/// An already-unpacked tree is reused as-is; an already-downloaded archive is
/// reused only if its digest matches the recipe.
pub fn materialize_source(recipe: &RecipeConfig, work_dir: &Path) -> Result<PathBuf> {
    let paths = SourcePaths::new(work_dir, recipe);

    if paths.source.join("WORKSPACE").exists() {
        println!("  source already unpacked at {}", paths.source.display());
        return Ok(paths.source);
    }

    fetch_archive(recipe, &paths)?;
    unpack_archive(recipe, &paths, work_dir)?;

    Ok(paths.source)
}

/// Download the archive if the cache has no verified copy.
fn fetch_archive(recipe: &RecipeConfig, paths: &SourcePaths) -> Result<()> {
    fs::create_dir_all(&paths.downloads).with_context(|| {
        format!("creating downloads directory '{}'", paths.downloads.display())
    })?;

    if paths.archive.is_file() {
        let digest = sha256_file(&paths.archive)?;
        if digest == recipe.sha256 {
            println!("  archive cached at {}", paths.archive.display());
            return Ok(());
        }
        println!("  cached archive digest mismatch; re-downloading");
        fs::remove_file(&paths.archive).with_context(|| {
            format!("removing stale archive '{}'", paths.archive.display())
        })?;
    }

    let url = recipe.archive_url();
    println!("  downloading {}", url);
    download_to_file(&url, &paths.archive)?;

    let digest = sha256_file(&paths.archive)?;
    if digest != recipe.sha256 {
        fs::remove_file(&paths.archive).with_context(|| {
            format!("removing corrupt archive '{}'", paths.archive.display())
        })?;
        bail!(
            "archive digest mismatch for {}:\n  expected: {}\n  actual:   {}",
            url,
            recipe.sha256,
            digest
        );
    }

    Ok(())
}

/// Unpack the verified archive and rename the versioned top-level directory
/// to the stable source subfolder name.
fn unpack_archive(recipe: &RecipeConfig, paths: &SourcePaths, work_dir: &Path) -> Result<()> {
    fs::create_dir_all(work_dir)
        .with_context(|| format!("creating working directory '{}'", work_dir.display()))?;

    println!("  unpacking {}", paths.archive.display());
    extract_tar_gz(&paths.archive, work_dir)?;

    let extracted = work_dir.join(recipe.extracted_dir_name());
    if !extracted.is_dir() {
        bail!(
            "archive unpacked but expected directory '{}' is missing",
            extracted.display()
        );
    }

    if paths.source.exists() {
        fs::remove_dir_all(&paths.source).with_context(|| {
            format!(
                "removing incomplete source directory '{}'",
                paths.source.display()
            )
        })?;
    }
    fs::rename(&extracted, &paths.source).with_context(|| {
        format!(
            "renaming source tree '{}' -> '{}'",
            extracted.display(),
            paths.source.display()
        )
    })?;

    Ok(())
}

/// Extract a gzip-compressed tarball into a destination directory.
///
/// Entry paths are validated before extraction: absolute paths and `..`
/// components are rejected so an archive cannot escape the destination.
pub fn extract_tar_gz(archive: &Path, dest_dir: &Path) -> Result<()> {
    let file = File::open(archive)
        .with_context(|| format!("opening archive '{}'", archive.display()))?;
    let decoder = flate2::read::GzDecoder::new(file);
    let mut tar = tar::Archive::new(decoder);

    for entry_result in tar
        .entries()
        .with_context(|| format!("reading archive '{}'", archive.display()))?
    {
        let mut entry = entry_result?;
        let entry_path = entry.path()?.into_owned();
        validate_entry_path(&entry_path)?;
        entry
            .unpack_in(dest_dir)
            .with_context(|| format!("unpacking '{}'", entry_path.display()))?;
    }

    Ok(())
}

/// Reject archive entry paths that would escape the destination.
fn validate_entry_path(path: &Path) -> Result<()> {
    if path.is_absolute() {
        bail!("archive entry has absolute path: {}", path.display());
    }
    for component in path.components() {
        if matches!(component, Component::ParentDir) {
            bail!("archive entry escapes destination: {}", path.display());
        }
    }
    Ok(())
}

/// Hex-encoded SHA-256 digest of a file.
pub fn sha256_file(path: &Path) -> Result<String> {
    let f = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let mut r = BufReader::new(f);
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 1024 * 1024];
    loop {
        let n = r.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(format!("{:x}", hasher.finalize()))
}

/// Download a URL and write the body to a file.
fn download_to_file(url: &str, dest: &Path) -> Result<()> {
    let response = http_agent()
        .get(url)
        .call()
        .with_context(|| format!("downloading '{}'", url))?;
    let mut file = File::create(dest)
        .with_context(|| format!("creating '{}'", dest.display()))?;
    std::io::copy(&mut response.into_body().as_reader(), &mut file)
        .with_context(|| format!("writing '{}'", dest.display()))?;
    Ok(())
}

/// Shared `ureq` agent with request timeout configuration.
fn http_agent() -> &'static ureq::Agent {
    static AGENT: OnceLock<ureq::Agent> = OnceLock::new();
    AGENT.get_or_init(|| {
        let config = ureq::Agent::config_builder()
            .timeout_global(Some(DOWNLOAD_TIMEOUT))
            .build();
        ureq::Agent::new_with_config(config)
    })
}
