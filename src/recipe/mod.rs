//! Recipe configuration: what to fetch and how to build it.
//!
//! A recipe pins the upstream TensorFlow release (version + archive digest)
//! and records the build options the bazel invocation depends on. Recipes are
//! loaded from TOML; [`RecipeConfig::default_upstream`] is the built-in recipe
//! matching the release this tool is maintained against.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Stable directory name the unpacked source tree is renamed to.
///
/// The build and packaging steps rely on this name instead of the versioned
/// `tensorflow-<version>` directory the archive unpacks as.
pub const SOURCE_SUBFOLDER: &str = "source_subfolder";

/// Host platform a build targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Linux,
    Macos,
    Windows,
    Ios,
}

impl Platform {
    /// Detect the platform this process is running on.
    pub fn host() -> Result<Self> {
        if cfg!(target_os = "linux") {
            Ok(Platform::Linux)
        } else if cfg!(target_os = "macos") {
            Ok(Platform::Macos)
        } else if cfg!(target_os = "windows") {
            Ok(Platform::Windows)
        } else if cfg!(target_os = "ios") {
            Ok(Platform::Ios)
        } else {
            bail!("unsupported host platform for a TensorFlow Lite build")
        }
    }

    /// Parse a platform name as written in a recipe file.
    pub fn parse(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "linux" => Ok(Platform::Linux),
            "macos" => Ok(Platform::Macos),
            "windows" => Ok(Platform::Windows),
            "ios" => Ok(Platform::Ios),
            other => bail!(
                "unsupported platform '{}' (expected 'linux', 'macos', 'windows', or 'ios')",
                other
            ),
        }
    }
}

/// Compiler family, as far as the build flags care.
///
/// MSVC has no dedicated C++11 mode (it defaults to C++14), so the
/// `--cxxopt=-std=c++11` flag is only passed for non-MSVC toolchains, and
/// `CC_OPT_FLAGS` switches between `-march=native` and `/arch:AVX`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compiler {
    Msvc,
    Other,
}

impl Compiler {
    /// Parse a compiler name as written in a recipe file.
    pub fn parse(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "msvc" | "visual studio" => Ok(Compiler::Msvc),
            "gcc" | "clang" | "apple-clang" => Ok(Compiler::Other),
            other => bail!("unsupported compiler '{}'", other),
        }
    }
}

/// A loaded, validated recipe.
#[derive(Debug, Clone)]
pub struct RecipeConfig {
    /// Package name downstream consumers see (e.g. `tensorflowlite`).
    pub name: String,
    /// Upstream project name the archive unpacks as (e.g. `tensorflow`).
    pub source_name: String,
    /// Upstream release version (e.g. `1.14.0`).
    pub version: String,
    /// Archive URL template with a `{version}` placeholder.
    pub url_template: String,
    /// Hex-encoded SHA-256 digest of the archive.
    pub sha256: String,
    /// Build shared libraries.
    pub shared: bool,
    /// Build position-independent code. Ignored on Windows.
    pub fpic: bool,
    /// Target platform.
    pub platform: Platform,
    /// Compiler family.
    pub compiler: Compiler,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RecipeToml {
    package: PackageToml,
    source: SourceToml,
    build: Option<BuildToml>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct PackageToml {
    name: String,
    source_name: Option<String>,
    version: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SourceToml {
    url_template: String,
    sha256: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct BuildToml {
    shared: Option<bool>,
    fpic: Option<bool>,
    platform: Option<String>,
    compiler: Option<String>,
}

impl RecipeConfig {
    /// The built-in recipe for the pinned upstream TensorFlow release.
    pub fn default_upstream() -> Result<Self> {
        let platform = Platform::host()?;
        Ok(Self {
            name: "tensorflowlite".to_string(),
            source_name: "tensorflow".to_string(),
            version: "1.14.0".to_string(),
            url_template: "https://github.com/tensorflow/tensorflow/archive/v{version}.tar.gz"
                .to_string(),
            sha256: "aa2a6a1daafa3af66807cfe0bc77bfe1144a9a53df9a96bab52e3e575b3047ed"
                .to_string(),
            shared: false,
            fpic: true,
            platform,
            compiler: default_compiler(platform),
        })
    }

    /// Load a recipe from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("reading recipe '{}'", path.display()))?;
        let parsed: RecipeToml = toml::from_str(&raw)
            .with_context(|| format!("parsing recipe '{}'", path.display()))?;

        let package = parsed.package;
        let source = parsed.source;
        let build = parsed.build.unwrap_or(BuildToml {
            shared: None,
            fpic: None,
            platform: None,
            compiler: None,
        });

        let version = package.version.trim().to_string();
        if version.is_empty() {
            bail!("invalid recipe '{}': package.version is empty", path.display());
        }
        let sha256 = source.sha256.trim().to_ascii_lowercase();
        if sha256.len() != 64 || !sha256.chars().all(|c| c.is_ascii_hexdigit()) {
            bail!(
                "invalid recipe '{}': source.sha256 must be 64 hex characters",
                path.display()
            );
        }
        let url_template = source.url_template.trim().to_string();
        if !url_template.contains("{version}") {
            bail!(
                "invalid recipe '{}': source.url_template must contain '{{version}}'",
                path.display()
            );
        }

        let platform = match build.platform.as_deref() {
            Some(raw) => Platform::parse(raw)
                .with_context(|| format!("invalid recipe '{}'", path.display()))?,
            None => Platform::host()?,
        };
        let compiler = match build.compiler.as_deref() {
            Some(raw) => Compiler::parse(raw)
                .with_context(|| format!("invalid recipe '{}'", path.display()))?,
            None => default_compiler(platform),
        };

        Ok(Self {
            name: package.name.trim().to_string(),
            source_name: package
                .source_name
                .as_deref()
                .unwrap_or("tensorflow")
                .trim()
                .to_string(),
            version,
            url_template,
            sha256,
            shared: build.shared.unwrap_or(false),
            fpic: build.fpic.unwrap_or(true),
            platform,
            compiler,
        })
    }

    /// The concrete archive URL for this recipe's version.
    pub fn archive_url(&self) -> String {
        self.url_template.replace("{version}", &self.version)
    }

    /// Local file name the downloaded archive is stored under.
    pub fn archive_file_name(&self) -> String {
        format!("{}-{}.tar.gz", self.source_name, self.version)
    }

    /// Directory name the archive unpacks its top-level tree as.
    pub fn extracted_dir_name(&self) -> String {
        format!("{}-{}", self.source_name, self.version)
    }

    /// Whether position-independent code is in effect.
    ///
    /// Windows has no fPIC notion; the option is dropped there.
    pub fn effective_fpic(&self) -> Option<bool> {
        match self.platform {
            Platform::Windows => None,
            _ => Some(self.fpic),
        }
    }

    /// Path of the unpacked source tree under a working directory.
    pub fn source_dir(&self, work_dir: &Path) -> PathBuf {
        work_dir.join(SOURCE_SUBFOLDER)
    }
}

fn default_compiler(platform: Platform) -> Compiler {
    match platform {
        Platform::Windows => Compiler::Msvc,
        _ => Compiler::Other,
    }
}
