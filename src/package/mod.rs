//! The Packager: assembles a distributable layout from build outputs.
//!
//! This module provides:
//! - [`artifacts`] - Shared-library collection and permission normalization
//! - [`headers`] - Public header tree copying
//! - [`licenses`] - Mandatory license placement
//!
//! Packaging is one linear batch pass over the build tree:
//!
//! 1. License into `licenses/` (hard failure if missing, before anything else)
//! 2. Prune bazel runfile trees that would collide during flattening
//! 3. Shared libraries into a flat `lib/`, each chmod-ed to 0o777
//! 4. Headers into `include/<namespace>/`, structure preserved
//!
//! The artifact and header sets are rediscovered on every invocation; nothing
//! persists between runs except the files themselves. Two packaging runs
//! against the same output root must not happen concurrently.

pub mod artifacts;
pub mod headers;
pub mod licenses;

use anyhow::Result;
use std::path::{Path, PathBuf};

/// Where the Packager reads from and writes to.
#[derive(Debug, Clone)]
pub struct PackageLayout {
    /// Root bazel output tree holding the compiled libraries.
    pub build_output_root: PathBuf,
    /// The lite output directory; runfile pruning happens here.
    pub lite_output_dir: PathBuf,
    /// Source directory holding the public headers.
    pub include_root: PathBuf,
    /// Upstream license file.
    pub license_file: PathBuf,
    /// Namespace the headers are installed under (e.g. `tensorflow/lite`).
    pub include_namespace: PathBuf,
    /// Destination package root.
    pub output_root: PathBuf,
}

impl PackageLayout {
    /// The conventional layout for an unpacked, built TensorFlow source tree.
    pub fn for_source_tree(source_dir: &Path, output_root: &Path) -> Self {
        Self {
            build_output_root: source_dir.join("bazel-bin/tensorflow"),
            lite_output_dir: source_dir.join("bazel-bin/tensorflow/lite"),
            include_root: source_dir.join("tensorflow/lite"),
            license_file: source_dir.join("LICENSE"),
            include_namespace: PathBuf::from("tensorflow/lite"),
            output_root: output_root.to_path_buf(),
        }
    }

    /// The flat library destination directory.
    pub fn lib_dir(&self) -> PathBuf {
        self.output_root.join("lib")
    }

    /// The namespaced header destination directory.
    pub fn include_dir(&self) -> PathBuf {
        self.output_root.join("include").join(&self.include_namespace)
    }
}

/// What a packaging run copied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PackageSummary {
    /// Shared libraries placed in `lib/`.
    pub libraries: usize,
    /// Headers placed under `include/`.
    pub headers: usize,
}

/// Assembles the distributable file layout from build outputs.
pub struct Packager {
    layout: PackageLayout,
}

impl Packager {
    /// Create a packager for a layout.
    pub fn new(layout: PackageLayout) -> Self {
        Self { layout }
    }

    /// Run the packaging pass.
    ///
    /// Zero discovered libraries is not an error; the build tree is trusted
    /// to be complete and its shape is not validated here.
    pub fn package(&self) -> Result<PackageSummary> {
        licenses::copy_license(&self.layout.license_file, &self.layout.output_root)?;

        artifacts::prune_runfile_trees(&self.layout.lite_output_dir)?;
        let libraries =
            artifacts::copy_artifacts(&self.layout.build_output_root, &self.layout.lib_dir())?;
        let headers =
            headers::copy_header_tree(&self.layout.include_root, &self.layout.include_dir())?;

        Ok(PackageSummary { libraries, headers })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::os::unix::fs::PermissionsExt;

    /// Lay out a minimal built source tree: license, one read-only library,
    /// one header.
    fn fake_built_tree(source_dir: &Path) {
        fs::create_dir_all(source_dir.join("bazel-bin/tensorflow/lite")).unwrap();
        fs::create_dir_all(source_dir.join("tensorflow/lite")).unwrap();
        fs::write(source_dir.join("LICENSE"), "Apache-2.0").unwrap();

        let lib = source_dir.join("bazel-bin/tensorflow/lite/libtensorflowlite.so");
        fs::write(&lib, "shared object").unwrap();
        fs::set_permissions(&lib, fs::Permissions::from_mode(0o444)).unwrap();

        fs::write(source_dir.join("tensorflow/lite/context.h"), "// ctx").unwrap();
    }

    fn mode_of(path: &Path) -> u32 {
        fs::metadata(path).unwrap().permissions().mode() & 0o777
    }

    #[test]
    fn packages_libraries_headers_and_license() {
        let temp = tempfile::TempDir::new().unwrap();
        let source = temp.path().join("source_subfolder");
        fake_built_tree(&source);

        let out = temp.path().join("out");
        let summary = Packager::new(PackageLayout::for_source_tree(&source, &out))
            .package()
            .unwrap();

        assert_eq!(summary, PackageSummary { libraries: 1, headers: 1 });

        let lib = out.join("lib/libtensorflowlite.so");
        assert!(lib.is_file());
        assert_eq!(mode_of(&lib), 0o777);
        assert_eq!(
            fs::read_to_string(out.join("include/tensorflow/lite/context.h")).unwrap(),
            "// ctx"
        );
        assert_eq!(
            fs::read_to_string(out.join("licenses/LICENSE")).unwrap(),
            "Apache-2.0"
        );
    }

    #[test]
    fn packaging_twice_succeeds() {
        let temp = tempfile::TempDir::new().unwrap();
        let source = temp.path().join("source_subfolder");
        fake_built_tree(&source);

        let out = temp.path().join("out");
        let packager = Packager::new(PackageLayout::for_source_tree(&source, &out));
        packager.package().unwrap();
        let summary = packager.package().unwrap();

        assert_eq!(summary.libraries, 1);
        assert_eq!(mode_of(&out.join("lib/libtensorflowlite.so")), 0o777);
    }

    #[test]
    fn missing_license_fails_before_artifacts() {
        let temp = tempfile::TempDir::new().unwrap();
        let source = temp.path().join("source_subfolder");
        fake_built_tree(&source);
        fs::remove_file(source.join("LICENSE")).unwrap();

        let out = temp.path().join("out");
        let result = Packager::new(PackageLayout::for_source_tree(&source, &out)).package();

        assert!(result.is_err());
        assert!(!out.join("lib").exists());
        assert!(!out.join("include").exists());
    }

    #[test]
    fn runfile_trees_do_not_reach_lib() {
        let temp = tempfile::TempDir::new().unwrap();
        let source = temp.path().join("source_subfolder");
        fake_built_tree(&source);

        // A runfile tree holding a same-named library that must not survive.
        let runfiles = source.join("bazel-bin/tensorflow/lite/libtensorflowlite.so.runfiles");
        fs::create_dir_all(runfiles.join("workspace")).unwrap();
        fs::write(
            runfiles.join("workspace/libtensorflowlite.so"),
            "runfile copy",
        )
        .unwrap();

        let out = temp.path().join("out");
        let summary = Packager::new(PackageLayout::for_source_tree(&source, &out))
            .package()
            .unwrap();

        assert_eq!(summary.libraries, 1);
        assert_eq!(
            fs::read_to_string(out.join("lib/libtensorflowlite.so")).unwrap(),
            "shared object"
        );
    }

    #[test]
    fn empty_build_tree_packages_empty_lib() {
        let temp = tempfile::TempDir::new().unwrap();
        let source = temp.path().join("source_subfolder");
        fs::create_dir_all(&source).unwrap();
        fs::write(source.join("LICENSE"), "Apache-2.0").unwrap();

        let out = temp.path().join("out");
        let summary = Packager::new(PackageLayout::for_source_tree(&source, &out))
            .package()
            .unwrap();

        assert_eq!(summary.libraries, 0);
        assert!(out.join("lib").is_dir());
        assert_eq!(fs::read_dir(out.join("lib")).unwrap().count(), 0);
    }
}
