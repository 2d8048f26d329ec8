//! Shared-library collection: find, flatten, and normalize permissions.
//!
//! Artifacts are discovered by file-name suffix under the build output root
//! and copied into a flat `lib/` directory. Bazel writes its outputs
//! read-only; every copied artifact is chmod-ed to 0o777 on the destination
//! so a later packaging run can overwrite it.

use anyhow::{Context, Result};
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use walkdir::WalkDir;

/// Permission bits applied to every packaged library.
pub const LIBRARY_MODE: u32 = 0o777;

/// Bazel runfile trees that must be removed before the flattening copy.
///
/// Each holds files whose basenames collide with other sources once
/// subdirectory structure is discarded. Paths are relative to the lite
/// output directory (`bazel-bin/tensorflow/lite`).
pub const RUNFILE_TREES: &[&str] = &[
    "libtensorflowlite.so.runfiles",
    "delegates/gpu/libtensorflowlite_gpu_gl.so.runfiles",
];

/// Whether a file name matches a shared-library pattern.
///
/// Accepts `*.so`, versioned `*.so.*`, `*.dll`, and `*.dylib*` names.
pub fn is_shared_library(name: &str) -> bool {
    name.ends_with(".so")
        || name.contains(".so.")
        || name.ends_with(".dll")
        || name.contains(".dylib")
}

/// Remove the known runfile trees under the lite output directory.
///
/// Missing trees are not an error; the build only produces them for some
/// targets.
pub fn prune_runfile_trees(lite_output_dir: &Path) -> Result<()> {
    for rel in RUNFILE_TREES {
        let tree = lite_output_dir.join(rel);
        if tree.is_dir() {
            fs::remove_dir_all(&tree)
                .with_context(|| format!("removing runfile tree '{}'", tree.display()))?;
        }
    }
    Ok(())
}

/// Copy every shared library under `build_output_root` into `lib_dir`, flat.
///
/// Subdirectory structure is discarded; symbolic links are skipped. Returns
/// the number of libraries copied. A missing or empty build tree yields zero
/// copies, not an error.
pub fn copy_artifacts(build_output_root: &Path, lib_dir: &Path) -> Result<usize> {
    fs::create_dir_all(lib_dir)
        .with_context(|| format!("creating '{}'", lib_dir.display()))?;

    let mut copied = 0;
    for entry in WalkDir::new(build_output_root)
        .follow_links(false)
        .into_iter()
        .filter_map(Result::ok)
    {
        if !entry.file_type().is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy();
        if !is_shared_library(&name) {
            continue;
        }

        let dst = lib_dir.join(entry.file_name());
        // Remove a leftover destination first; a prior interrupted run may
        // have left it read-only.
        if dst.exists() || dst.is_symlink() {
            fs::remove_file(&dst)
                .with_context(|| format!("removing stale '{}'", dst.display()))?;
        }
        fs::copy(entry.path(), &dst).with_context(|| {
            format!("copying {} to {}", entry.path().display(), dst.display())
        })?;
        normalize_permissions(&dst)?;
        copied += 1;
    }

    Ok(copied)
}

/// Open up an artifact's permission bits to [`LIBRARY_MODE`].
///
/// Applied to the destination copy only; source trees are never touched.
pub fn normalize_permissions(path: &Path) -> Result<()> {
    let mut perms = fs::metadata(path)
        .with_context(|| format!("reading metadata for '{}'", path.display()))?
        .permissions();
    perms.set_mode(LIBRARY_MODE);
    fs::set_permissions(path, perms)
        .with_context(|| format!("normalizing permissions on '{}'", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn mode_of(path: &Path) -> u32 {
        fs::metadata(path).unwrap().permissions().mode() & 0o777
    }

    fn write_readonly(path: &Path, contents: &str) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, contents).unwrap();
        fs::set_permissions(path, fs::Permissions::from_mode(0o444)).unwrap();
    }

    #[test]
    fn test_is_shared_library() {
        assert!(is_shared_library("libtensorflowlite.so"));
        assert!(is_shared_library("libfoo.so.1.2"));
        assert!(is_shared_library("tensorflowlite.dll"));
        assert!(is_shared_library("libbar.dylib"));
        assert!(is_shared_library("libbar.1.dylib"));

        assert!(!is_shared_library("context.h"));
        assert!(!is_shared_library("libfoo.a"));
        assert!(!is_shared_library("notes.txt"));
        assert!(!is_shared_library("sonic"));
    }

    #[test]
    fn copy_flattens_and_opens_permissions() {
        let temp = tempfile::TempDir::new().unwrap();
        let build = temp.path().join("bazel-bin/tensorflow");
        write_readonly(&build.join("lite/libtensorflowlite.so"), "lib");
        write_readonly(&build.join("lite/delegates/libdelegate.so.2"), "delegate");

        let lib_dir = temp.path().join("out/lib");
        let copied = copy_artifacts(&build, &lib_dir).unwrap();

        assert_eq!(copied, 2);
        assert_eq!(mode_of(&lib_dir.join("libtensorflowlite.so")), 0o777);
        assert_eq!(mode_of(&lib_dir.join("libdelegate.so.2")), 0o777);
        // Flattened: no subdirectories survive
        assert!(!lib_dir.join("lite").exists());
    }

    #[test]
    fn copy_skips_symlinks_and_non_libraries() {
        let temp = tempfile::TempDir::new().unwrap();
        let build = temp.path().join("build");
        write_readonly(&build.join("libreal.so"), "real");
        fs::write(build.join("build.log"), "noise").unwrap();
        std::os::unix::fs::symlink("libreal.so", build.join("liblink.so")).unwrap();

        let lib_dir = temp.path().join("lib");
        let copied = copy_artifacts(&build, &lib_dir).unwrap();

        assert_eq!(copied, 1);
        assert!(lib_dir.join("libreal.so").is_file());
        assert!(!lib_dir.join("liblink.so").exists());
        assert!(!lib_dir.join("build.log").exists());
    }

    #[test]
    fn copy_twice_overwrites_read_only_leftovers() {
        let temp = tempfile::TempDir::new().unwrap();
        let build = temp.path().join("build");
        write_readonly(&build.join("libfoo.so"), "v1");

        let lib_dir = temp.path().join("lib");
        copy_artifacts(&build, &lib_dir).unwrap();

        // Simulate an interrupted earlier run: destination left read-only.
        fs::set_permissions(
            lib_dir.join("libfoo.so"),
            fs::Permissions::from_mode(0o444),
        )
        .unwrap();

        let copied = copy_artifacts(&build, &lib_dir).unwrap();
        assert_eq!(copied, 1);
        assert_eq!(mode_of(&lib_dir.join("libfoo.so")), 0o777);
    }

    #[test]
    fn copy_leaves_source_permissions_alone() {
        let temp = tempfile::TempDir::new().unwrap();
        let build = temp.path().join("build");
        let src = build.join("libfoo.so");
        write_readonly(&src, "lib");

        copy_artifacts(&build, &temp.path().join("lib")).unwrap();
        assert_eq!(mode_of(&src), 0o444);
    }

    #[test]
    fn missing_build_tree_yields_zero_artifacts() {
        let temp = tempfile::TempDir::new().unwrap();
        let lib_dir = temp.path().join("lib");
        let copied = copy_artifacts(&PathBuf::from("/nonexistent-build-tree"), &lib_dir).unwrap();
        assert_eq!(copied, 0);
        assert!(lib_dir.is_dir());
    }

    #[test]
    fn prune_removes_only_named_trees() {
        let temp = tempfile::TempDir::new().unwrap();
        let lite = temp.path().join("lite");
        fs::create_dir_all(lite.join("libtensorflowlite.so.runfiles/junk")).unwrap();
        fs::create_dir_all(lite.join("delegates/gpu/libtensorflowlite_gpu_gl.so.runfiles")).unwrap();
        fs::create_dir_all(lite.join("delegates/gpu/keep")).unwrap();

        prune_runfile_trees(&lite).unwrap();

        assert!(!lite.join("libtensorflowlite.so.runfiles").exists());
        assert!(!lite
            .join("delegates/gpu/libtensorflowlite_gpu_gl.so.runfiles")
            .exists());
        assert!(lite.join("delegates/gpu/keep").is_dir());
    }

    #[test]
    fn prune_tolerates_absent_trees() {
        let temp = tempfile::TempDir::new().unwrap();
        assert!(prune_runfile_trees(temp.path()).is_ok());
    }
}
