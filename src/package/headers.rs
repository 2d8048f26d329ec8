//! Public header collection.
//!
//! Unlike libraries, headers keep their relative directory structure: a
//! consumer includes `tensorflow/lite/context.h` by the same path the source
//! tree uses. Symbolic links are followed so generated or vendored header
//! directories end up as real files in the package.

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use walkdir::WalkDir;

/// Whether a file name matches a public-header pattern (`*.h`, `*.hpp`).
pub fn is_header(name: &str) -> bool {
    name.ends_with(".h") || name.ends_with(".hpp")
}

/// Copy every header under `include_root` into `dest_root`, preserving
/// relative paths. Returns the number of headers copied.
pub fn copy_header_tree(include_root: &Path, dest_root: &Path) -> Result<usize> {
    let mut copied = 0;
    for entry in WalkDir::new(include_root)
        .follow_links(true)
        .into_iter()
        .filter_map(Result::ok)
    {
        if !entry.file_type().is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy();
        if !is_header(&name) {
            continue;
        }

        let rel = entry
            .path()
            .strip_prefix(include_root)
            .with_context(|| format!("relativizing '{}'", entry.path().display()))?;
        let dst = dest_root.join(rel);
        if let Some(parent) = dst.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating '{}'", parent.display()))?;
        }
        fs::copy(entry.path(), &dst).with_context(|| {
            format!("copying {} to {}", entry.path().display(), dst.display())
        })?;
        copied += 1;
    }

    Ok(copied)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_header() {
        assert!(is_header("context.h"));
        assert!(is_header("interpreter.hpp"));
        assert!(!is_header("model.cc"));
        assert!(!is_header("BUILD"));
    }

    #[test]
    fn copy_preserves_relative_structure() {
        let temp = tempfile::TempDir::new().unwrap();
        let src = temp.path().join("tensorflow/lite");
        fs::create_dir_all(src.join("kernels")).unwrap();
        fs::write(src.join("context.h"), "// context").unwrap();
        fs::write(src.join("kernels/register.h"), "// register").unwrap();
        fs::write(src.join("model.cc"), "// not a header").unwrap();

        let dst = temp.path().join("include/tensorflow/lite");
        let copied = copy_header_tree(&src, &dst).unwrap();

        assert_eq!(copied, 2);
        assert_eq!(
            fs::read_to_string(dst.join("context.h")).unwrap(),
            "// context"
        );
        assert!(dst.join("kernels/register.h").is_file());
        assert!(!dst.join("model.cc").exists());
    }

    #[test]
    fn copy_follows_symlinked_directories() {
        let temp = tempfile::TempDir::new().unwrap();
        let real = temp.path().join("generated");
        fs::create_dir_all(&real).unwrap();
        fs::write(real.join("schema.h"), "// generated").unwrap();

        let src = temp.path().join("lite");
        fs::create_dir_all(&src).unwrap();
        std::os::unix::fs::symlink(&real, src.join("gen")).unwrap();

        let dst = temp.path().join("include");
        let copied = copy_header_tree(&src, &dst).unwrap();

        assert_eq!(copied, 1);
        assert!(dst.join("gen/schema.h").is_file());
        assert!(!dst.join("gen/schema.h").is_symlink());
    }

    #[test]
    fn empty_tree_copies_nothing() {
        let temp = tempfile::TempDir::new().unwrap();
        let copied =
            copy_header_tree(&temp.path().join("absent"), &temp.path().join("include")).unwrap();
        assert_eq!(copied, 0);
    }
}
