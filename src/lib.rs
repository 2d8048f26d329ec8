//! Infrastructure for building and packaging the TensorFlow Lite shared library.
//!
//! This crate automates the three steps a TensorFlow Lite binary distribution
//! needs:
//!
//! - **Source retrieval** - Download the pinned upstream archive, verify its
//!   checksum, and unpack it to a stable location
//! - **Build invocation** - Configure and run bazel against the platform's
//!   `libtensorflowlite` target
//! - **Packaging** - Collect shared libraries, public headers, and the license
//!   into a canonical `lib/` + `include/` + `licenses/` layout
//!
//! # Architecture
//!
//! ```text
//! tflite-builder
//!     │
//!     ├── recipe    - What to fetch and build (version, digest, options)
//!     ├── preflight - Host tool validation before any work starts
//!     ├── source    - Archive download, verification, extraction
//!     ├── build     - Bazel invocation with an explicit environment record
//!     ├── package   - Artifact/header/license collection into the layout
//!     └── manifest  - Link-library metadata for downstream consumers
//! ```
//!
//! Steps are strictly sequential; nothing here is safe to run concurrently
//! against the same working or output directory.
//!
//! # Example
//!
//! ```rust,ignore
//! use tflite_builder::package::{PackageLayout, Packager};
//! use std::path::Path;
//!
//! let layout = PackageLayout::for_source_tree(
//!     Path::new("work/source_subfolder"),
//!     Path::new("out"),
//! );
//! let summary = Packager::new(layout).package()?;
//! println!("packaged {} libraries", summary.libraries);
//! ```

pub mod build;
pub mod manifest;
pub mod package;
pub mod preflight;
pub mod recipe;
pub mod source;

pub use manifest::PackageManifest;
pub use package::{PackageLayout, PackageSummary, Packager};
pub use recipe::{Compiler, Platform, RecipeConfig};
