//! Preflight checks for build validation.
//!
//! Validates that the host system has the external tools a TensorFlow build
//! needs before any source is downloaded. This prevents cryptic errors deep
//! inside the bazel invocation.
//!
//! # Example
//!
//! ```rust
//! use tflite_builder::preflight::{command_exists, check_required_tools};
//!
//! // Check a single command
//! if !command_exists("bazel") {
//!     println!("bazel not installed");
//! }
//!
//! // Check multiple tools
//! let tools = &[("bazel", "bazel"), ("java", "java-runtime")];
//! if let Err(e) = check_required_tools(tools) {
//!     eprintln!("{}", e);
//! }
//! ```

use anyhow::{bail, Result};

/// Check if a command exists on the host system.
///
/// Uses `which` to locate the command in PATH.
pub fn command_exists(cmd: &str) -> bool {
    which::which(cmd).is_ok()
}

/// Required host tools for building TensorFlow Lite.
///
/// Each tuple is (command_name, package_name). Bazel drives the build, java
/// backs bazel itself, and python runs the upstream configure script.
pub const REQUIRED_TOOLS: &[(&str, &str)] = &[
    ("bazel", "bazel"),
    ("java", "java-runtime"),
    ("python", "python"),
];

/// Check that specific tools are available.
///
/// # Arguments
///
/// * `tools` - Slice of (command, package) tuples
///
/// # Returns
///
/// * `Ok(())` if all tools are found
/// * `Err` with list of missing tools and their packages
pub fn check_required_tools(tools: &[(&str, &str)]) -> Result<()> {
    let mut missing = Vec::new();

    for (tool, package) in tools {
        if !command_exists(tool) {
            missing.push((*tool, *package));
        }
    }

    if !missing.is_empty() {
        let msg = missing
            .iter()
            .map(|(t, p)| format!("  {} (install: {})", t, p))
            .collect::<Vec<_>>()
            .join("\n");
        bail!("Missing required host tools:\n{}", msg);
    }

    Ok(())
}

/// Check that all tools a full fetch-build-package run needs are available.
///
/// This checks all tools in [`REQUIRED_TOOLS`].
pub fn check_host_tools() -> Result<()> {
    check_required_tools(REQUIRED_TOOLS)
}
