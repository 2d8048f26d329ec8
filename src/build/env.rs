//! Explicit environment record for the bazel invocation.
//!
//! The upstream configure script is parameterized entirely through
//! environment variables. Rather than mutating the process environment, the
//! full set is carried in a [`BuildEnv`] value and handed to each spawned
//! command, so two builds in one process lifetime cannot leak configuration
//! into each other.

use anyhow::{Context, Result};
use std::path::PathBuf;

use crate::recipe::{Compiler, Platform, RecipeConfig};

/// Environment configuration for the configure and bazel build steps.
#[derive(Debug, Clone)]
pub struct BuildEnv {
    /// Python interpreter the configure script should use.
    pub python_bin: PathBuf,
    /// Compiler optimization flags (`-march=native`, or `/arch:AVX` for MSVC).
    pub cc_opt_flags: String,
    /// Whether the iOS configuration branch is enabled.
    pub configure_ios: bool,
}

impl BuildEnv {
    /// Derive the environment record for a recipe.
    ///
    /// Fails if no python interpreter can be found on PATH.
    pub fn for_recipe(recipe: &RecipeConfig) -> Result<Self> {
        let python_bin = which::which("python")
            .or_else(|_| which::which("python3"))
            .context("locating a python interpreter for the configure script")?;

        let cc_opt_flags = match recipe.compiler {
            Compiler::Msvc => "/arch:AVX".to_string(),
            Compiler::Other => "-march=native".to_string(),
        };

        Ok(Self {
            python_bin,
            cc_opt_flags,
            configure_ios: recipe.platform == Platform::Ios,
        })
    }

    /// The full variable set, ready for `Command::envs`.
    ///
    /// Everything the upstream configure script reads is pinned here so the
    /// script never falls back to interactive prompts.
    pub fn vars(&self) -> Vec<(&'static str, String)> {
        vec![
            ("MSYS_NO_PATHCONV", "1".to_string()),
            (
                "PYTHON_BIN_PATH",
                self.python_bin.to_string_lossy().into_owned(),
            ),
            ("USE_DEFAULT_PYTHON_LIB_PATH", "1".to_string()),
            ("TF_OVERRIDE_EIGEN_STRONG_INLINE", "0".to_string()),
            ("TF_ENABLE_XLA", "1".to_string()),
            ("TF_NEED_OPENCL_SYCL", "0".to_string()),
            ("TF_NEED_ROCM", "0".to_string()),
            ("TF_NEED_CUDA", "0".to_string()),
            ("TF_NEED_MPI", "0".to_string()),
            ("TF_DOWNLOAD_CLANG", "0".to_string()),
            ("TF_SET_ANDROID_WORKSPACE", "0".to_string()),
            ("CC_OPT_FLAGS", self.cc_opt_flags.clone()),
            (
                "TF_CONFIGURE_IOS",
                if self.configure_ios { "1" } else { "0" }.to_string(),
            ),
        ]
    }
}
