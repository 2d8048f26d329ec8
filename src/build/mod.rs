//! Bazel build invocation for the TensorFlow Lite target.
//!
//! Runs, in order and inside the unpacked source tree: the upstream configure
//! script, `bazel shutdown` (so the freshly written `.bazelrc` is picked up by
//! a clean server), the TFLite dependency download script, and the
//! `bazel build` of the platform's `libtensorflowlite` target.
//!
//! Each step is an external process; its exit code is the only signal
//! consumed. Non-zero aborts the whole build with the step name and code.

pub mod env;

use anyhow::{bail, Context, Result};
use std::path::PathBuf;
use std::process::Command;

use crate::recipe::{Compiler, Platform, RecipeConfig};
use env::BuildEnv;

/// Script that fetches the TFLite Makefile dependencies, relative to the
/// source tree.
const DOWNLOAD_DEPS_SCRIPT: &str = "tensorflow/lite/tools/make/download_dependencies.sh";

/// Bazel target label for the shared library on a platform.
///
/// The label shape is an upstream convention: macOS builds a `.dylib`, Linux
/// a `.so`, and Windows uses a non-absolute label. iOS has no shared-library
/// target and is rejected.
pub fn target_label(platform: Platform) -> Result<&'static str> {
    match platform {
        Platform::Linux => Ok("//tensorflow/lite:libtensorflowlite.so"),
        Platform::Macos => Ok("//tensorflow/lite:libtensorflowlite.dylib"),
        Platform::Windows => Ok("tensorflow/lite:libtensorflowlite.so"),
        Platform::Ios => bail!("no libtensorflowlite bazel target exists for iOS"),
    }
}

/// Arguments for the `bazel build` step.
pub fn bazel_build_args(compiler: Compiler, target: &str) -> Vec<String> {
    let mut args = vec!["build".to_string()];
    // MSVC has no C++11 mode; it defaults to C++14.
    if compiler != Compiler::Msvc {
        args.push("--cxxopt=-std=c++11".to_string());
    }
    args.push("--config=opt".to_string());
    args.push("--define=no_tensorflow_py_deps=true".to_string());
    args.push(target.to_string());
    args.push("--verbose_failures".to_string());
    args
}

/// Drives the configure and bazel steps for one source tree.
pub struct BuildRunner {
    recipe: RecipeConfig,
    source_dir: PathBuf,
    env: BuildEnv,
}

impl BuildRunner {
    /// Create a runner for an unpacked source tree.
    pub fn new(recipe: RecipeConfig, source_dir: PathBuf) -> Result<Self> {
        if !source_dir.join("WORKSPACE").exists() {
            bail!(
                "source tree not found at '{}'; fetch the source first",
                source_dir.display()
            );
        }
        let env = BuildEnv::for_recipe(&recipe)?;
        Ok(Self {
            recipe,
            source_dir,
            env,
        })
    }

    /// Run the full build sequence.
    pub fn run(&self) -> Result<()> {
        self.configure()?;
        self.bazel_shutdown()?;
        self.download_dependencies()?;
        self.bazel_build()?;
        Ok(())
    }

    fn configure(&self) -> Result<()> {
        println!("  Running configure...");
        let mut cmd = match self.recipe.platform {
            Platform::Windows => {
                let mut cmd = Command::new(&self.env.python_bin);
                cmd.arg("configure.py");
                cmd
            }
            _ => {
                let mut cmd = Command::new("sh");
                cmd.arg("configure");
                cmd
            }
        };
        self.run_step("configure", &mut cmd)
    }

    fn bazel_shutdown(&self) -> Result<()> {
        let mut cmd = Command::new("bazel");
        cmd.arg("shutdown");
        self.run_step("bazel shutdown", &mut cmd)
    }

    fn download_dependencies(&self) -> Result<()> {
        println!("  Downloading TFLite dependencies...");
        let mut cmd = Command::new("sh");
        cmd.arg(DOWNLOAD_DEPS_SCRIPT);
        self.run_step("download_dependencies.sh", &mut cmd)
    }

    fn bazel_build(&self) -> Result<()> {
        let target = target_label(self.recipe.platform)?;
        println!("  Building {}...", target);
        let mut cmd = Command::new("bazel");
        cmd.args(bazel_build_args(self.recipe.compiler, target));
        self.run_step("bazel build", &mut cmd)
    }

    /// Run one build step inside the source tree with the build environment.
    fn run_step(&self, name: &str, cmd: &mut Command) -> Result<()> {
        let status = cmd
            .current_dir(&self.source_dir)
            .envs(self.env.vars())
            .status()
            .with_context(|| format!("Failed to execute {}", name))?;

        if !status.success() {
            bail!(
                "{} failed with exit code: {}",
                name,
                status.code().unwrap_or(-1)
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_label_per_platform() {
        assert_eq!(
            target_label(Platform::Linux).unwrap(),
            "//tensorflow/lite:libtensorflowlite.so"
        );
        assert_eq!(
            target_label(Platform::Macos).unwrap(),
            "//tensorflow/lite:libtensorflowlite.dylib"
        );
        assert_eq!(
            target_label(Platform::Windows).unwrap(),
            "tensorflow/lite:libtensorflowlite.so"
        );
        assert!(target_label(Platform::Ios).is_err());
    }

    #[test]
    fn build_args_include_cxx11_for_non_msvc() {
        let args = bazel_build_args(Compiler::Other, "//tensorflow/lite:libtensorflowlite.so");
        assert!(args.contains(&"--cxxopt=-std=c++11".to_string()));
        assert!(args.contains(&"--config=opt".to_string()));
        assert!(args.contains(&"--verbose_failures".to_string()));
    }

    #[test]
    fn build_args_omit_cxx11_for_msvc() {
        let args = bazel_build_args(Compiler::Msvc, "tensorflow/lite:libtensorflowlite.so");
        assert!(!args.iter().any(|a| a.starts_with("--cxxopt")));
        assert!(args.contains(&"--define=no_tensorflow_py_deps=true".to_string()));
    }

    #[test]
    fn runner_rejects_missing_source_tree() {
        let temp = tempfile::TempDir::new().unwrap();
        let recipe = RecipeConfig::default_upstream().unwrap();
        let result = BuildRunner::new(recipe, temp.path().join("nowhere"));
        assert!(result.is_err());
    }
}
