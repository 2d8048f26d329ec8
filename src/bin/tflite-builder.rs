use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use tflite_builder::build::BuildRunner;
use tflite_builder::package::{PackageLayout, Packager};
use tflite_builder::preflight;
use tflite_builder::recipe::RecipeConfig;
use tflite_builder::source;
use tflite_builder::PackageManifest;

fn usage() -> &'static str {
    "Usage:\n  tflite-builder fetch [recipe.toml]\n  tflite-builder build [recipe.toml]\n  tflite-builder package <output_dir> [recipe.toml]\n  tflite-builder all <output_dir> [recipe.toml]\n  tflite-builder clear-cache"
}

fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();

    match args.as_slice() {
        [cmd] if cmd == "fetch" => fetch(&load_recipe(None)?).map(|_| ()),
        [cmd, recipe] if cmd == "fetch" => {
            fetch(&load_recipe(Some(Path::new(recipe)))?).map(|_| ())
        }
        [cmd] if cmd == "build" => build(&load_recipe(None)?),
        [cmd, recipe] if cmd == "build" => build(&load_recipe(Some(Path::new(recipe)))?),
        [cmd, output] if cmd == "package" => package(&load_recipe(None)?, Path::new(output)),
        [cmd, output, recipe] if cmd == "package" => {
            package(&load_recipe(Some(Path::new(recipe)))?, Path::new(output))
        }
        [cmd, output] if cmd == "all" => all(&load_recipe(None)?, Path::new(output)),
        [cmd, output, recipe] if cmd == "all" => {
            all(&load_recipe(Some(Path::new(recipe)))?, Path::new(output))
        }
        [cmd] if cmd == "clear-cache" => source::clear_cache(),
        _ => bail!(usage()),
    }
}

fn load_recipe(path: Option<&Path>) -> Result<RecipeConfig> {
    match path {
        Some(path) => RecipeConfig::load(path),
        None => RecipeConfig::default_upstream(),
    }
}

fn work_dir() -> Result<PathBuf> {
    std::env::current_dir().context("resolving current directory")
}

fn fetch(recipe: &RecipeConfig) -> Result<PathBuf> {
    println!(
        "[fetch] {} v{} ({:?})",
        recipe.name, recipe.version, recipe.platform
    );
    let source_dir = source::materialize_source(recipe, &work_dir()?)
        .with_context(|| format!("fetching {} v{}", recipe.source_name, recipe.version))?;
    println!("[fetch] source ready at {}", source_dir.display());
    Ok(source_dir)
}

fn build(recipe: &RecipeConfig) -> Result<()> {
    preflight::check_host_tools()?;

    let source_dir = recipe.source_dir(&work_dir()?);
    println!("[build] {} v{}", recipe.name, recipe.version);
    BuildRunner::new(recipe.clone(), source_dir)?
        .run()
        .with_context(|| format!("building {} v{}", recipe.name, recipe.version))?;
    println!("[build] done");
    Ok(())
}

fn package(recipe: &RecipeConfig, output_root: &Path) -> Result<()> {
    let source_dir = recipe.source_dir(&work_dir()?);
    let layout = PackageLayout::for_source_tree(&source_dir, output_root);

    println!("[package] assembling {}", output_root.display());
    let summary = Packager::new(layout)
        .package()
        .with_context(|| format!("packaging into '{}'", output_root.display()))?;

    let manifest_path = PackageManifest::for_recipe(recipe).write(output_root)?;

    println!(
        "[package] {} libraries, {} headers; manifest at {}",
        summary.libraries,
        summary.headers,
        manifest_path.display()
    );
    Ok(())
}

fn all(recipe: &RecipeConfig, output_root: &Path) -> Result<()> {
    preflight::check_host_tools()?;
    fetch(recipe)?;
    build(recipe)?;
    package(recipe, output_root)
}
