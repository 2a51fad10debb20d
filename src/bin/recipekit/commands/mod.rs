//! Command implementations

pub mod build;
pub mod clean;
pub mod completions;
pub mod create;
pub mod flags;
pub mod id;
pub mod import;
pub mod info;
pub mod options;
pub mod package;

use std::path::Path;

use anyhow::Result;

use crate::cli::RecipeArgs;
use recipekit::ops::RecipeBuild;
use recipekit::util::GlobalContext;

/// Locate the project and prepare the build described by `args`.
fn prepare(args: &RecipeArgs, manifest_path: Option<&Path>) -> Result<RecipeBuild> {
    let gctx = GlobalContext::new(manifest_path)?;
    RecipeBuild::prepare(&gctx, &args.request())
}
