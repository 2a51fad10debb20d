//! `recipekit build` command

use std::path::Path;

use anyhow::Result;

use crate::cli::RecipeArgs;
use recipekit::builder::CMakeDriver;

pub fn execute(args: RecipeArgs, manifest_path: Option<&Path>) -> Result<()> {
    let build = super::prepare(&args, manifest_path)?;
    let driver = CMakeDriver::new(build.context())?;

    build.build(&driver)?;

    eprintln!(
        "    Finished {} ({}) in {}",
        build.recipe().name(),
        build.settings(),
        build.context().build_dir.display()
    );
    Ok(())
}
