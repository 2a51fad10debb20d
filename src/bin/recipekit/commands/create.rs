//! `recipekit create` command

use std::path::Path;

use anyhow::Result;

use crate::cli::RecipeArgs;
use recipekit::builder::CMakeDriver;

pub fn execute(args: RecipeArgs, manifest_path: Option<&Path>) -> Result<()> {
    let build = super::prepare(&args, manifest_path)?;
    let driver = CMakeDriver::new(build.context())?;

    build.create(&driver)?;

    eprintln!(
        "     Created {} {}",
        build.recipe().name(),
        build.package_identity().short_key()
    );
    println!("{}", build.context().package_dir.display());
    Ok(())
}
