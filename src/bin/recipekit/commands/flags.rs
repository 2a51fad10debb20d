//! `recipekit flags` command

use std::path::Path;

use anyhow::Result;

use crate::cli::RecipeArgs;

pub fn execute(args: RecipeArgs, manifest_path: Option<&Path>) -> Result<()> {
    let build = super::prepare(&args, manifest_path)?;
    for arg in build.flags()?.to_args() {
        println!("{}", arg);
    }
    Ok(())
}
