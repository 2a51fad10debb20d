//! `recipekit options` command

use std::path::Path;

use anyhow::Result;

use crate::cli::RecipeArgs;

pub fn execute(args: RecipeArgs, manifest_path: Option<&Path>) -> Result<()> {
    let build = super::prepare(&args, manifest_path)?;

    for (name, value) in build.options().iter() {
        println!("{}={}", name, value);
    }

    let propagations = build.propagations()?;
    if !propagations.is_empty() {
        println!();
        println!("[propagate]");
        for propagation in &propagations {
            for (name, value) in &propagation.options {
                println!("{}:{}={}", propagation.package, name, value);
            }
        }
    }

    Ok(())
}
