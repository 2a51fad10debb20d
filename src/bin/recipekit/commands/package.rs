//! `recipekit package` command

use std::path::Path;

use anyhow::Result;

use crate::cli::RecipeArgs;
use recipekit::builder::{BuildDriver, CMakeDriver};

pub fn execute(args: RecipeArgs, manifest_path: Option<&Path>) -> Result<()> {
    let build = super::prepare(&args, manifest_path)?;

    // Copy layouts never touch cmake
    let driver = if build.package_plan().install {
        Some(CMakeDriver::new(build.context())?)
    } else {
        None
    };

    let reports = build.package(driver.as_ref().map(|d| d as &dyn BuildDriver))?;
    for report in &reports {
        eprintln!("    Packaged {} file(s) ({})", report.files.len(), report.name);
    }
    println!("{}", build.context().package_dir.display());
    Ok(())
}
