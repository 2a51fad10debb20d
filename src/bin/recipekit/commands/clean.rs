//! `recipekit clean` command

use std::path::Path;

use anyhow::Result;

use crate::cli::CleanArgs;
use recipekit::ops::RecipeBuild;
use recipekit::util::fs::remove_dir_all_if_exists;
use recipekit::util::GlobalContext;

pub fn execute(args: CleanArgs, manifest_path: Option<&Path>) -> Result<()> {
    let gctx = GlobalContext::new(manifest_path)?;

    if args.all {
        for dir in [gctx.build_root(), gctx.package_root()] {
            remove_dir_all_if_exists(&dir)?;
            eprintln!("     Removed {}", dir.display());
        }
    } else {
        let build = RecipeBuild::prepare(&gctx, &args.recipe.request())?;
        build.clean()?;
        eprintln!("     Removed {}", build.context().build_dir.display());
        eprintln!("     Removed {}", build.context().package_dir.display());
    }

    Ok(())
}
