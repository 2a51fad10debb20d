//! `recipekit import` command

use anyhow::Result;

use crate::cli::ImportArgs;
use recipekit::ops::import_runtime_files;

pub fn execute(args: ImportArgs) -> Result<()> {
    let copied = import_runtime_files(&args.from, &args.to)?;
    for path in &copied {
        println!("{}", path.display());
    }
    Ok(())
}
