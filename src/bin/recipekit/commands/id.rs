//! `recipekit id` command

use std::path::Path;

use anyhow::Result;

use crate::cli::IdArgs;

pub fn execute(args: IdArgs, manifest_path: Option<&Path>) -> Result<()> {
    let build = super::prepare(&args.recipe, manifest_path)?;
    let package = build.package_identity();
    let build_id = build.build_identity();

    if args.text {
        println!("# package");
        print!("{}", package.canonical_text());
        println!("# build");
        print!("{}", build_id.canonical_text());
    } else {
        let archs: Vec<&str> = build.compatible_archs().iter().map(|a| a.as_str()).collect();
        println!("package_id: {}", package.key());
        println!("build_id: {}", build_id.key());
        println!("compatible_archs: {}", archs.join(" "));
    }
    Ok(())
}
