//! `recipekit info` command

use std::path::Path;

use anyhow::Result;
use serde::Serialize;

use recipekit::builder::PackageInfo;
use recipekit::core::settings::Arch;

use crate::cli::InfoArgs;

/// What a consumer needs to know about the package.
#[derive(Serialize)]
struct ConsumerInfo {
    #[serde(flatten)]
    link_flags: PackageInfo,
    compatible_archs: Vec<Arch>,
}

pub fn execute(args: InfoArgs, manifest_path: Option<&Path>) -> Result<()> {
    let build = super::prepare(&args.recipe, manifest_path)?;
    let info = ConsumerInfo {
        link_flags: build.package_info(),
        compatible_archs: build.compatible_archs(),
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&info)?);
    } else {
        let archs: Vec<&str> = info.compatible_archs.iter().map(|a| a.as_str()).collect();
        println!("shared_link_flags: {}", info.link_flags.shared_link_flags.join(" "));
        println!("exe_link_flags: {}", info.link_flags.exe_link_flags.join(" "));
        println!("compatible_archs: {}", archs.join(" "));
    }
    Ok(())
}
