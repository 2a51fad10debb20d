//! CLI definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;

use recipekit::core::settings::split_assignment;
use recipekit::ops::BuildRequest;

/// recipekit - build recipes for CMake libraries
#[derive(Parser)]
#[command(name = "recipekit")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to Recipe.toml (defaults to searching upward from the current directory)
    #[arg(long, global = true, env = "RECIPEKIT_MANIFEST_PATH")]
    pub manifest_path: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print resolved options and what gets propagated to sub-packages
    Options(RecipeArgs),

    /// Print the CMake cache variables for a build
    Flags(RecipeArgs),

    /// Configure and compile
    Build(RecipeArgs),

    /// Copy build outputs into the package directory
    Package(RecipeArgs),

    /// Build and package in one go
    Create(RecipeArgs),

    /// Print the package and build identity keys
    Id(IdArgs),

    /// Print the link flags consumers need
    Info(InfoArgs),

    /// Copy runtime libraries and resources out of dependency packages
    Import(ImportArgs),

    /// Remove build and package directories
    Clean(CleanArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

/// Settings and option overrides shared by recipe commands.
#[derive(Args, Clone, Default)]
pub struct RecipeArgs {
    /// Setting override, e.g. `-s os=iOS -s os.sdk=device` (repeatable)
    #[arg(short = 's', long = "setting", value_name = "KEY=VALUE", value_parser = parse_assignment)]
    pub settings: Vec<(String, String)>,

    /// Option override, e.g. `-o log_level=Debug` (repeatable)
    #[arg(short = 'o', long = "option", value_name = "NAME=VALUE", value_parser = parse_assignment)]
    pub options: Vec<(String, String)>,
}

impl RecipeArgs {
    pub fn request(&self) -> BuildRequest {
        BuildRequest {
            settings: self.settings.clone(),
            options: self.options.clone(),
        }
    }
}

#[derive(Args)]
pub struct IdArgs {
    #[command(flatten)]
    pub recipe: RecipeArgs,

    /// Print the canonical text the keys are hashed from
    #[arg(long)]
    pub text: bool,
}

#[derive(Args)]
pub struct InfoArgs {
    #[command(flatten)]
    pub recipe: RecipeArgs,

    /// Print as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args)]
pub struct ImportArgs {
    /// Dependency package directories
    #[arg(long = "from", value_name = "PACKAGE_DIR", required = true)]
    pub from: Vec<PathBuf>,

    /// Destination directory
    #[arg(long, value_name = "DIR")]
    pub to: PathBuf,
}

#[derive(Args)]
pub struct CleanArgs {
    #[command(flatten)]
    pub recipe: RecipeArgs,

    /// Remove every build and package directory of the project
    #[arg(long)]
    pub all: bool,
}

#[derive(Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,

    /// Write the script to a file instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

fn parse_assignment(s: &str) -> Result<(String, String), String> {
    split_assignment(s)
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .ok_or_else(|| format!("expected KEY=VALUE, got `{}`", s))
}
