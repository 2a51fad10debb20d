//! recipekit CLI - build, package and identify CMake library recipes

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;

use cli::{Cli, Commands};

fn main() {
    if let Err(e) = run() {
        eprintln!("error: {:#}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("recipekit=debug")
    } else {
        EnvFilter::new("recipekit=info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();

    let manifest_path = cli.manifest_path.as_deref();
    match cli.command {
        Commands::Options(args) => commands::options::execute(args, manifest_path),
        Commands::Flags(args) => commands::flags::execute(args, manifest_path),
        Commands::Build(args) => commands::build::execute(args, manifest_path),
        Commands::Package(args) => commands::package::execute(args, manifest_path),
        Commands::Create(args) => commands::create::execute(args, manifest_path),
        Commands::Id(args) => commands::id::execute(args, manifest_path),
        Commands::Info(args) => commands::info::execute(args, manifest_path),
        Commands::Import(args) => commands::import::execute(args),
        Commands::Clean(args) => commands::clean::execute(args, manifest_path),
        Commands::Completions(args) => commands::completions::execute(args),
    }
}
