//! `recipekit completions` command

use std::fs::File;
use std::io::{self, Write};

use anyhow::{Context, Result};
use clap::CommandFactory;
use clap_complete::generate;

use recipekit::util::fs::ensure_dir;

use crate::cli::{Cli, CompletionsArgs};

pub fn execute(args: CompletionsArgs) -> Result<()> {
    let mut cmd = Cli::command();
    let name = cmd.get_name().to_string();

    let mut out: Box<dyn Write> = match &args.output {
        Some(path) => {
            if let Some(parent) = path.parent() {
                ensure_dir(parent)?;
            }
            let file = File::create(path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            Box::new(file)
        }
        None => Box::new(io::stdout()),
    };
    generate(args.shell, &mut cmd, name, &mut out);
    out.flush()?;

    if let Some(path) = &args.output {
        tracing::info!("Wrote {} completions to {}", args.shell, path.display());
    }
    Ok(())
}
