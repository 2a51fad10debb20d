//! Recipe error types.
//!
//! Three families: configuration errors (raised before any external tool
//! runs), external tool failures (surfaced verbatim), and packaging errors.

use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

/// Error raised while resolving, building or packaging a recipe.
#[derive(Debug, Error, Diagnostic)]
pub enum RecipeError {
    #[error("unknown option `{name}` for recipe `{recipe}`")]
    #[diagnostic(
        code(recipekit::config::unknown_option),
        help("known options: {known}")
    )]
    UnknownOption {
        recipe: String,
        name: String,
        known: String,
    },

    #[error("invalid value `{value}` for option `{name}`")]
    #[diagnostic(code(recipekit::config::invalid_option), help("expected one of: {expected}"))]
    InvalidOptionValue {
        name: String,
        value: String,
        expected: String,
    },

    #[error("option(s) never resolved to a concrete value: {}", .names.join(", "))]
    #[diagnostic(
        code(recipekit::config::unresolved_option),
        help("set a default in Recipe.toml or pass `-o <name>=<value>`")
    )]
    UnresolvedOption { names: Vec<String> },

    #[error("invalid value `{value}` for setting `{setting}`")]
    #[diagnostic(code(recipekit::config::invalid_setting), help("expected one of: {expected}"))]
    InvalidSetting {
        setting: String,
        value: String,
        expected: String,
    },

    #[error("inconsistent settings: {message}")]
    #[diagnostic(code(recipekit::config::inconsistent_settings))]
    InconsistentSettings { message: String },

    #[error("`{tool}` not found in PATH")]
    #[diagnostic(code(recipekit::config::tool_not_found), help("{hint}"))]
    ToolNotFound { tool: String, hint: String },

    #[error("`{command}` failed with exit code {}\n{stderr}", .status.map(|c| c.to_string()).unwrap_or_else(|| "<signal>".to_string()))]
    #[diagnostic(code(recipekit::build::tool_failed))]
    ToolFailed {
        command: String,
        status: Option<i32>,
        stderr: String,
    },

    #[error("packaging step `{step}` matched no files in {}", .src.display())]
    #[diagnostic(
        code(recipekit::package::no_artifacts),
        help("patterns tried: {patterns}; was the build run for these settings?")
    )]
    NoArtifacts {
        step: String,
        src: PathBuf,
        patterns: String,
    },
}
