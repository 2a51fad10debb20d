//! High-level operations.
//!
//! This module contains the implementation of recipekit commands.

pub mod imports;
pub mod package;
pub mod recipe_build;

pub use imports::import_runtime_files;
pub use package::{CopyPass, CopyStep, PackagePlan, StepReport};
pub use recipe_build::{BuildRequest, InfoRecord, RecipeBuild, INFO_FILE};
