//! Core data structures for recipekit.
//!
//! This module contains the foundational types used throughout recipekit:
//! - Build settings (the platform tuple)
//! - Option schemas, layers and resolved values
//! - The Recipe.toml manifest and base recipe chain
//! - Package identity keys

pub mod errors;
pub mod manifest;
pub mod options;
pub mod package_id;
pub mod recipe;
pub mod settings;

pub use errors::RecipeError;
pub use manifest::{find_manifest, Manifest, MANIFEST_NAME};
pub use options::{OptionLayer, OptionSchema, OptionValue, ResolvedOptions};
pub use package_id::{DependencyRef, PackageIdentity};
pub use recipe::{OptionOverrides, Recipe};
pub use settings::{HostPlatform, Settings};
