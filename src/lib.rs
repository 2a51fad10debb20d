//! recipekit - recipe-driven builds for native CMake libraries
//!
//! This crate provides the library side of recipekit: option resolution,
//! CMake flag generation, build invocation, artifact packaging and
//! package identity computation.

pub mod builder;
pub mod core;
pub mod ops;
pub mod util;

pub use crate::core::{
    errors::RecipeError, manifest::Manifest, options::ResolvedOptions, package_id::PackageIdentity,
    recipe::Recipe, settings::Settings,
};

pub use crate::builder::flags::FlagList;
pub use crate::util::context::GlobalContext;
