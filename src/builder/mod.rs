//! Build side of a recipe.
//!
//! Flag generation, the CMake driver and consumer link information.

pub mod cmake;
pub mod context;
pub mod flags;
pub mod package_info;

pub use cmake::{BuildDriver, CMakeDriver};
pub use context::BuildContext;
pub use flags::{CMakeVar, FlagList};
pub use package_info::PackageInfo;
