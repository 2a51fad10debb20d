//! Runtime imports - copying dependency runtime files next to a consumer.

use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::util::fs::copy_matching;

/// `(subdirectory of the dependency package, pattern)` pairs.
pub const IMPORT_PATTERNS: &[(&str, &str)] = &[
    ("bin", "*.dll"),
    ("lib", "*.dylib"),
    ("res", "*.zzip"),
    ("res", "*.pod"),
    ("res", "*.strop"),
    ("res", "*.rtttl"),
];

/// Copy shared libraries and resources from each dependency package into
/// `dest`, keeping their path below `bin`, `lib` or `res`. Matching
/// nothing is not an error.
pub fn import_runtime_files(packages: &[PathBuf], dest: &Path) -> Result<Vec<PathBuf>> {
    let mut copied = Vec::new();
    for package in packages {
        for (subdir, pattern) in IMPORT_PATTERNS {
            copied.extend(copy_matching(&package.join(subdir), pattern, dest, true)?);
        }
    }

    if copied.is_empty() {
        tracing::warn!("no runtime files to import");
    } else {
        tracing::info!("Imported {} file(s) into {}", copied.len(), dest.display());
    }
    Ok(copied)
}
