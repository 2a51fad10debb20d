//! Filesystem utilities.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use glob::{MatchOptions, Pattern};
use walkdir::WalkDir;

/// Shell-style matching where `*` may cross directory boundaries.
const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: false,
    require_literal_leading_dot: false,
};

/// Remove a directory and all its contents, if it exists.
pub fn remove_dir_all_if_exists(path: &Path) -> Result<()> {
    if path.exists() {
        fs::remove_dir_all(path)
            .with_context(|| format!("failed to remove directory: {}", path.display()))?;
    }
    Ok(())
}

/// Ensure a directory exists, creating it if necessary.
pub fn ensure_dir(path: &Path) -> Result<()> {
    if !path.exists() {
        fs::create_dir_all(path)
            .with_context(|| format!("failed to create directory: {}", path.display()))?;
    }
    Ok(())
}

/// Read a file to string, with nice error messages.
pub fn read_to_string(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("failed to read file: {}", path.display()))
}

/// Write a string to a file, creating parent directories if needed.
pub fn write_string(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        ensure_dir(parent)?;
    }
    fs::write(path, contents).with_context(|| format!("failed to write file: {}", path.display()))
}

/// Get the relative path from `base` to `path`.
pub fn relative_path(base: &Path, path: &Path) -> PathBuf {
    pathdiff::diff_paths(path, base).unwrap_or_else(|| path.to_path_buf())
}

/// All regular files under `root`, relative to it, in walk order.
pub fn list_files(root: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    if !root.is_dir() {
        return Ok(files);
    }
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.with_context(|| format!("failed to walk {}", root.display()))?;
        if entry.file_type().is_file() {
            files.push(relative_path(root, entry.path()));
        }
    }
    Ok(files)
}

/// Copy every file under `src` whose relative path matches `pattern` into
/// `dst`, either keeping the relative path or flattening to the file name.
///
/// A missing `src` matches nothing. Existing destination files are
/// overwritten. Returns the destination paths written.
pub fn copy_matching(src: &Path, pattern: &str, dst: &Path, keep_path: bool) -> Result<Vec<PathBuf>> {
    let matcher =
        Pattern::new(pattern).with_context(|| format!("invalid copy pattern: {}", pattern))?;

    let mut copied = Vec::new();
    for rel in list_files(src)? {
        let rel_str = rel.to_string_lossy().replace('\\', "/");
        if !matcher.matches_with(&rel_str, MATCH_OPTIONS) {
            continue;
        }

        let target = if keep_path {
            dst.join(&rel)
        } else {
            match rel.file_name() {
                Some(name) => dst.join(name),
                None => continue,
            }
        };
        if let Some(parent) = target.parent() {
            ensure_dir(parent)?;
        }

        let from = src.join(&rel);
        tracing::debug!("copy {} -> {}", from.display(), target.display());
        fs::copy(&from, &target).with_context(|| {
            format!("failed to copy {} to {}", from.display(), target.display())
        })?;
        copied.push(target);
    }
    Ok(copied)
}
