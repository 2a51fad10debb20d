//! Global context for recipekit operations.
//!
//! Locates the recipe manifest and project root, loads the layered
//! configuration and knows where build and package trees live.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};

use crate::core::manifest::{find_manifest, MANIFEST_NAME};
use crate::util::config::{global_config_path, load_config, project_config_path, Config, STATE_DIR};

/// Paths and configuration shared by every command.
#[derive(Debug, Clone)]
pub struct GlobalContext {
    /// Path to Recipe.toml
    manifest_path: PathBuf,

    /// Directory containing the manifest
    root: PathBuf,

    /// Merged global and project configuration
    config: Config,
}

impl GlobalContext {
    /// Discover the manifest from the current directory upward, or use
    /// an explicit `--manifest-path`.
    pub fn new(manifest_path: Option<&Path>) -> Result<Self> {
        let cwd = std::env::current_dir().context("failed to get current directory")?;
        Self::with_cwd(&cwd, manifest_path)
    }

    /// Like [`GlobalContext::new`], starting the search at `cwd`.
    pub fn with_cwd(cwd: &Path, manifest_path: Option<&Path>) -> Result<Self> {
        let manifest_path = match manifest_path {
            Some(path) => {
                let path = if path.is_absolute() {
                    path.to_path_buf()
                } else {
                    cwd.join(path)
                };
                if !path.is_file() {
                    bail!("manifest not found: {}", path.display());
                }
                path
            }
            None => match find_manifest(cwd) {
                Some(path) => path,
                None => bail!(
                    "could not find `{}` in `{}` or any parent directory",
                    MANIFEST_NAME,
                    cwd.display()
                ),
            },
        };

        let root = manifest_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| cwd.to_path_buf());

        let global = global_config_path();
        let config = load_config(global.as_deref(), &project_config_path(&root))?;

        Ok(GlobalContext {
            manifest_path,
            root,
            config,
        })
    }

    /// Replace the loaded configuration.
    pub fn with_config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    pub fn manifest_path(&self) -> &Path {
        &self.manifest_path
    }

    /// The project root (directory containing Recipe.toml).
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// `<root>/.recipekit`
    pub fn state_dir(&self) -> PathBuf {
        self.root.join(STATE_DIR)
    }

    /// Parent of all build trees, `[build] build-dir` if configured.
    pub fn build_root(&self) -> PathBuf {
        match &self.config.build.build_dir {
            Some(dir) => self.root.join(dir),
            None => self.state_dir().join("build"),
        }
    }

    /// Parent of all package trees, `[build] package-dir` if configured.
    pub fn package_root(&self) -> PathBuf {
        match &self.config.build.package_dir {
            Some(dir) => self.root.join(dir),
            None => self.state_dir().join("package"),
        }
    }

    /// Build tree for one build identity.
    pub fn build_dir(&self, build_key: &str) -> PathBuf {
        self.build_root().join(build_key)
    }

    /// Package tree for one package identity.
    pub fn package_dir(&self, package_key: &str) -> PathBuf {
        self.package_root().join(package_key)
    }
}
