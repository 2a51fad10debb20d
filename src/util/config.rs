//! Configuration file support.
//!
//! Two locations are read:
//! - Global: `~/.recipekit/config.toml` - user-wide defaults
//! - Project: `<root>/.recipekit/config.toml` - project overrides
//!
//! Project config takes precedence over global config, and command-line
//! flags take precedence over both.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::builder::flags::FlagList;
use crate::core::manifest::toml_value_text;
use crate::util::fs::read_to_string;

/// Name of the per-project and per-user state directory.
pub const STATE_DIR: &str = ".recipekit";

/// recipekit configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Build driver settings
    pub build: BuildConfig,

    /// Extra CMake cache variables
    pub cmake: CMakeConfig,

    /// Default settings, as `key = value`
    pub settings: BTreeMap<String, toml::Value>,

    /// Option overrides, as `name = value`
    pub options: BTreeMap<String, toml::Value>,

    /// Identity key tuning
    pub identity: IdentityConfig,
}

/// Build driver configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct BuildConfig {
    /// CMake generator (e.g. "Ninja")
    pub generator: Option<String>,

    /// Parallel build jobs (None = let the generator decide)
    pub jobs: Option<usize>,

    /// Toolchain file passed to the configure step
    pub toolchain_file: Option<PathBuf>,

    /// Build directory, relative to the project root
    pub build_dir: Option<PathBuf>,

    /// Package directory, relative to the project root
    pub package_dir: Option<PathBuf>,
}

/// Extra `-D` variables appended after the recipe's own flags.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CMakeConfig {
    pub variables: BTreeMap<String, toml::Value>,
}

/// Identity key configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct IdentityConfig {
    /// Dependencies whose full version is part of the package id
    pub exact_dependencies: Vec<String>,
}

impl Config {
    /// Load configuration from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = read_to_string(path)?;

        toml::from_str(&contents)
            .with_context(|| format!("failed to parse config file: {}", path.display()))
    }

    /// Load configuration, or defaults if the file doesn't exist.
    ///
    /// A file that exists but cannot be read or parsed is an error.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            tracing::debug!("no config at {}", path.display());
            Ok(Self::default())
        }
    }

    /// Merge another config into this one (other takes precedence).
    pub fn merge(&mut self, other: Config) {
        if other.build.generator.is_some() {
            self.build.generator = other.build.generator;
        }
        if other.build.jobs.is_some() {
            self.build.jobs = other.build.jobs;
        }
        if other.build.toolchain_file.is_some() {
            self.build.toolchain_file = other.build.toolchain_file;
        }
        if other.build.build_dir.is_some() {
            self.build.build_dir = other.build.build_dir;
        }
        if other.build.package_dir.is_some() {
            self.build.package_dir = other.build.package_dir;
        }

        // Tables merge key by key
        self.cmake.variables.extend(other.cmake.variables);
        self.settings.extend(other.settings);
        self.options.extend(other.options);

        for name in other.identity.exact_dependencies {
            if !self.identity.exact_dependencies.contains(&name) {
                self.identity.exact_dependencies.push(name);
            }
        }
    }

    /// `[settings]` as textual assignments.
    pub fn setting_assignments(&self) -> Vec<(String, String)> {
        assignments(&self.settings)
    }

    /// `[options]` as textual assignments.
    pub fn option_assignments(&self) -> Vec<(String, String)> {
        assignments(&self.options)
    }

    /// `[cmake] variables` as a flag list, sorted by name.
    pub fn cmake_variables(&self) -> FlagList {
        let mut flags = FlagList::new();
        for (name, value) in assignments(&self.cmake.variables) {
            flags.set(name, value);
        }
        flags
    }
}

fn assignments(table: &BTreeMap<String, toml::Value>) -> Vec<(String, String)> {
    table
        .iter()
        .map(|(key, value)| (key.clone(), toml_value_text(value)))
        .collect()
}

/// Load merged configuration from global and project locations.
///
/// Order of precedence (highest to lowest):
/// 1. Project config (.recipekit/config.toml)
/// 2. Global config (~/.recipekit/config.toml)
/// 3. Defaults
pub fn load_config(global_path: Option<&Path>, project_path: &Path) -> Result<Config> {
    let mut config = Config::default();

    if let Some(global_path) = global_path {
        config.merge(Config::load_or_default(global_path)?);
    }
    config.merge(Config::load_or_default(project_path)?);

    Ok(config)
}

/// The global recipekit directory (~/.recipekit).
pub fn global_config_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|b| b.home_dir().join(STATE_DIR))
}

/// The global config path (~/.recipekit/config.toml).
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("config.toml"))
}

/// The project config path (<root>/.recipekit/config.toml).
pub fn project_config_path(project_root: &Path) -> PathBuf {
    project_root.join(STATE_DIR).join("config.toml")
}
