//! Recipe.toml manifest parsing and schema.
//!
//! The manifest sits next to the library's source tree and names the base
//! recipe, extra options, default overrides, dependencies and layout.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use semver::Version;
use serde::{Deserialize, Serialize};

use crate::core::options::{OptionDef, OptionDefault, OptionDomain, OptionSchema, OptionValue};
use crate::util::fs::read_to_string;

/// Canonical manifest file name.
pub const MANIFEST_NAME: &str = "Recipe.toml";

/// Base recipe a manifest builds on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BaseRecipe {
    /// Log level, timer and testing options.
    #[default]
    Core,
    /// Core plus result serialization options.
    Recognizer,
}

/// Which header directory is published.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HeaderSet {
    /// `<name>/Include`
    #[default]
    Public,
    /// `<name>/Source`
    All,
}

/// How the package directory is populated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayoutMode {
    /// Glob passes over the source and build trees.
    #[default]
    Copy,
    /// The build driver's install step, prefix = package directory.
    Install,
}

/// The parsed Recipe.toml.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    pub package: PackageMetadata,

    /// Options declared by this recipe on top of the base chain.
    #[serde(default)]
    pub options: BTreeMap<String, OptionDecl>,

    /// Overrides of inherited defaults.
    #[serde(default, rename = "default-options")]
    pub default_options: BTreeMap<String, toml::Value>,

    /// Already-resolved dependency versions.
    #[serde(default)]
    pub dependencies: BTreeMap<String, String>,

    #[serde(default)]
    pub propagate: PropagateConfig,

    #[serde(default)]
    pub layout: LayoutConfig,
}

/// `[package]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageMetadata {
    pub name: String,
    pub version: String,
    #[serde(default)]
    pub base: BaseRecipe,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub license: Option<String>,
}

/// `[options.<name>]` declaration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OptionDecl {
    #[serde(default)]
    pub choices: Vec<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub default: Option<toml::Value>,
    #[serde(default)]
    pub cmake: Option<String>,
}

/// `[propagate]` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PropagateConfig {
    /// Sub-packages receiving propagated options; `*` means all.
    #[serde(default)]
    pub packages: Vec<String>,
}

/// `[layout]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    pub headers: HeaderSet,
    pub libraries: Vec<String>,
    pub mode: LayoutMode,
    #[serde(rename = "exact-dependencies")]
    pub exact_dependencies: Vec<String>,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        LayoutConfig {
            headers: HeaderSet::Public,
            libraries: vec!["*".to_string()],
            mode: LayoutMode::Copy,
            exact_dependencies: Vec::new(),
        }
    }
}

impl Manifest {
    /// Load and validate a manifest from disk.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = read_to_string(path)?;
        Self::parse(&contents)
            .with_context(|| format!("failed to parse manifest: {}", path.display()))
    }

    /// Parse manifest text.
    pub fn parse(contents: &str) -> Result<Self> {
        let manifest: Manifest = toml::from_str(contents)?;
        manifest.validate()?;
        Ok(manifest)
    }

    fn validate(&self) -> Result<()> {
        if self.package.name.trim().is_empty() {
            bail!("package name must not be empty");
        }
        self.version()?;

        for (name, decl) in &self.options {
            decl.to_def(name)?;
        }

        for (name, version) in &self.dependencies {
            parse_lenient_version(version)
                .with_context(|| format!("invalid version for dependency `{}`", name))?;
        }

        if self.layout.libraries.is_empty() {
            bail!("[layout] libraries must name at least one library pattern");
        }

        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.package.name
    }

    pub fn version(&self) -> Result<Version> {
        parse_lenient_version(&self.package.version)
            .with_context(|| format!("invalid package version `{}`", self.package.version))
    }

    /// Options declared by this manifest as a schema fragment.
    pub fn option_schema(&self) -> Result<OptionSchema> {
        let mut schema = OptionSchema::new();
        for (name, decl) in &self.options {
            schema.declare(decl.to_def(name)?);
        }
        Ok(schema)
    }

    /// `[default-options]` as textual assignments.
    pub fn default_option_assignments(&self) -> Vec<(String, String)> {
        self.default_options
            .iter()
            .map(|(name, value)| (name.clone(), toml_value_text(value)))
            .collect()
    }
}

impl OptionDecl {
    fn to_def(&self, name: &str) -> Result<OptionDef> {
        let domain = match (self.kind.as_deref(), self.choices.is_empty()) {
            (Some("bool"), true) => OptionDomain::Bool,
            (None, false) => OptionDomain::Choices(self.choices.clone()),
            (Some("bool"), false) => {
                bail!("option `{}` cannot have both type = \"bool\" and choices", name)
            }
            (Some(other), _) => bail!("option `{}` has unknown type `{}`", name, other),
            (None, true) => bail!("option `{}` needs `choices` or type = \"bool\"", name),
        };

        let default = match &self.default {
            Some(value) => OptionDefault::Value(domain.parse(name, &toml_value_text(value))?),
            None => OptionDefault::None,
        };

        Ok(OptionDef {
            name: name.to_string(),
            domain,
            default,
            cmake_var: self.cmake.clone(),
        })
    }
}

/// Textual form of a TOML option value; booleans use `True`/`False`.
pub(crate) fn toml_value_text(value: &toml::Value) -> String {
    match value {
        toml::Value::Boolean(b) => OptionValue::Bool(*b).to_string(),
        toml::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Parse a version, padding `1.75` to `1.75.0` and `3` to `3.0.0`.
pub fn parse_lenient_version(s: &str) -> Result<Version> {
    if let Ok(v) = Version::parse(s) {
        return Ok(v);
    }
    let dots = s.matches('.').count();
    let padded = match dots {
        0 => format!("{}.0.0", s),
        1 => format!("{}.0", s),
        _ => s.to_string(),
    };
    Version::parse(&padded).with_context(|| format!("`{}` is not a version", s))
}

/// Find `Recipe.toml` in `start` or its ancestors.
pub fn find_manifest(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .map(|dir| dir.join(MANIFEST_NAME))
        .find(|candidate| candidate.is_file())
}
