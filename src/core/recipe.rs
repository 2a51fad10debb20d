//! Recipes - a manifest bound to its base recipe chain.
//!
//! The chain is explicit: `recognizer` extends `core`. Each link
//! contributes option declarations; the manifest then adds its own.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Result;
use serde::Serialize;

use crate::core::errors::RecipeError;
use crate::core::manifest::{BaseRecipe, Manifest};
use crate::core::options::{
    OptionDef, OptionLayer, OptionSchema, OptionValue, PlatformRule, ResolvedOptions,
};
use crate::core::settings::{Os, Settings};

pub const LOG_LEVEL: &str = "log_level";
pub const ENABLE_TIMER: &str = "enable_timer";
pub const ENABLE_TESTING: &str = "enable_testing";
pub const RESULT_JSONIZATION: &str = "result_jsonization";
pub const BINARY_SERIALIZATION: &str = "binary_serialization";

/// Accepted log levels, most verbose first.
pub const LOG_LEVELS: &[&str] = &["Verbose", "Debug", "Info", "WarningsAndErrors"];

/// Accepted result jsonization modes.
pub const JSONIZATION_MODES: &[&str] = &["Off", "Serialization", "SerializationAndTesting"];

/// Options pushed down into sub-packages by recognizer recipes.
const PROPAGATED: &[&str] = &[RESULT_JSONIZATION, BINARY_SERIALIZATION, ENABLE_TESTING];

impl BaseRecipe {
    /// The chain from root to this recipe.
    pub fn chain(&self) -> &'static [BaseRecipe] {
        match self {
            BaseRecipe::Core => &[BaseRecipe::Core],
            BaseRecipe::Recognizer => &[BaseRecipe::Core, BaseRecipe::Recognizer],
        }
    }

    /// Options declared by this link alone.
    fn own_options(&self) -> OptionSchema {
        let mut schema = OptionSchema::new();
        match self {
            BaseRecipe::Core => {
                schema
                    .declare(OptionDef::choice(LOG_LEVEL, LOG_LEVELS, "WarningsAndErrors"))
                    .declare(OptionDef::boolean(ENABLE_TIMER, false))
                    .declare(OptionDef::boolean(ENABLE_TESTING, false));
            }
            BaseRecipe::Recognizer => {
                schema
                    .declare(OptionDef::choice(RESULT_JSONIZATION, JSONIZATION_MODES, "Off"))
                    .declare(OptionDef::platform_bool(
                        BINARY_SERIALIZATION,
                        PlatformRule::EnabledOn(Os::Android),
                    ));
            }
        }
        schema
    }

    /// Option schema of the whole chain.
    pub fn schema(&self) -> OptionSchema {
        let mut schema = OptionSchema::new();
        for link in self.chain() {
            schema.extend(&link.own_options());
        }
        schema
    }

    /// Whether `link` is part of this recipe's chain.
    pub fn inherits(&self, link: BaseRecipe) -> bool {
        self.chain().contains(&link)
    }
}

/// Option overrides from outside the manifest.
#[derive(Debug, Clone, Default)]
pub struct OptionOverrides {
    /// From the configuration files.
    pub config: Vec<(String, String)>,
    /// From the command line.
    pub cli: Vec<(String, String)>,
}

/// Option values to push into one sub-package pattern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Propagation {
    pub package: String,
    pub options: BTreeMap<String, OptionValue>,
}

/// A loaded recipe.
#[derive(Debug, Clone)]
pub struct Recipe {
    manifest: Manifest,
    schema: OptionSchema,
}

impl Recipe {
    /// Build a recipe from a parsed manifest.
    pub fn new(manifest: Manifest) -> Result<Self> {
        let mut schema = manifest.package.base.schema();
        schema.extend(&manifest.option_schema()?);
        Ok(Recipe { manifest, schema })
    }

    /// Load `Recipe.toml` from disk.
    pub fn load(path: &Path) -> Result<Self> {
        Self::new(Manifest::load(path)?)
    }

    pub fn name(&self) -> &str {
        self.manifest.name()
    }

    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    pub fn base(&self) -> BaseRecipe {
        self.manifest.package.base
    }

    pub fn schema(&self) -> &OptionSchema {
        &self.schema
    }

    /// Resolve all options for one build.
    pub fn resolve_options(
        &self,
        settings: &Settings,
        overrides: &OptionOverrides,
    ) -> Result<ResolvedOptions, RecipeError> {
        let manifest_layer = self.layer(&self.manifest.default_option_assignments())?;
        let config_layer = self.layer(&overrides.config)?;
        let cli_layer = self.layer(&overrides.cli)?;

        let resolved = self.schema.resolve(
            self.name(),
            settings,
            &[&manifest_layer, &config_layer, &cli_layer],
        )?;

        tracing::debug!("resolved options for {}: {:?}", self.name(), resolved);
        Ok(resolved)
    }

    fn layer(&self, assignments: &[(String, String)]) -> Result<OptionLayer, RecipeError> {
        self.schema.parse_layer(
            self.name(),
            assignments.iter().map(|(n, v)| (n.as_str(), v.as_str())),
        )
    }

    /// Options pushed down into dependent sub-packages.
    ///
    /// Values come from `resolved`, so platform defaults are already fixed.
    pub fn propagations(&self, resolved: &ResolvedOptions) -> Result<Vec<Propagation>, RecipeError> {
        if !self.base().inherits(BaseRecipe::Recognizer) {
            return Ok(Vec::new());
        }

        let mut options = BTreeMap::new();
        for name in PROPAGATED {
            options.insert(name.to_string(), resolved.get(name)?.clone());
        }

        Ok(self
            .manifest
            .propagate
            .packages
            .iter()
            .map(|package| Propagation {
                package: package.clone(),
                options: options.clone(),
            })
            .collect())
    }
}
