//! Recipe options - schema, layers and resolution.
//!
//! Option values are merged in layers, later layers winning:
//!
//! 1. schema defaults (base recipe chain, then manifest declarations)
//! 2. platform-dependent defaults, evaluated once against the settings
//! 3. manifest `[default-options]`
//! 4. configuration file `[options]`
//! 5. command-line `-o name=value`
//!
//! The result is a flat, immutable [`ResolvedOptions`] map in which every
//! option has exactly one concrete value.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::errors::RecipeError;
use crate::core::settings::{Os, Settings};

/// A concrete option value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OptionValue {
    Bool(bool),
    Choice(String),
}

impl OptionValue {
    /// The boolean value, if this is a boolean option.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            OptionValue::Bool(b) => Some(*b),
            OptionValue::Choice(_) => None,
        }
    }

    /// The choice string, if this is an enumerated option.
    pub fn as_choice(&self) -> Option<&str> {
        match self {
            OptionValue::Choice(s) => Some(s),
            OptionValue::Bool(_) => None,
        }
    }

    /// CMake spelling: `ON`/`OFF` for booleans, the choice verbatim otherwise.
    pub fn to_cmake(&self) -> String {
        match self {
            OptionValue::Bool(true) => "ON".to_string(),
            OptionValue::Bool(false) => "OFF".to_string(),
            OptionValue::Choice(s) => s.clone(),
        }
    }
}

impl fmt::Display for OptionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionValue::Bool(true) => f.write_str("True"),
            OptionValue::Bool(false) => f.write_str("False"),
            OptionValue::Choice(s) => f.write_str(s),
        }
    }
}

impl From<bool> for OptionValue {
    fn from(b: bool) -> Self {
        OptionValue::Bool(b)
    }
}

impl From<&str> for OptionValue {
    fn from(s: &str) -> Self {
        OptionValue::Choice(s.to_string())
    }
}

/// The set of values an option accepts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptionDomain {
    Bool,
    Choices(Vec<String>),
}

impl OptionDomain {
    /// Enumerated domain from string literals.
    pub fn choices(items: &[&str]) -> Self {
        OptionDomain::Choices(items.iter().map(|s| s.to_string()).collect())
    }

    fn expected(&self) -> String {
        match self {
            OptionDomain::Bool => "True, False".to_string(),
            OptionDomain::Choices(items) => items.join(", "),
        }
    }

    /// Parse a textual value into this domain.
    pub fn parse(&self, name: &str, raw: &str) -> Result<OptionValue, RecipeError> {
        let value = match self {
            OptionDomain::Bool => match raw {
                "True" | "true" => Some(OptionValue::Bool(true)),
                "False" | "false" => Some(OptionValue::Bool(false)),
                _ => None,
            },
            OptionDomain::Choices(items) => items
                .iter()
                .find(|c| c.as_str() == raw)
                .map(|c| OptionValue::Choice(c.clone())),
        };

        value.ok_or_else(|| RecipeError::InvalidOptionValue {
            name: name.to_string(),
            value: raw.to_string(),
            expected: self.expected(),
        })
    }

    /// Check an already typed value against this domain.
    pub fn check(&self, name: &str, value: &OptionValue) -> Result<(), RecipeError> {
        let ok = match (self, value) {
            (OptionDomain::Bool, OptionValue::Bool(_)) => true,
            (OptionDomain::Choices(items), OptionValue::Choice(c)) => items.contains(c),
            _ => false,
        };
        if ok {
            Ok(())
        } else {
            Err(RecipeError::InvalidOptionValue {
                name: name.to_string(),
                value: value.to_string(),
                expected: self.expected(),
            })
        }
    }
}

/// A default that depends on the target platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlatformRule {
    /// `true` when building for `os`, `false` everywhere else.
    EnabledOn(Os),
}

impl PlatformRule {
    fn evaluate(&self, settings: &Settings) -> OptionValue {
        match self {
            PlatformRule::EnabledOn(os) => OptionValue::Bool(settings.os == *os),
        }
    }
}

/// Where an option's value comes from when no layer sets it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptionDefault {
    Value(OptionValue),
    PlatformDependent(PlatformRule),
    None,
}

/// Declaration of one option.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionDef {
    pub name: String,
    pub domain: OptionDomain,
    pub default: OptionDefault,
    /// CMake variable receiving the value verbatim, for manifest-declared options.
    pub cmake_var: Option<String>,
}

impl OptionDef {
    pub fn choice(name: &str, choices: &[&str], default: &str) -> Self {
        OptionDef {
            name: name.to_string(),
            domain: OptionDomain::choices(choices),
            default: OptionDefault::Value(OptionValue::from(default)),
            cmake_var: None,
        }
    }

    pub fn boolean(name: &str, default: bool) -> Self {
        OptionDef {
            name: name.to_string(),
            domain: OptionDomain::Bool,
            default: OptionDefault::Value(OptionValue::Bool(default)),
            cmake_var: None,
        }
    }

    pub fn platform_bool(name: &str, rule: PlatformRule) -> Self {
        OptionDef {
            name: name.to_string(),
            domain: OptionDomain::Bool,
            default: OptionDefault::PlatformDependent(rule),
            cmake_var: None,
        }
    }
}

/// A set of option declarations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OptionSchema {
    defs: BTreeMap<String, OptionDef>,
}

impl OptionSchema {
    pub fn new() -> Self {
        OptionSchema::default()
    }

    /// Add or replace a declaration.
    pub fn declare(&mut self, def: OptionDef) -> &mut Self {
        self.defs.insert(def.name.clone(), def);
        self
    }

    /// Extend with a child schema; child declarations replace inherited ones.
    pub fn extend(&mut self, child: &OptionSchema) -> &mut Self {
        for def in child.defs.values() {
            self.declare(def.clone());
        }
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.defs.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&OptionDef> {
        self.defs.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &OptionDef> {
        self.defs.values()
    }

    /// Parse raw `name -> text` overrides into a typed layer.
    pub fn parse_layer<'a>(
        &self,
        recipe: &str,
        raw: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> Result<OptionLayer, RecipeError> {
        let mut layer = OptionLayer::new();
        for (name, text) in raw {
            let def = self.lookup(recipe, name)?;
            layer.set(name, def.domain.parse(name, text)?);
        }
        Ok(layer)
    }

    fn lookup(&self, recipe: &str, name: &str) -> Result<&OptionDef, RecipeError> {
        self.defs.get(name).ok_or_else(|| RecipeError::UnknownOption {
            recipe: recipe.to_string(),
            name: name.to_string(),
            known: self.defs.keys().cloned().collect::<Vec<_>>().join(", "),
        })
    }

    /// Resolve every declared option against the settings and override layers.
    ///
    /// Platform-dependent defaults are evaluated here and nowhere else.
    pub fn resolve(
        &self,
        recipe: &str,
        settings: &Settings,
        layers: &[&OptionLayer],
    ) -> Result<ResolvedOptions, RecipeError> {
        let mut base = OptionLayer::new();
        for def in self.defs.values() {
            match &def.default {
                OptionDefault::Value(v) => base.set(&def.name, v.clone()),
                OptionDefault::PlatformDependent(rule) => {
                    base.set(&def.name, rule.evaluate(settings))
                }
                OptionDefault::None => {}
            }
        }

        let mut merged = base;
        for layer in layers {
            for (name, value) in layer.iter() {
                let def = self.lookup(recipe, name)?;
                def.domain.check(name, value)?;
            }
            merged = merged.merge(layer);
        }

        let missing: Vec<String> = self
            .defs
            .keys()
            .filter(|name| merged.get(name).is_none())
            .cloned()
            .collect();
        if !missing.is_empty() {
            return Err(RecipeError::UnresolvedOption { names: missing });
        }

        Ok(ResolvedOptions {
            values: merged.values,
        })
    }
}

/// One layer of option values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OptionLayer {
    values: BTreeMap<String, OptionValue>,
}

impl OptionLayer {
    pub fn new() -> Self {
        OptionLayer::default()
    }

    pub fn set(&mut self, name: &str, value: OptionValue) {
        self.values.insert(name.to_string(), value);
    }

    pub fn get(&self, name: &str) -> Option<&OptionValue> {
        self.values.get(name)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &OptionValue)> {
        self.values.iter()
    }

    /// `self` overridden by `other`.
    pub fn merge(&self, other: &OptionLayer) -> OptionLayer {
        let mut values = self.values.clone();
        for (name, value) in &other.values {
            values.insert(name.clone(), value.clone());
        }
        OptionLayer { values }
    }
}

impl<const N: usize> From<[(&str, OptionValue); N]> for OptionLayer {
    fn from(items: [(&str, OptionValue); N]) -> Self {
        let mut layer = OptionLayer::new();
        for (name, value) in items {
            layer.set(name, value);
        }
        layer
    }
}

/// Fully resolved option values for one build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ResolvedOptions {
    values: BTreeMap<String, OptionValue>,
}

impl ResolvedOptions {
    /// Look up an option. Asking for an option outside the schema is an error.
    pub fn get(&self, name: &str) -> Result<&OptionValue, RecipeError> {
        self.values
            .get(name)
            .ok_or_else(|| RecipeError::UnresolvedOption {
                names: vec![name.to_string()],
            })
    }

    pub fn get_bool(&self, name: &str) -> Result<bool, RecipeError> {
        let value = self.get(name)?;
        value.as_bool().ok_or_else(|| RecipeError::InvalidOptionValue {
            name: name.to_string(),
            value: value.to_string(),
            expected: "True, False".to_string(),
        })
    }

    pub fn get_choice(&self, name: &str) -> Result<&str, RecipeError> {
        let value = self.get(name)?;
        value.as_choice().ok_or_else(|| RecipeError::InvalidOptionValue {
            name: name.to_string(),
            value: value.to_string(),
            expected: "an enumerated value".to_string(),
        })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &OptionValue)> {
        self.values.iter()
    }

    /// Copy without the named options, for identity computation.
    pub fn without(&self, names: &[&str]) -> BTreeMap<String, OptionValue> {
        self.values
            .iter()
            .filter(|(name, _)| !names.contains(&name.as_str()))
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect()
    }
}
