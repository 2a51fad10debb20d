//! CMake flag generation.
//!
//! A pure function from (recipe, resolved options, settings) to an ordered
//! list of CMake cache variables. The mapping tables live in
//! [`LOG_LEVEL_FLAGS`] and [`variant_flags`].

use std::fmt;

use serde::Serialize;

use crate::core::errors::RecipeError;
use crate::core::manifest::BaseRecipe;
use crate::core::options::ResolvedOptions;
use crate::core::recipe::{
    Recipe, BINARY_SERIALIZATION, ENABLE_TESTING, ENABLE_TIMER, LOG_LEVEL, RESULT_JSONIZATION,
};
use crate::core::settings::{BuildType, Settings};

/// `log_level` choice -> `MB_GLOBAL_LOG_LEVEL` value.
pub const LOG_LEVEL_FLAGS: &[(&str, &str)] = &[
    ("Verbose", "LOG_VERBOSE"),
    ("Debug", "LOG_DEBUG"),
    ("Info", "LOG_INFO"),
    ("WarningsAndErrors", "LOG_WARNINGS_AND_ERRORS"),
];

/// One `-D<name>=<value>` cache variable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CMakeVar {
    pub name: String,
    pub value: String,
}

impl CMakeVar {
    /// The `-D` command-line form.
    pub fn to_arg(&self) -> String {
        format!("-D{}={}", self.name, self.value)
    }
}

impl fmt::Display for CMakeVar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_arg())
    }
}

/// Ordered CMake variables. Re-setting a name replaces the value in place.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FlagList {
    vars: Vec<CMakeVar>,
}

impl FlagList {
    pub fn new() -> Self {
        FlagList::default()
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        let name = name.into();
        let value = value.into();
        match self.vars.iter_mut().find(|v| v.name == name) {
            Some(existing) => existing.value = value,
            None => self.vars.push(CMakeVar { name, value }),
        }
        self
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars
            .iter()
            .find(|v| v.name == name)
            .map(|v| v.value.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CMakeVar> {
        self.vars.iter()
    }

    /// `-D` arguments in order.
    pub fn to_args(&self) -> Vec<String> {
        self.vars.iter().map(CMakeVar::to_arg).collect()
    }
}

impl<'a> Extend<(&'a str, &'a str)> for FlagList {
    fn extend<T: IntoIterator<Item = (&'a str, &'a str)>>(&mut self, iter: T) {
        for (name, value) in iter {
            self.set(name, value);
        }
    }
}

/// Build-variant variables.
///
/// Everything is compiled as Release; `Debug` and `DevRelease` add the dev
/// marker, and `Debug` adds runtime checks except on mobile, where they need
/// a rooted device (Android) or an Xcode checkbox CMake cannot set (iOS).
pub fn variant_flags(settings: &Settings) -> Vec<(&'static str, &'static str)> {
    let mut flags = vec![("CMAKE_BUILD_TYPE", "Release")];
    match settings.build_type {
        BuildType::Release => {}
        BuildType::DevRelease => flags.push(("MB_DEV_RELEASE", "ON")),
        BuildType::Debug => {
            flags.push(("MB_DEV_RELEASE", "ON"));
            if !settings.os.is_mobile() {
                flags.push(("MB_ENABLE_RUNTIME_CHECKS", "ON"));
            }
        }
    }
    flags
}

/// Generate the full flag list for one build.
pub fn generate(
    recipe: &Recipe,
    options: &ResolvedOptions,
    settings: &Settings,
) -> Result<FlagList, RecipeError> {
    let mut flags = FlagList::new();

    if recipe.base().inherits(BaseRecipe::Recognizer) {
        flags.set(
            "Recognizer_RESULT_JSONIZATION",
            options.get_choice(RESULT_JSONIZATION)?,
        );
        flags.set(
            "Recognizer_BINARY_SERIALIZATION",
            options.get(BINARY_SERIALIZATION)?.to_cmake(),
        );
        flags.set("MB_ENABLE_TESTING", options.get(ENABLE_TESTING)?.to_cmake());
    }

    for def in recipe.schema().iter() {
        if let Some(var) = &def.cmake_var {
            flags.set(var.clone(), options.get(&def.name)?.to_cmake());
        }
    }

    flags.set("MB_PACKAGE_NAME", recipe.name());
    flags.extend(variant_flags(settings));
    add_base_flags(&mut flags, recipe, options)?;

    // keeps packages building with newer compilers
    flags.set("MB_TREAT_WARNINGS_AS_ERRORS", "OFF");

    Ok(flags)
}

fn add_base_flags(
    flags: &mut FlagList,
    recipe: &Recipe,
    options: &ResolvedOptions,
) -> Result<(), RecipeError> {
    let schema = recipe.schema();

    if schema.contains(LOG_LEVEL) {
        let level = options.get_choice(LOG_LEVEL)?;
        let value = LOG_LEVEL_FLAGS
            .iter()
            .find(|(choice, _)| *choice == level)
            .map(|(_, flag)| *flag)
            .ok_or_else(|| RecipeError::InvalidOptionValue {
                name: LOG_LEVEL.to_string(),
                value: level.to_string(),
                expected: LOG_LEVEL_FLAGS
                    .iter()
                    .map(|(c, _)| *c)
                    .collect::<Vec<_>>()
                    .join(", "),
            })?;
        flags.set("MB_GLOBAL_LOG_LEVEL", value);
    }

    if schema.contains(ENABLE_TIMER) && options.get_bool(ENABLE_TIMER)? {
        flags.set("MB_GLOBAL_ENABLE_TIMER", "ON");
    }

    if schema.contains(ENABLE_TESTING) {
        flags.set("MB_ENABLE_TESTING", options.get(ENABLE_TESTING)?.to_cmake());
    }

    Ok(())
}
