//! Package identity - the reduced signature used to deduplicate built packages.
//!
//! Two builds share a cached package when their identity keys match. The
//! reduction is deliberate:
//! - `enable_testing` never reaches the key (tests are not shipped)
//! - iOS packages contain fat libraries, so the arch collapses to `ios_fat`
//! - most dependencies only contribute their major version; a fixed set of
//!   header-only / ABI-sensitive libraries contribute the exact version
//!
//! The build identity is a second, looser key that decides which builds can
//! share one build folder.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use anyhow::{Context, Result};
use semver::Version;
use serde::Serialize;

use crate::core::manifest::parse_lenient_version;
use crate::core::options::ResolvedOptions;
use crate::core::recipe::ENABLE_TESTING;
use crate::core::settings::{AppleSdk, Arch, Os, Settings};
use crate::util::hash::Fingerprint;

/// Dependencies matched by exact version rather than semver compatibility.
pub const EXACT_VERSION_DEPENDENCIES: &[&str] =
    &["Boost", "Eigen", "range-v3", "RapidJSON", "UTFCpp", "Variant"];

/// iOS deployment target recorded in the build identity.
const IOS_BUILD_OS_VERSION: &str = "8.0";

/// Android API level recorded in the build identity.
const ANDROID_BUILD_API_LEVEL: u32 = 16;

/// How a dependency's version enters the identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionMode {
    /// `name/MAJOR.Y.Z`, or the full version below 1.0.
    Semver,
    /// `name/MAJOR.MINOR.PATCH`.
    Exact,
}

/// A resolved dependency.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyRef {
    pub name: String,
    pub version: Version,
}

impl DependencyRef {
    pub fn new(name: impl Into<String>, version: Version) -> Self {
        DependencyRef {
            name: name.into(),
            version,
        }
    }

    /// Parse `name` + a possibly short version string.
    pub fn parse(name: &str, version: &str) -> Result<Self> {
        let version = parse_lenient_version(version)
            .with_context(|| format!("invalid version for dependency `{}`", name))?;
        Ok(DependencyRef::new(name, version))
    }

    /// The identity line for this dependency.
    pub fn identity_text(&self, mode: VersionMode) -> String {
        match mode {
            VersionMode::Exact => format!("{}/{}", self.name, self.version),
            VersionMode::Semver if self.version.major == 0 => {
                format!("{}/{}", self.name, self.version)
            }
            VersionMode::Semver => format!("{}/{}.Y.Z", self.name, self.version.major),
        }
    }
}

/// The exact-version dependency set, defaults plus additions.
pub fn exact_dependency_set<'a>(extra: impl IntoIterator<Item = &'a String>) -> BTreeSet<String> {
    EXACT_VERSION_DEPENDENCIES
        .iter()
        .map(|s| s.to_string())
        .chain(extra.into_iter().cloned())
        .collect()
}

/// A reduced (package, settings, options, requires) view with a stable hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackageIdentity {
    /// `name/version` of the recipe itself
    pub reference: String,
    pub settings: BTreeMap<String, String>,
    pub options: BTreeMap<String, String>,
    pub requires: BTreeSet<String>,
}

impl PackageIdentity {
    /// Identity of the shipped package.
    pub fn package(
        reference: &str,
        options: &ResolvedOptions,
        settings: &Settings,
        dependencies: &[DependencyRef],
        exact: &BTreeSet<String>,
    ) -> Self {
        let mut settings_map = settings_view(settings);
        if settings.os == Os::Ios {
            settings_map.insert("arch".to_string(), Arch::IosFat.to_string());
        }

        let options = options
            .without(&[ENABLE_TESTING])
            .into_iter()
            .map(|(name, value)| (name, value.to_string()))
            .collect();

        let requires = dependencies
            .iter()
            .map(|dep| {
                let mode = if exact.contains(&dep.name) {
                    VersionMode::Exact
                } else {
                    VersionMode::Semver
                };
                dep.identity_text(mode)
            })
            .collect();

        PackageIdentity {
            reference: reference.to_string(),
            settings: settings_map,
            options,
            requires,
        }
    }

    /// Identity of the build folder.
    ///
    /// Fat iOS builds and all Android API levels share one build.
    pub fn build(
        reference: &str,
        options: &ResolvedOptions,
        settings: &Settings,
        dependencies: &[DependencyRef],
    ) -> Self {
        let mut settings_map = settings_view(settings);
        match settings.os {
            Os::Ios => {
                settings_map.insert("arch".to_string(), Arch::IosFat.to_string());
                settings_map.insert("os.version".to_string(), IOS_BUILD_OS_VERSION.to_string());
            }
            Os::Android => {
                settings_map.insert("os.api_level".to_string(), ANDROID_BUILD_API_LEVEL.to_string());
            }
            Os::Linux | Os::Macos | Os::Windows => {}
        }

        PackageIdentity {
            reference: reference.to_string(),
            settings: settings_map,
            options: options
                .iter()
                .map(|(name, value)| (name.clone(), value.to_string()))
                .collect(),
            requires: dependencies
                .iter()
                .map(|dep| dep.identity_text(VersionMode::Exact))
                .collect(),
        }
    }

    /// Canonical text: `[package]`, then `[settings]`, `[options]` and
    /// `[requires]`, each sorted.
    pub fn canonical_text(&self) -> String {
        let mut out = format!("[package]\n{}\n[settings]\n", self.reference);
        for (name, value) in &self.settings {
            out.push_str(&format!("{}={}\n", name, value));
        }
        out.push_str("[options]\n");
        for (name, value) in &self.options {
            out.push_str(&format!("{}={}\n", name, value));
        }
        out.push_str("[requires]\n");
        for line in &self.requires {
            out.push_str(line);
            out.push('\n');
        }
        out
    }

    /// Hex SHA-256 of the canonical text.
    pub fn key(&self) -> String {
        let mut fp = Fingerprint::new();
        fp.update_lines(self.canonical_text().lines());
        fp.finish()
    }

    /// First 16 hex characters of the key, for directory names.
    pub fn short_key(&self) -> String {
        let mut fp = Fingerprint::new();
        fp.update_lines(self.canonical_text().lines());
        fp.finish_short()
    }
}

impl fmt::Display for PackageIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key())
    }
}

fn settings_view(settings: &Settings) -> BTreeMap<String, String> {
    settings
        .to_map()
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
}

/// Architectures whose packages are interchangeable with this build.
///
/// Macos and the iOS simulator ship universal binaries covering both Apple
/// Silicon and Intel, so either arch can consume the other's package.
pub fn compatible_archs(settings: &Settings) -> Vec<Arch> {
    let universal = settings.os == Os::Macos
        || (settings.os == Os::Ios && settings.sdk == Some(AppleSdk::Simulator));
    if universal {
        vec![Arch::Armv8, Arch::X86_64]
    } else {
        vec![settings.arch]
    }
}
