//! Build settings - the platform tuple a package is built for.
//!
//! Settings are read-only for the whole build. Every platform decision in
//! the crate matches on these enums rather than comparing strings.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::core::errors::RecipeError;

macro_rules! string_enum {
    (
        $(#[$meta:meta])*
        $name:ident, $setting:literal { $($variant:ident => $text:literal),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub enum $name {
            $(
                #[serde(rename = $text)]
                $variant,
            )+
        }

        impl $name {
            /// All accepted spellings, in declaration order.
            pub const ALL: &'static [&'static str] = &[$($text),+];

            /// The canonical spelling.
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = RecipeError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    _ => Err(RecipeError::InvalidSetting {
                        setting: $setting.to_string(),
                        value: s.to_string(),
                        expected: Self::ALL.join(", "),
                    }),
                }
            }
        }
    };
}

string_enum! {
    /// Target operating system.
    Os, "os" {
        Linux => "Linux",
        Macos => "Macos",
        Windows => "Windows",
        Android => "Android",
        Ios => "iOS",
    }
}

string_enum! {
    /// Apple SDK variant for iOS builds.
    AppleSdk, "os.sdk" {
        Device => "device",
        Simulator => "simulator",
        MacCatalyst => "maccatalyst",
    }
}

string_enum! {
    /// Macos subsystem.
    Subsystem, "os.subsystem" {
        Catalyst => "catalyst",
    }
}

string_enum! {
    /// Compiler family.
    Compiler, "compiler" {
        Gcc => "gcc",
        Clang => "clang",
        AppleClang => "apple-clang",
        Msvc => "msvc",
    }
}

string_enum! {
    /// Requested build variant.
    BuildType, "build_type" {
        Debug => "Debug",
        Release => "Release",
        DevRelease => "DevRelease",
    }
}

string_enum! {
    /// CPU architecture. `ios_fat` is the canonical value for universal binaries.
    Arch, "arch" {
        X86 => "x86",
        X86_64 => "x86_64",
        Armv7 => "armv7",
        Armv8 => "armv8",
        IosFat => "ios_fat",
    }
}

impl Os {
    /// Mobile platforms, where runtime checks cannot be enabled from CMake.
    pub fn is_mobile(&self) -> bool {
        matches!(self, Os::Android | Os::Ios)
    }

    /// Platforms whose toolchains are Apple's.
    pub fn is_apple(&self) -> bool {
        matches!(self, Os::Macos | Os::Ios)
    }
}

impl Arch {
    /// Android NDK ABI name.
    pub fn android_abi(&self) -> Option<&'static str> {
        match self {
            Arch::X86 => Some("x86"),
            Arch::X86_64 => Some("x86_64"),
            Arch::Armv7 => Some("armeabi-v7a"),
            Arch::Armv8 => Some("arm64-v8a"),
            Arch::IosFat => None,
        }
    }

    /// Apple architecture name. A fat build leaves the choice to Xcode.
    pub fn apple_arch(&self) -> Option<&'static str> {
        match self {
            Arch::X86 => Some("i386"),
            Arch::X86_64 => Some("x86_64"),
            Arch::Armv7 => Some("armv7"),
            Arch::Armv8 => Some("arm64"),
            Arch::IosFat => None,
        }
    }

    /// `CMAKE_SYSTEM_PROCESSOR` value.
    pub fn processor(&self) -> Option<&'static str> {
        match self {
            Arch::X86 => Some("i686"),
            Arch::X86_64 => Some("x86_64"),
            Arch::Armv7 => Some("armv7"),
            Arch::Armv8 => Some("aarch64"),
            Arch::IosFat => None,
        }
    }
}

impl AppleSdk {
    /// The xcodebuild SDK name.
    pub fn sdk_name(&self) -> &'static str {
        match self {
            AppleSdk::Device => "iphoneos",
            AppleSdk::Simulator => "iphonesimulator",
            AppleSdk::MacCatalyst => "maccatalyst",
        }
    }
}

/// The platform tuple for one build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    pub os: Os,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub os_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_level: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sdk: Option<AppleSdk>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subsystem: Option<Subsystem>,
    pub compiler: Compiler,
    pub build_type: BuildType,
    pub arch: Arch,
}

impl Settings {
    /// Settings for `host` with its default compiler and a release build.
    pub fn for_host(host: &HostPlatform) -> Self {
        let compiler = match host.os {
            Os::Windows => Compiler::Msvc,
            Os::Macos | Os::Ios => Compiler::AppleClang,
            Os::Linux | Os::Android => Compiler::Gcc,
        };

        Settings {
            os: host.os,
            os_version: None,
            api_level: None,
            sdk: None,
            subsystem: None,
            compiler,
            build_type: BuildType::Release,
            arch: host.arch,
        }
    }

    /// Apply `key=value` assignments on top of these settings.
    ///
    /// Keys use dotted sub-setting names: `os.sdk`, `os.version`,
    /// `os.api_level`, `os.subsystem`.
    pub fn with_assignments<'a>(
        mut self,
        assignments: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> Result<Self, RecipeError> {
        for (key, value) in assignments {
            match key {
                "os" => self.os = value.parse()?,
                "os.version" => self.os_version = Some(value.to_string()),
                "os.api_level" | "api_level" => {
                    let level = value.parse().map_err(|_| RecipeError::InvalidSetting {
                        setting: "os.api_level".to_string(),
                        value: value.to_string(),
                        expected: "an integer API level".to_string(),
                    })?;
                    self.api_level = Some(level);
                }
                "os.sdk" | "sdk" => self.sdk = Some(value.parse()?),
                "os.subsystem" | "subsystem" => self.subsystem = Some(value.parse()?),
                "compiler" => self.compiler = value.parse()?,
                "build_type" => self.build_type = value.parse()?,
                "arch" => self.arch = value.parse()?,
                other => {
                    return Err(RecipeError::InvalidSetting {
                        setting: other.to_string(),
                        value: value.to_string(),
                        expected: "os, os.version, os.api_level, os.sdk, os.subsystem, \
                                   compiler, build_type, arch"
                            .to_string(),
                    })
                }
            }
        }
        Ok(self)
    }

    /// Reject sub-settings that do not belong to the chosen os.
    pub fn validate(&self) -> Result<(), RecipeError> {
        if self.sdk.is_some() && self.os != Os::Ios {
            return Err(RecipeError::InconsistentSettings {
                message: format!("os.sdk is only valid for iOS, not {}", self.os),
            });
        }
        if self.subsystem.is_some() && self.os != Os::Macos {
            return Err(RecipeError::InconsistentSettings {
                message: format!("os.subsystem is only valid for Macos, not {}", self.os),
            });
        }
        if self.api_level.is_some() && self.os != Os::Android {
            return Err(RecipeError::InconsistentSettings {
                message: format!("os.api_level is only valid for Android, not {}", self.os),
            });
        }
        if self.arch == Arch::IosFat && self.os != Os::Ios {
            return Err(RecipeError::InconsistentSettings {
                message: format!("arch ios_fat is only valid for iOS, not {}", self.os),
            });
        }
        if self.compiler == Compiler::Msvc && self.os != Os::Windows {
            return Err(RecipeError::InconsistentSettings {
                message: format!("msvc cannot target {}", self.os),
            });
        }
        Ok(())
    }

    /// Whether the build targets a different os or arch than the host.
    pub fn is_cross_building(&self, host: &HostPlatform) -> bool {
        self.os != host.os || self.arch != host.arch
    }

    /// Whether the build produces Mac Catalyst binaries.
    pub fn is_catalyst(&self) -> bool {
        self.sdk == Some(AppleSdk::MacCatalyst) || self.subsystem == Some(Subsystem::Catalyst)
    }

    /// Flattened `name=value` view, sorted by name.
    pub fn to_map(&self) -> BTreeMap<&'static str, String> {
        let mut map = BTreeMap::new();
        map.insert("arch", self.arch.to_string());
        map.insert("build_type", self.build_type.to_string());
        map.insert("compiler", self.compiler.to_string());
        map.insert("os", self.os.to_string());
        if let Some(version) = &self.os_version {
            map.insert("os.version", version.clone());
        }
        if let Some(level) = self.api_level {
            map.insert("os.api_level", level.to_string());
        }
        if let Some(sdk) = self.sdk {
            map.insert("os.sdk", sdk.to_string());
        }
        if let Some(subsystem) = self.subsystem {
            map.insert("os.subsystem", subsystem.to_string());
        }
        map
    }
}

impl fmt::Display for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {}",
            self.os, self.arch, self.compiler, self.build_type
        )?;
        if let Some(sdk) = self.sdk {
            write!(f, " ({})", sdk)?;
        }
        Ok(())
    }
}

/// The machine running recipekit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostPlatform {
    pub os: Os,
    pub arch: Arch,
}

impl HostPlatform {
    /// Detect the host from the compile-time target of this binary.
    pub fn detect() -> Self {
        let os = match std::env::consts::OS {
            "windows" => Os::Windows,
            "macos" => Os::Macos,
            "android" => Os::Android,
            "ios" => Os::Ios,
            _ => Os::Linux,
        };
        let arch = match std::env::consts::ARCH {
            "x86" => Arch::X86,
            "aarch64" => Arch::Armv8,
            "arm" => Arch::Armv7,
            _ => Arch::X86_64,
        };
        HostPlatform { os, arch }
    }
}

/// Split a `key=value` assignment.
pub fn split_assignment(s: &str) -> Option<(&str, &str)> {
    let (key, value) = s.split_once('=')?;
    let key = key.trim();
    if key.is_empty() {
        return None;
    }
    Some((key, value.trim()))
}
