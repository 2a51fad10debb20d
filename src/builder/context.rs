//! Build context - directories, settings and driver configuration.
//!
//! Everything the build driver needs is carried here explicitly. The
//! process environment is read in exactly one place,
//! [`cmake_env_overrides`], and only when the context is created.

use std::path::PathBuf;

use crate::builder::flags::FlagList;
use crate::core::settings::{HostPlatform, Os, Settings};

/// Prefix of environment variables forwarded as CMake cache variables.
pub const CMAKE_ENV_PREFIX: &str = "RECIPEKIT_CMAKE_";

/// Build context for one recipe build.
#[derive(Debug, Clone)]
pub struct BuildContext {
    /// Target settings
    pub settings: Settings,

    /// Machine running the build
    pub host: HostPlatform,

    /// Recipe source tree (contains CMakeLists.txt)
    pub source_dir: PathBuf,

    /// CMake binary directory
    pub build_dir: PathBuf,

    /// Package output directory, also the install prefix
    pub package_dir: PathBuf,

    /// CMake generator, if not the platform default
    pub generator: Option<String>,

    /// Toolchain file passed to configure
    pub toolchain_file: Option<PathBuf>,

    /// Parallel build jobs
    pub jobs: Option<usize>,

    /// Extra variables from configuration files
    pub extra_vars: FlagList,

    /// Variables taken from `RECIPEKIT_CMAKE_*` environment variables
    pub env_vars: FlagList,
}

impl BuildContext {
    /// Create a context with no generator, toolchain or extra variables.
    pub fn new(settings: Settings, source_dir: PathBuf, build_dir: PathBuf, package_dir: PathBuf) -> Self {
        BuildContext {
            settings,
            host: HostPlatform::detect(),
            source_dir,
            build_dir,
            package_dir,
            generator: None,
            toolchain_file: None,
            jobs: None,
            extra_vars: FlagList::new(),
            env_vars: FlagList::new(),
        }
    }

    pub fn with_host(mut self, host: HostPlatform) -> Self {
        self.host = host;
        self
    }

    pub fn with_generator(mut self, generator: Option<String>) -> Self {
        self.generator = generator;
        self
    }

    pub fn with_toolchain_file(mut self, toolchain_file: Option<PathBuf>) -> Self {
        self.toolchain_file = toolchain_file;
        self
    }

    pub fn with_jobs(mut self, jobs: Option<usize>) -> Self {
        self.jobs = jobs;
        self
    }

    pub fn with_extra_vars(mut self, vars: FlagList) -> Self {
        self.extra_vars = vars;
        self
    }

    pub fn with_env_vars(mut self, vars: FlagList) -> Self {
        self.env_vars = vars;
        self
    }

    /// The generator to configure with.
    ///
    /// Apple device builds need the Xcode generator for `-sdk` switching.
    pub fn effective_generator(&self) -> Option<String> {
        if let Some(generator) = &self.generator {
            return Some(generator.clone());
        }
        if self.settings.os == Os::Ios || self.settings.is_catalyst() {
            return Some("Xcode".to_string());
        }
        None
    }

    /// Whether the target differs from the host.
    pub fn is_cross_building(&self) -> bool {
        self.settings.is_cross_building(&self.host)
    }

    /// CMake variables naming the target platform.
    ///
    /// Android and iOS always name their system. Other targets only do so
    /// when cross building; a native build gets at most a deployment target.
    pub fn platform_vars(&self) -> FlagList {
        let settings = &self.settings;
        let cross = self.is_cross_building();
        let mut vars = FlagList::new();

        match settings.os {
            Os::Android => {
                vars.set("CMAKE_SYSTEM_NAME", "Android");
                if let Some(abi) = settings.arch.android_abi() {
                    vars.set("CMAKE_ANDROID_ARCH_ABI", abi);
                }
                if let Some(level) = settings.api_level {
                    vars.set("CMAKE_SYSTEM_VERSION", level.to_string());
                }
            }
            Os::Ios => {
                vars.set("CMAKE_SYSTEM_NAME", "iOS");
                if let Some(arch) = settings.arch.apple_arch() {
                    vars.set("CMAKE_OSX_ARCHITECTURES", arch);
                }
            }
            Os::Macos => {
                if cross && self.host.os != Os::Macos {
                    vars.set("CMAKE_SYSTEM_NAME", "Darwin");
                }
                if cross {
                    if let Some(arch) = settings.arch.apple_arch() {
                        vars.set("CMAKE_OSX_ARCHITECTURES", arch);
                    }
                }
            }
            Os::Linux | Os::Windows => {
                if cross {
                    vars.set("CMAKE_SYSTEM_NAME", settings.os.as_str());
                    if let Some(processor) = settings.arch.processor() {
                        vars.set("CMAKE_SYSTEM_PROCESSOR", processor);
                    }
                }
            }
        }

        if settings.os.is_apple() {
            if let Some(version) = &settings.os_version {
                vars.set("CMAKE_OSX_DEPLOYMENT_TARGET", version.clone());
            }
        }
        vars
    }
}

/// Collect `RECIPEKIT_CMAKE_<VAR>=<value>` from the process environment.
pub fn cmake_env_overrides() -> FlagList {
    env_overrides_from(std::env::vars())
}

/// Collect overrides from explicit `(key, value)` pairs, sorted by name.
pub fn env_overrides_from(vars: impl IntoIterator<Item = (String, String)>) -> FlagList {
    let mut pairs: Vec<(String, String)> = vars
        .into_iter()
        .filter_map(|(key, value)| {
            key.strip_prefix(CMAKE_ENV_PREFIX)
                .filter(|name| !name.is_empty())
                .map(|name| (name.to_string(), value))
        })
        .collect();
    pairs.sort();

    let mut flags = FlagList::new();
    for (name, value) in pairs {
        flags.set(name, value);
    }
    flags
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::settings::{AppleSdk, Arch, BuildType, Compiler, Os, Subsystem};

    fn settings(os: Os) -> Settings {
        Settings {
            os,
            os_version: None,
            api_level: None,
            sdk: None,
            subsystem: None,
            compiler: Compiler::AppleClang,
            build_type: BuildType::Release,
            arch: Arch::Armv8,
        }
    }

    #[test]
    fn test_env_overrides_are_filtered_and_sorted() {
        let vars = vec![
            ("PATH".to_string(), "/usr/bin".to_string()),
            ("RECIPEKIT_CMAKE_ZZZ".to_string(), "1".to_string()),
            ("RECIPEKIT_CMAKE_ANDROID_STL".to_string(), "c++_static".to_string()),
            ("RECIPEKIT_CMAKE_".to_string(), "ignored".to_string()),
        ];
        let flags = env_overrides_from(vars);
        assert_eq!(
            flags.to_args(),
            vec!["-DANDROID_STL=c++_static", "-DZZZ=1"]
        );
    }

    fn linux_host() -> HostPlatform {
        HostPlatform {
            os: Os::Linux,
            arch: Arch::X86_64,
        }
    }

    fn context(settings: Settings) -> BuildContext {
        BuildContext::new(
            settings,
            PathBuf::from("src"),
            PathBuf::from("build"),
            PathBuf::from("pkg"),
        )
        .with_host(linux_host())
    }

    #[test]
    fn test_android_platform_vars() {
        let mut android = settings(Os::Android);
        android.compiler = Compiler::Clang;
        android.api_level = Some(21);

        assert_eq!(
            context(android).platform_vars().to_args(),
            vec![
                "-DCMAKE_SYSTEM_NAME=Android",
                "-DCMAKE_ANDROID_ARCH_ABI=arm64-v8a",
                "-DCMAKE_SYSTEM_VERSION=21",
            ]
        );
    }

    #[test]
    fn test_apple_platform_vars() {
        let mut ios = settings(Os::Ios);
        ios.os_version = Some("13.0".to_string());
        assert_eq!(
            context(ios).platform_vars().to_args(),
            vec![
                "-DCMAKE_SYSTEM_NAME=iOS",
                "-DCMAKE_OSX_ARCHITECTURES=arm64",
                "-DCMAKE_OSX_DEPLOYMENT_TARGET=13.0",
            ]
        );

        let mut fat = settings(Os::Ios);
        fat.arch = Arch::IosFat;
        assert_eq!(
            context(fat).platform_vars().to_args(),
            vec!["-DCMAKE_SYSTEM_NAME=iOS"]
        );

        let mut mac = settings(Os::Macos);
        mac.os_version = Some("10.15".to_string());
        let native_mac = context(mac).with_host(HostPlatform {
            os: Os::Macos,
            arch: Arch::Armv8,
        });
        assert_eq!(
            native_mac.platform_vars().to_args(),
            vec!["-DCMAKE_OSX_DEPLOYMENT_TARGET=10.15"]
        );
    }

    #[test]
    fn test_native_build_has_no_platform_vars() {
        let mut linux = settings(Os::Linux);
        linux.compiler = Compiler::Gcc;
        linux.arch = Arch::X86_64;
        assert!(context(linux.clone()).platform_vars().is_empty());

        linux.arch = Arch::Armv8;
        assert_eq!(
            context(linux).platform_vars().to_args(),
            vec!["-DCMAKE_SYSTEM_NAME=Linux", "-DCMAKE_SYSTEM_PROCESSOR=aarch64"]
        );
    }

    #[test]
    fn test_effective_generator() {
        let dirs = || (PathBuf::from("src"), PathBuf::from("build"), PathBuf::from("pkg"));

        let (s, b, p) = dirs();
        let linux = BuildContext::new(settings(Os::Linux), s, b, p);
        assert_eq!(linux.effective_generator(), None);

        let (s, b, p) = dirs();
        let mut ios = settings(Os::Ios);
        ios.sdk = Some(AppleSdk::Device);
        assert_eq!(
            BuildContext::new(ios, s, b, p).effective_generator().as_deref(),
            Some("Xcode")
        );

        let (s, b, p) = dirs();
        let mut catalyst = settings(Os::Macos);
        catalyst.subsystem = Some(Subsystem::Catalyst);
        assert_eq!(
            BuildContext::new(catalyst, s, b, p).effective_generator().as_deref(),
            Some("Xcode")
        );

        let (s, b, p) = dirs();
        let ninja = BuildContext::new(settings(Os::Linux), s, b, p)
            .with_generator(Some("Ninja".to_string()));
        assert_eq!(ninja.effective_generator().as_deref(), Some("Ninja"));
    }
}
