//! Consumer-facing link information for a built package.

use serde::Serialize;

use crate::core::settings::{BuildType, Compiler, HostPlatform, Os, Settings};

/// Flags a consumer must add when linking against this package.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PackageInfo {
    pub shared_link_flags: Vec<String>,
    pub exe_link_flags: Vec<String>,
}

impl PackageInfo {
    /// Link flags for `settings` built on `host`.
    ///
    /// Debug builds compiled with clang run with ASan/UBSan enabled
    /// (see `MB_ENABLE_RUNTIME_CHECKS`), so consumers have to link the
    /// sanitizer runtimes too. Cross builds and Windows never enable them.
    pub fn for_settings(settings: &Settings, host: &HostPlatform) -> Self {
        let flags = runtime_check_link_flags(settings, host);
        PackageInfo {
            shared_link_flags: flags.clone(),
            exe_link_flags: flags,
        }
    }
}

fn runtime_check_link_flags(settings: &Settings, host: &HostPlatform) -> Vec<String> {
    let clang = matches!(settings.compiler, Compiler::Clang | Compiler::AppleClang);
    if settings.build_type != BuildType::Debug
        || settings.is_cross_building(host)
        || !clang
        || settings.os == Os::Windows
    {
        return Vec::new();
    }

    let mut flags = vec![
        "-fsanitize=undefined".to_string(),
        "-fsanitize=address".to_string(),
    ];
    if settings.compiler == Compiler::Clang {
        flags.push("-fsanitize=integer".to_string());
    }
    flags
}
