//! CMake build driver.
//!
//! Configure, build and install commands are planned as [`ProcessBuilder`]s
//! first and executed second, so the platform dispatch can be inspected
//! without running anything.

use anyhow::Result;

use crate::builder::context::BuildContext;
use crate::builder::flags::FlagList;
use crate::core::errors::RecipeError;
use crate::core::settings::{AppleSdk, Os, Subsystem};
use crate::util::process::{find_cmake, find_executable, ProcessBuilder};

/// Configuration used for every multi-config build and install.
const BUILD_CONFIG: &str = "Release";

/// Destination for Mac Catalyst builds, which CMake cannot drive itself.
const CATALYST_DESTINATION: &str = "platform=macOS,variant=Mac Catalyst";

/// The external configure/build/install contract.
pub trait BuildDriver {
    /// Configure the build tree with the given cache variables.
    fn configure(&self, flags: &FlagList) -> Result<()>;

    /// Compile, optionally a single target.
    fn build(&self, target: Option<&str>) -> Result<()>;

    /// Install into the package directory.
    fn install(&self) -> Result<()>;
}

/// CMake (and, for Catalyst, xcodebuild) driver.
pub struct CMakeDriver<'a> {
    ctx: &'a BuildContext,
    cmake: ProcessBuilder,
}

impl<'a> CMakeDriver<'a> {
    /// Create a driver, failing early if a required tool is missing.
    pub fn new(ctx: &'a BuildContext) -> Result<Self, RecipeError> {
        let cmake = find_cmake().ok_or_else(|| RecipeError::ToolNotFound {
            tool: "cmake".to_string(),
            hint: "Install CMake and ensure it's in your PATH".to_string(),
        })?;

        if ctx.settings.is_catalyst() && find_executable("xcodebuild").is_none() {
            return Err(RecipeError::ToolNotFound {
                tool: "xcodebuild".to_string(),
                hint: "Mac Catalyst builds need Xcode command line tools".to_string(),
            });
        }

        Ok(Self::with_program(ctx, ProcessBuilder::new(cmake)))
    }

    /// Create a driver around an explicit cmake program.
    pub fn with_program(ctx: &'a BuildContext, cmake: ProcessBuilder) -> Self {
        CMakeDriver { ctx, cmake }
    }

    /// `cmake -S <src> -B <build> ...`
    pub fn configure_command(&self, flags: &FlagList) -> ProcessBuilder {
        let ctx = self.ctx;
        let mut cmd = self
            .cmake
            .clone()
            .arg("-S")
            .arg(&ctx.source_dir)
            .arg("-B")
            .arg(&ctx.build_dir);

        if let Some(generator) = ctx.effective_generator() {
            cmd = cmd.arg("-G").arg(generator);
        }

        if let Some(toolchain) = &ctx.toolchain_file {
            cmd = cmd.arg(format!("-DCMAKE_TOOLCHAIN_FILE={}", toolchain.display()));
        }

        cmd = cmd.args(ctx.platform_vars().to_args()).arg(format!(
            "-DCMAKE_INSTALL_PREFIX={}",
            ctx.package_dir.display()
        ));

        // Environment overrides come last so they win over recipe flags
        cmd.args(flags.to_args())
            .args(ctx.extra_vars.to_args())
            .args(ctx.env_vars.to_args())
    }

    /// The compile command for the target platform.
    pub fn build_command(&self, target: Option<&str>) -> ProcessBuilder {
        let settings = &self.ctx.settings;
        match (settings.os, settings.sdk) {
            (Os::Ios, Some(AppleSdk::MacCatalyst)) => self.xcodebuild("ALL_BUILD"),
            (Os::Ios, Some(sdk)) => self.cmake_build().arg("--").args(sdk_args(sdk.sdk_name())),
            (Os::Ios, None) => with_target(self.cmake_build(), target),
            _ => {
                let mut cmd = self.cmake_build();
                if let Some(jobs) = self.ctx.jobs {
                    cmd = cmd.arg("--parallel").arg(jobs.to_string());
                }
                with_target(cmd, target)
            }
        }
    }

    /// The install command for the target platform.
    pub fn install_command(&self) -> ProcessBuilder {
        let settings = &self.ctx.settings;
        match (settings.os, settings.sdk, settings.subsystem) {
            (Os::Ios, Some(sdk), _) => self
                .cmake_build()
                .args(["--target", "install", "--"])
                .args(sdk_args(sdk.sdk_name())),
            (Os::Macos, _, Some(Subsystem::Catalyst)) => self.xcodebuild("install"),
            _ => self
                .cmake
                .clone()
                .arg("--install")
                .arg(&self.ctx.build_dir)
                .args(["--config", BUILD_CONFIG]),
        }
    }

    fn cmake_build(&self) -> ProcessBuilder {
        self.cmake
            .clone()
            .arg("--build")
            .arg(&self.ctx.build_dir)
            .args(["--config", BUILD_CONFIG])
    }

    fn xcodebuild(&self, scheme: &str) -> ProcessBuilder {
        ProcessBuilder::new("xcodebuild")
            .args(["build", "-configuration", BUILD_CONFIG, "-scheme", scheme])
            .args(["-destination", CATALYST_DESTINATION, "ONLY_ACTIVE_ARCH=NO"])
            .cwd(&self.ctx.build_dir)
    }
}

impl BuildDriver for CMakeDriver<'_> {
    fn configure(&self, flags: &FlagList) -> Result<()> {
        tracing::info!("Configuring {}", self.ctx.source_dir.display());
        let settings = &self.ctx.settings;
        if self.ctx.is_cross_building()
            && self.ctx.toolchain_file.is_none()
            && !settings.os.is_mobile()
        {
            tracing::warn!(
                "cross building for {} without a toolchain file; set `[build] toolchain-file`",
                settings
            );
        }
        crate::util::fs::ensure_dir(&self.ctx.build_dir)?;
        run(&self.configure_command(flags))
    }

    fn build(&self, target: Option<&str>) -> Result<()> {
        tracing::info!("Building for {}", self.ctx.settings);
        run(&self.build_command(target))
    }

    fn install(&self) -> Result<()> {
        tracing::info!("Installing into {}", self.ctx.package_dir.display());
        crate::util::fs::ensure_dir(&self.ctx.package_dir)?;
        run(&self.install_command())
    }
}

fn sdk_args(sdk_name: &str) -> [String; 3] {
    [
        "-sdk".to_string(),
        sdk_name.to_string(),
        "ONLY_ACTIVE_ARCH=NO".to_string(),
    ]
}

fn with_target(cmd: ProcessBuilder, target: Option<&str>) -> ProcessBuilder {
    match target {
        Some(target) => cmd.arg("--target").arg(target),
        None => cmd,
    }
}

/// Run a planned command; a failure carries the tool's stderr unmodified.
fn run(cmd: &ProcessBuilder) -> Result<()> {
    tracing::debug!("running `{}`", cmd.display_command());
    let output = cmd.exec()?;

    if !output.status.success() {
        return Err(RecipeError::ToolFailed {
            command: cmd.display_command(),
            status: output.status.code(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        }
        .into());
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    for line in stdout.lines() {
        tracing::debug!("{}", line);
    }
    Ok(())
}
