//! The recipe pipeline: resolve, generate flags, build, package, identify.
//!
//! [`RecipeBuild::prepare`] does all the pure work up front (settings,
//! options, identities, directories). The side-effecting steps take a
//! [`BuildDriver`] so they can run against CMake or a test double.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;

use crate::builder::cmake::BuildDriver;
use crate::builder::context::{cmake_env_overrides, BuildContext};
use crate::builder::flags::{self, FlagList};
use crate::builder::package_info::PackageInfo;
use crate::core::options::ResolvedOptions;
use crate::core::package_id::{compatible_archs, exact_dependency_set, DependencyRef, PackageIdentity};
use crate::core::recipe::{OptionOverrides, Propagation, Recipe};
use crate::core::settings::{Arch, HostPlatform, Settings};
use crate::ops::package::{PackagePlan, StepReport};
use crate::util::context::GlobalContext;
use crate::util::fs::{ensure_dir, list_files, remove_dir_all_if_exists, write_string};
use crate::util::hash::sha256_file;

/// File written into every package directory.
pub const INFO_FILE: &str = "recipekit-info.json";

/// Command-line input for one pipeline run.
#[derive(Debug, Clone, Default)]
pub struct BuildRequest {
    /// `--setting key=value`, applied over config `[settings]`
    pub settings: Vec<(String, String)>,

    /// `--option name=value`, applied over config `[options]`
    pub options: Vec<(String, String)>,
}

/// Everything known about one recipe build before anything runs.
#[derive(Debug, Clone)]
pub struct RecipeBuild {
    recipe: Recipe,
    reference: String,
    options: ResolvedOptions,
    dependencies: Vec<DependencyRef>,
    exact: BTreeSet<String>,
    ctx: BuildContext,
}

/// Contents of `recipekit-info.json`.
#[derive(Debug, Clone, Serialize)]
pub struct InfoRecord {
    pub name: String,
    pub version: String,
    pub settings: Settings,
    pub options: ResolvedOptions,
    pub propagate: Vec<Propagation>,
    pub flags: Vec<String>,
    pub package_id: String,
    pub build_id: String,
    pub compatible_archs: Vec<Arch>,
    pub link_flags: PackageInfo,
    /// Packaged files (relative path -> SHA-256)
    pub files: BTreeMap<String, String>,
}

impl RecipeBuild {
    /// Resolve settings, options and directories for `request`.
    pub fn prepare(gctx: &GlobalContext, request: &BuildRequest) -> Result<Self> {
        Self::prepare_with(gctx, request, HostPlatform::detect(), cmake_env_overrides())
    }

    /// Like [`RecipeBuild::prepare`] with an explicit host and environment
    /// overrides.
    pub fn prepare_with(
        gctx: &GlobalContext,
        request: &BuildRequest,
        host: HostPlatform,
        env_vars: FlagList,
    ) -> Result<Self> {
        let config = gctx.config();
        let recipe = Recipe::load(gctx.manifest_path())?;

        let config_settings = config.setting_assignments();
        let settings = Settings::for_host(&host)
            .with_assignments(
                config_settings
                    .iter()
                    .chain(&request.settings)
                    .map(|(k, v)| (k.as_str(), v.as_str())),
            )?;
        settings.validate()?;

        let overrides = OptionOverrides {
            config: config.option_assignments(),
            cli: request.options.clone(),
        };
        let options = recipe.resolve_options(&settings, &overrides)?;

        let dependencies = recipe
            .manifest()
            .dependencies
            .iter()
            .map(|(name, version)| DependencyRef::parse(name, version))
            .collect::<Result<Vec<_>>>()?;

        let exact = exact_dependency_set(
            recipe
                .manifest()
                .layout
                .exact_dependencies
                .iter()
                .chain(&config.identity.exact_dependencies),
        );

        let reference = format!("{}/{}", recipe.name(), recipe.manifest().version()?);
        let package_key =
            PackageIdentity::package(&reference, &options, &settings, &dependencies, &exact).short_key();
        let build_key = PackageIdentity::build(&reference, &options, &settings, &dependencies).short_key();

        let toolchain_file = config
            .build
            .toolchain_file
            .as_ref()
            .map(|path| gctx.root().join(path));

        let ctx = BuildContext::new(
            settings,
            gctx.root().to_path_buf(),
            gctx.build_dir(&build_key),
            gctx.package_dir(&package_key),
        )
        .with_host(host)
        .with_generator(config.build.generator.clone())
        .with_toolchain_file(toolchain_file)
        .with_jobs(config.build.jobs)
        .with_extra_vars(config.cmake_variables())
        .with_env_vars(env_vars);

        tracing::debug!("prepared {} for {}", recipe.name(), ctx.settings);

        Ok(RecipeBuild {
            recipe,
            reference,
            options,
            dependencies,
            exact,
            ctx,
        })
    }

    pub fn recipe(&self) -> &Recipe {
        &self.recipe
    }

    pub fn settings(&self) -> &Settings {
        &self.ctx.settings
    }

    pub fn options(&self) -> &ResolvedOptions {
        &self.options
    }

    pub fn context(&self) -> &BuildContext {
        &self.ctx
    }

    /// Options pushed into sub-packages.
    pub fn propagations(&self) -> Result<Vec<Propagation>> {
        Ok(self.recipe.propagations(&self.options)?)
    }

    /// CMake cache variables generated from the recipe.
    pub fn flags(&self) -> Result<FlagList> {
        Ok(flags::generate(&self.recipe, &self.options, self.settings())?)
    }

    pub fn package_identity(&self) -> PackageIdentity {
        PackageIdentity::package(
            &self.reference,
            &self.options,
            self.settings(),
            &self.dependencies,
            &self.exact,
        )
    }

    pub fn build_identity(&self) -> PackageIdentity {
        PackageIdentity::build(&self.reference, &self.options, self.settings(), &self.dependencies)
    }

    /// Architectures that can consume this package.
    pub fn compatible_archs(&self) -> Vec<Arch> {
        compatible_archs(self.settings())
    }

    /// Link flags consumers of this package need.
    pub fn package_info(&self) -> PackageInfo {
        PackageInfo::for_settings(self.settings(), &self.ctx.host)
    }

    pub fn package_plan(&self) -> PackagePlan {
        PackagePlan::for_recipe(&self.recipe, &self.ctx)
    }

    /// Configure and compile.
    pub fn build(&self, driver: &dyn BuildDriver) -> Result<()> {
        let flags = self.flags()?;
        driver.configure(&flags)?;
        driver.build(None)
    }

    /// Populate the package directory and write the info file.
    ///
    /// `driver` is only needed (and only used) for install layouts. On
    /// failure the package directory is removed, never left half filled.
    pub fn package(&self, driver: Option<&dyn BuildDriver>) -> Result<Vec<StepReport>> {
        let package_dir = &self.ctx.package_dir;
        remove_dir_all_if_exists(package_dir)?;
        ensure_dir(package_dir)?;

        match self.fill_package(driver) {
            Ok(reports) => {
                tracing::info!("Packaged {} into {}", self.recipe.name(), package_dir.display());
                Ok(reports)
            }
            Err(err) => {
                if let Err(cleanup) = remove_dir_all_if_exists(package_dir) {
                    tracing::warn!("{:#}", cleanup);
                }
                Err(err)
            }
        }
    }

    fn fill_package(&self, driver: Option<&dyn BuildDriver>) -> Result<Vec<StepReport>> {
        let plan = self.package_plan();
        if plan.install {
            let driver = driver.context("install layout needs a build driver")?;
            driver.install()?;
        }
        let reports = plan.execute(&self.ctx.package_dir)?;
        self.write_info()?;
        Ok(reports)
    }

    /// The whole pipeline: build, package, identify.
    pub fn create(&self, driver: &dyn BuildDriver) -> Result<Vec<StepReport>> {
        tracing::info!("Creating {} for {}", self.recipe.name(), self.settings());
        self.build(driver)?;
        self.package(Some(driver))
    }

    /// The info record for the current package directory contents.
    pub fn info_record(&self) -> Result<InfoRecord> {
        let manifest = self.recipe.manifest();
        let package_dir = &self.ctx.package_dir;

        let mut files = BTreeMap::new();
        for rel in list_files(package_dir)? {
            if rel == Path::new(INFO_FILE) {
                continue;
            }
            let key = rel.to_string_lossy().replace('\\', "/");
            files.insert(key, sha256_file(&package_dir.join(&rel))?);
        }

        Ok(InfoRecord {
            name: manifest.name().to_string(),
            version: manifest.version()?.to_string(),
            settings: self.settings().clone(),
            options: self.options.clone(),
            propagate: self.propagations()?,
            flags: self.flags()?.to_args(),
            package_id: self.package_identity().key(),
            build_id: self.build_identity().key(),
            compatible_archs: self.compatible_archs(),
            link_flags: self.package_info(),
            files,
        })
    }

    /// Write `recipekit-info.json` into the package directory.
    pub fn write_info(&self) -> Result<PathBuf> {
        let record = self.info_record()?;
        let path = self.ctx.package_dir.join(INFO_FILE);
        let json = serde_json::to_string_pretty(&record)?;
        write_string(&path, &json)?;
        Ok(path)
    }

    /// Remove this build's build and package directories.
    pub fn clean(&self) -> Result<()> {
        remove_dir_all_if_exists(&self.ctx.build_dir)?;
        remove_dir_all_if_exists(&self.ctx.package_dir)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::fs;

    use super::*;
    use crate::core::errors::RecipeError;
    use crate::core::manifest::MANIFEST_NAME;
    use crate::core::settings::{Compiler, Os};
    use crate::util::config::Config;
    use tempfile::TempDir;

    const LINUX_HOST: HostPlatform = HostPlatform {
        os: Os::Linux,
        arch: Arch::X86_64,
    };

    const MANIFEST: &str = r#"
[package]
name = "Core"
version = "2.1"
base = "recognizer"

[dependencies]
Boost = "1.75.0"
Zlib = "1.2.11"

[propagate]
packages = ["*"]
"#;

    /// Records calls and drops a library into the build tree on `build`.
    struct FakeDriver {
        ctx: BuildContext,
        calls: RefCell<Vec<String>>,
    }

    impl BuildDriver for FakeDriver {
        fn configure(&self, flags: &FlagList) -> Result<()> {
            self.calls
                .borrow_mut()
                .push(format!("configure {}", flags.len()));
            Ok(())
        }

        fn build(&self, _target: Option<&str>) -> Result<()> {
            self.calls.borrow_mut().push("build".to_string());
            let lib = self.ctx.build_dir.join("lib/libCore.a");
            fs::create_dir_all(lib.parent().unwrap())?;
            fs::write(lib, "archive")?;
            Ok(())
        }

        fn install(&self) -> Result<()> {
            self.calls.borrow_mut().push("install".to_string());
            Ok(())
        }
    }

    fn project(manifest: &str) -> (TempDir, GlobalContext) {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(MANIFEST_NAME), manifest).unwrap();
        fs::create_dir_all(tmp.path().join("Core/Include")).unwrap();
        fs::write(tmp.path().join("Core/Include/Core.hpp"), "#pragma once").unwrap();
        let gctx = GlobalContext::with_cwd(tmp.path(), None)
            .unwrap()
            .with_config(Config::default());
        (tmp, gctx)
    }

    fn request(settings: &[(&str, &str)], options: &[(&str, &str)]) -> BuildRequest {
        let pairs = |items: &[(&str, &str)]| {
            items
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect()
        };
        BuildRequest {
            settings: pairs(settings),
            options: pairs(options),
        }
    }

    fn linux_release() -> Vec<(&'static str, &'static str)> {
        vec![
            ("os", "Linux"),
            ("arch", "x86_64"),
            ("compiler", "clang"),
            ("build_type", "Release"),
        ]
    }

    #[test]
    fn test_create_runs_pipeline_in_order() {
        let (_tmp, gctx) = project(MANIFEST);
        let build = RecipeBuild::prepare_with(
            &gctx,
            &request(&linux_release(), &[]),
            LINUX_HOST,
            FlagList::new(),
        )
        .unwrap();

        let driver = FakeDriver {
            ctx: build.context().clone(),
            calls: RefCell::new(Vec::new()),
        };
        let reports = build.create(&driver).unwrap();

        let flag_count = build.flags().unwrap().len();
        assert_eq!(
            *driver.calls.borrow(),
            vec![format!("configure {}", flag_count), "build".to_string()]
        );
        assert_eq!(reports[0].name, "headers");

        let info: serde_json::Value = serde_json::from_str(
            &fs::read_to_string(build.context().package_dir.join(INFO_FILE)).unwrap(),
        )
        .unwrap();
        assert_eq!(info["name"], "Core");
        assert_eq!(info["version"], "2.1.0");
        assert_eq!(info["package_id"], build.package_identity().key());
        assert!(info["files"]["lib/libCore.a"].is_string());
        assert!(info["files"]["include/Core.hpp"].is_string());
        assert_eq!(info["propagate"][0]["package"], "*");
        assert_eq!(info["compatible_archs"], serde_json::json!(["x86_64"]));
    }

    #[test]
    fn test_failed_package_leaves_nothing_behind() {
        let (_tmp, gctx) = project(MANIFEST);
        let build = RecipeBuild::prepare_with(
            &gctx,
            &request(&linux_release(), &[]),
            LINUX_HOST,
            FlagList::new(),
        )
        .unwrap();

        // Headers exist but nothing was compiled
        let err = build.package(None).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<RecipeError>(),
            Some(RecipeError::NoArtifacts { .. })
        ));
        assert!(!build.context().package_dir.exists());
    }

    #[test]
    fn test_defaults_follow_given_host() {
        let (_tmp, gctx) = project(MANIFEST);
        let mac_host = HostPlatform {
            os: Os::Macos,
            arch: Arch::Armv8,
        };
        let build =
            RecipeBuild::prepare_with(&gctx, &request(&[], &[]), mac_host, FlagList::new()).unwrap();

        assert_eq!(build.settings().os, Os::Macos);
        assert_eq!(build.settings().arch, Arch::Armv8);
        assert_eq!(build.settings().compiler, Compiler::AppleClang);
        assert_eq!(build.context().host, mac_host);
        assert_eq!(build.compatible_archs(), vec![Arch::Armv8, Arch::X86_64]);
    }

    #[test]
    fn test_version_bump_moves_package_dir() {
        let (_tmp, gctx) = project(MANIFEST);
        let before = RecipeBuild::prepare_with(
            &gctx,
            &request(&linux_release(), &[]),
            LINUX_HOST,
            FlagList::new(),
        )
        .unwrap();

        fs::write(gctx.manifest_path(), MANIFEST.replace("version = \"2.1\"", "version = \"2.2\"")).unwrap();
        let after = RecipeBuild::prepare_with(
            &gctx,
            &request(&linux_release(), &[]),
            LINUX_HOST,
            FlagList::new(),
        )
        .unwrap();

        assert_ne!(before.context().package_dir, after.context().package_dir);
    }

    #[test]
    fn test_settings_and_options_layering() {
        let (_tmp, gctx) = project(MANIFEST);
        let mut config = Config::default();
        config
            .settings
            .insert("os".to_string(), toml::Value::String("Android".to_string()));
        config
            .options
            .insert("log_level".to_string(), toml::Value::String("Info".to_string()));
        let gctx = gctx.with_config(config);

        let build = RecipeBuild::prepare_with(
            &gctx,
            &request(
                &[("arch", "armv8"), ("compiler", "clang")],
                &[("log_level", "Debug")],
            ),
            LINUX_HOST,
            FlagList::new(),
        )
        .unwrap();

        assert_eq!(build.settings().os, Os::Android);
        assert_eq!(build.options().get_choice("log_level").unwrap(), "Debug");
        assert!(build.options().get_bool("binary_serialization").unwrap());
    }

    #[test]
    fn test_unknown_option_is_rejected() {
        let (_tmp, gctx) = project(MANIFEST);
        let err = RecipeBuild::prepare_with(
            &gctx,
            &request(&linux_release(), &[("turbo", "True")]),
            LINUX_HOST,
            FlagList::new(),
        )
        .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<RecipeError>(),
            Some(RecipeError::UnknownOption { .. })
        ));
    }

    #[test]
    fn test_directories_follow_identities() {
        let (tmp, gctx) = project(MANIFEST);
        let build = RecipeBuild::prepare_with(
            &gctx,
            &request(&linux_release(), &[]),
            LINUX_HOST,
            FlagList::new(),
        )
        .unwrap();

        assert_eq!(
            build.context().package_dir,
            tmp.path()
                .join(".recipekit/package")
                .join(build.package_identity().short_key())
        );
        assert_eq!(
            build.context().build_dir,
            tmp.path()
                .join(".recipekit/build")
                .join(build.build_identity().short_key())
        );
    }

    #[test]
    fn test_testing_option_shares_package_dir() {
        let (_tmp, gctx) = project(MANIFEST);
        let prepare = |options: &[(&str, &str)]| {
            RecipeBuild::prepare_with(
                &gctx,
                &request(&linux_release(), options),
                LINUX_HOST,
                FlagList::new(),
            )
            .unwrap()
        };

        let plain = prepare(&[]);
        let testing = prepare(&[("enable_testing", "True")]);
        assert_eq!(plain.context().package_dir, testing.context().package_dir);
        assert_ne!(plain.flags().unwrap(), testing.flags().unwrap());
    }

    #[test]
    fn test_install_layout_needs_driver() {
        let manifest = format!("{}\n[layout]\nmode = \"install\"\n", MANIFEST);
        let (_tmp, gctx) = project(&manifest);
        let build = RecipeBuild::prepare_with(
            &gctx,
            &request(&linux_release(), &[]),
            LINUX_HOST,
            FlagList::new(),
        )
        .unwrap();

        assert!(build.package(None).is_err());

        let driver = FakeDriver {
            ctx: build.context().clone(),
            calls: RefCell::new(Vec::new()),
        };
        build.package(Some(&driver)).unwrap();
        assert_eq!(*driver.calls.borrow(), vec!["install".to_string()]);
    }
}
