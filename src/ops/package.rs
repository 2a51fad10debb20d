//! Package layout - copying build outputs into the package tree.
//!
//! A [`PackagePlan`] is computed from the recipe and build context first
//! and executed second, so the per-platform layout can be inspected (and
//! tested) without a real build tree.

use std::path::{Path, PathBuf};

use anyhow::Result;
use serde::Serialize;

use crate::builder::context::BuildContext;
use crate::core::errors::RecipeError;
use crate::core::manifest::{BaseRecipe, HeaderSet, LayoutMode};
use crate::core::recipe::Recipe;
use crate::core::settings::Os;
use crate::util::fs::copy_matching;

/// One pattern copy: files under `src` matching `pattern` go to `dst`
/// (relative to the package directory).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CopyPass {
    pub src: PathBuf,
    pub pattern: String,
    pub dst: PathBuf,
    pub keep_path: bool,
}

/// A named group of passes that must (or may) match something.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CopyStep {
    pub name: String,
    pub passes: Vec<CopyPass>,
    pub required: bool,
}

impl CopyStep {
    fn required(name: &str, passes: Vec<CopyPass>) -> Self {
        CopyStep {
            name: name.to_string(),
            passes,
            required: true,
        }
    }

    fn optional(name: &str, passes: Vec<CopyPass>) -> Self {
        CopyStep {
            name: name.to_string(),
            passes,
            required: false,
        }
    }

    fn patterns(&self) -> String {
        self.passes
            .iter()
            .map(|p| p.pattern.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Ordered copy steps for one package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackagePlan {
    /// Run the build driver's install step before copying.
    pub install: bool,
    pub steps: Vec<CopyStep>,
}

/// Files written by one step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepReport {
    pub name: String,
    pub files: Vec<PathBuf>,
}

impl PackagePlan {
    /// The layout for `recipe` built in `ctx`.
    pub fn for_recipe(recipe: &Recipe, ctx: &BuildContext) -> Self {
        let layout = &recipe.manifest().layout;
        let install = layout.mode == LayoutMode::Install;
        let mut steps = Vec::new();

        if !install {
            steps.push(headers_step(recipe.name(), layout.headers, &ctx.source_dir));
            steps.extend(library_steps(&layout.libraries, ctx));
        }

        if recipe.base().inherits(BaseRecipe::Recognizer) {
            steps.push(CopyStep::optional(
                "features",
                vec![CopyPass {
                    src: ctx.build_dir.clone(),
                    pattern: "features_*.cmake".to_string(),
                    dst: PathBuf::new(),
                    keep_path: true,
                }],
            ));
            steps.push(CopyStep::optional(
                "resources",
                vec![CopyPass {
                    src: ctx.source_dir.clone(),
                    pattern: "Dictionary/Dictionaries/*.zzip".to_string(),
                    dst: PathBuf::from("res"),
                    keep_path: true,
                }],
            ));
        }

        PackagePlan { install, steps }
    }

    /// Copy every step into `package_dir`.
    ///
    /// Passes run in order and later passes overwrite earlier copies. A
    /// required step matching nothing fails with [`RecipeError::NoArtifacts`].
    pub fn execute(&self, package_dir: &Path) -> Result<Vec<StepReport>> {
        let mut reports = Vec::new();

        for step in &self.steps {
            let mut files = Vec::new();
            for pass in &step.passes {
                let dst = package_dir.join(&pass.dst);
                for copied in copy_matching(&pass.src, &pass.pattern, &dst, pass.keep_path)? {
                    if !files.contains(&copied) {
                        files.push(copied);
                    }
                }
            }

            if files.is_empty() {
                if step.required {
                    let src = step
                        .passes
                        .first()
                        .map(|p| p.src.clone())
                        .unwrap_or_default();
                    return Err(RecipeError::NoArtifacts {
                        step: step.name.clone(),
                        src,
                        patterns: step.patterns(),
                    }
                    .into());
                }
                tracing::warn!("{}: nothing matched {}", step.name, step.patterns());
            } else {
                tracing::debug!("{}: {} file(s)", step.name, files.len());
            }

            reports.push(StepReport {
                name: step.name.clone(),
                files,
            });
        }

        Ok(reports)
    }
}

fn headers_step(name: &str, headers: HeaderSet, source_dir: &Path) -> CopyStep {
    let dir = match headers {
        HeaderSet::Public => "Include",
        HeaderSet::All => "Source",
    };
    CopyStep::required(
        "headers",
        vec![CopyPass {
            src: source_dir.join(name).join(dir),
            pattern: "*.h*".to_string(),
            dst: PathBuf::from("include"),
            keep_path: true,
        }],
    )
}

fn library_steps(libraries: &[String], ctx: &BuildContext) -> Vec<CopyStep> {
    let lib_dir = ctx.build_dir.join("lib");
    let flat = |src: &Path, pattern: String| CopyPass {
        src: src.to_path_buf(),
        pattern,
        dst: PathBuf::from("lib"),
        keep_path: false,
    };

    let mut steps = Vec::new();
    for lib in libraries {
        match ctx.settings.os {
            Os::Windows => {
                steps.push(CopyStep::required(
                    "libraries",
                    vec![flat(&lib_dir, format!("{}.lib", lib))],
                ));
                steps.push(CopyStep::optional(
                    "debug symbols",
                    vec![flat(&lib_dir, single_star(format!("*{}.pdb", lib)))],
                ));
            }
            Os::Ios => {
                let sdk_dir = match ctx.settings.sdk {
                    Some(sdk) => format!("Release-{}", sdk.sdk_name()),
                    None => "Release-*".to_string(),
                };
                // Xcode leaves the per-sdk archive in Release-<sdk> while
                // the lipo step writes the universal one to lib/. Both land
                // on the same flattened name, so the universal pass must
                // come second to win.
                steps.push(CopyStep::required(
                    "libraries",
                    vec![
                        flat(&ctx.build_dir, format!("{}/{}.a", sdk_dir, lib)),
                        flat(&lib_dir, format!("{}.a", lib)),
                    ],
                ));
            }
            _ => steps.push(CopyStep::required(
                "libraries",
                vec![flat(&lib_dir, format!("{}.a", lib))],
            )),
        }
    }
    steps
}

/// `**` is only valid as a whole path component; `*<lib>` with `lib = *`
/// means the same as a single star.
fn single_star(pattern: String) -> String {
    pattern.replace("**", "*")
}
