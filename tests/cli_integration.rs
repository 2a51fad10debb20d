//! CLI integration tests for recipekit.
//!
//! None of these need cmake: they exercise option resolution, flag
//! generation, identities, packaging from a pre-seeded build tree and
//! runtime imports.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use assert_cmd::prelude::*;
use predicates::prelude::*;
use tempfile::TempDir;

const CORE_MANIFEST: &str = r#"
[package]
name = "Core"
version = "3.2.0"

[dependencies]
Boost = "1.75.0"
Zlib = "1.2.11"
"#;

const RECOGNIZER_MANIFEST: &str = r#"
[package]
name = "BlinkId"
version = "6.0"
base = "recognizer"

[options.with_dewarp]
type = "bool"
default = false
cmake = "BLINKID_WITH_DEWARP"

[default-options]
log_level = "Info"

[propagate]
packages = ["Core"]
"#;

/// Get the recipekit binary command, isolated from the user's config.
fn recipekit(project: &Path) -> Command {
    let mut cmd = Command::cargo_bin("recipekit").unwrap();
    cmd.current_dir(project)
        .env("HOME", project)
        .env("USERPROFILE", project)
        .env_remove("RECIPEKIT_MANIFEST_PATH");
    cmd
}

/// A project directory holding `manifest` and one public header.
fn project(manifest: &str, name: &str) -> TempDir {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("Recipe.toml"), manifest).unwrap();
    let include = tmp.path().join(name).join("Include");
    fs::create_dir_all(&include).unwrap();
    fs::write(include.join(format!("{}.hpp", name)), "#pragma once\n").unwrap();
    tmp
}

const LINUX_RELEASE: &[&str] = &[
    "-s",
    "os=Linux",
    "-s",
    "arch=x86_64",
    "-s",
    "compiler=clang",
    "-s",
    "build_type=Release",
];

fn stdout_of(cmd: &mut Command) -> String {
    let output = cmd.output().unwrap();
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8(output.stdout).unwrap()
}

// ============================================================================
// recipekit options
// ============================================================================

#[test]
fn test_options_prints_defaults() {
    let tmp = project(CORE_MANIFEST, "Core");

    recipekit(tmp.path())
        .arg("options")
        .args(LINUX_RELEASE)
        .assert()
        .success()
        .stdout(predicate::str::contains("log_level=WarningsAndErrors"))
        .stdout(predicate::str::contains("enable_timer=False"))
        .stdout(predicate::str::contains("enable_testing=False"))
        .stdout(predicate::str::contains("[propagate]").not());
}

#[test]
fn test_options_binary_serialization_follows_platform() {
    let tmp = project(RECOGNIZER_MANIFEST, "BlinkId");

    recipekit(tmp.path())
        .args(["options", "-s", "os=Android", "-s", "arch=armv8", "-s", "compiler=clang"])
        .assert()
        .success()
        .stdout(predicate::str::contains("binary_serialization=True"))
        .stdout(predicate::str::contains("Core:binary_serialization=True"));

    recipekit(tmp.path())
        .arg("options")
        .args(LINUX_RELEASE)
        .assert()
        .success()
        .stdout(predicate::str::contains("binary_serialization=False"))
        .stdout(predicate::str::contains("log_level=Info"));
}

#[test]
fn test_unknown_option_fails() {
    let tmp = project(CORE_MANIFEST, "Core");

    recipekit(tmp.path())
        .args(["options", "-o", "turbo=True"])
        .args(LINUX_RELEASE)
        .assert()
        .failure()
        .stderr(predicate::str::contains("turbo"));
}

#[test]
fn test_invalid_option_value_fails() {
    let tmp = project(CORE_MANIFEST, "Core");

    recipekit(tmp.path())
        .args(["flags", "-o", "log_level=Loud"])
        .args(LINUX_RELEASE)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Loud"));
}

// ============================================================================
// recipekit flags
// ============================================================================

#[test]
fn test_flags_release_defaults() {
    let tmp = project(CORE_MANIFEST, "Core");

    let out = stdout_of(recipekit(tmp.path()).arg("flags").args(LINUX_RELEASE));
    let lines: Vec<&str> = out.lines().collect();

    assert!(lines.contains(&"-DMB_GLOBAL_LOG_LEVEL=LOG_WARNINGS_AND_ERRORS"));
    assert!(lines.contains(&"-DCMAKE_BUILD_TYPE=Release"));
    assert!(lines.contains(&"-DMB_PACKAGE_NAME=Core"));
    assert!(!out.contains("MB_GLOBAL_ENABLE_TIMER"));
    assert!(!out.contains("MB_DEV_RELEASE"));
    assert_eq!(lines.last(), Some(&"-DMB_TREAT_WARNINGS_AS_ERRORS=OFF"));
}

#[test]
fn test_flags_debug_desktop_vs_ios() {
    let tmp = project(CORE_MANIFEST, "Core");

    recipekit(tmp.path())
        .args(["flags", "-s", "os=Linux", "-s", "compiler=clang", "-s", "build_type=Debug"])
        .assert()
        .success()
        .stdout(predicate::str::contains("-DCMAKE_BUILD_TYPE=Release"))
        .stdout(predicate::str::contains("-DMB_DEV_RELEASE=ON"))
        .stdout(predicate::str::contains("-DMB_ENABLE_RUNTIME_CHECKS=ON"));

    recipekit(tmp.path())
        .args([
            "flags",
            "-s",
            "os=iOS",
            "-s",
            "os.sdk=device",
            "-s",
            "arch=armv8",
            "-s",
            "compiler=apple-clang",
            "-s",
            "build_type=Debug",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("-DMB_DEV_RELEASE=ON"))
        .stdout(predicate::str::contains("MB_ENABLE_RUNTIME_CHECKS").not());
}

#[test]
fn test_flags_are_deterministic_and_use_config() {
    let tmp = project(RECOGNIZER_MANIFEST, "BlinkId");
    fs::create_dir_all(tmp.path().join(".recipekit")).unwrap();
    fs::write(
        tmp.path().join(".recipekit/config.toml"),
        "[options]\nenable_timer = true\nwith_dewarp = true\n",
    )
    .unwrap();

    let first = stdout_of(recipekit(tmp.path()).arg("flags").args(LINUX_RELEASE));
    let second = stdout_of(recipekit(tmp.path()).arg("flags").args(LINUX_RELEASE));
    assert_eq!(first, second);

    assert!(first.contains("-DMB_GLOBAL_ENABLE_TIMER=ON"));
    assert!(first.contains("-DBLINKID_WITH_DEWARP=ON"));
    assert!(first.contains("-DRecognizer_RESULT_JSONIZATION=Off"));

    // command line wins over config
    let cli = stdout_of(
        recipekit(tmp.path())
            .args(["flags", "-o", "with_dewarp=False"])
            .args(LINUX_RELEASE),
    );
    assert!(cli.contains("-DBLINKID_WITH_DEWARP=OFF"));
}

#[test]
fn test_unparsable_config_fails() {
    let tmp = project(CORE_MANIFEST, "Core");
    fs::create_dir_all(tmp.path().join(".recipekit")).unwrap();
    fs::write(
        tmp.path().join(".recipekit/config.toml"),
        "[options]\nlog_level = \"Debug\n",
    )
    .unwrap();

    recipekit(tmp.path())
        .arg("options")
        .args(LINUX_RELEASE)
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to parse config file"));
}

#[test]
fn test_bad_setting_fails() {
    let tmp = project(CORE_MANIFEST, "Core");

    recipekit(tmp.path())
        .args(["flags", "-s", "os=Plan9"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Plan9"));

    recipekit(tmp.path())
        .args(["flags", "-s", "os"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("KEY=VALUE"));
}

// ============================================================================
// recipekit id
// ============================================================================

fn id_lines(tmp: &Path, extra: &[&str]) -> String {
    stdout_of(
        recipekit(tmp)
            .arg("id")
            .args(LINUX_RELEASE)
            .args(extra),
    )
}

#[test]
fn test_id_ignores_enable_testing() {
    let tmp = project(CORE_MANIFEST, "Core");

    let plain = id_lines(tmp.path(), &[]);
    let testing = id_lines(tmp.path(), &["-o", "enable_testing=True"]);
    let timer = id_lines(tmp.path(), &["-o", "enable_timer=True"]);

    let package_line = |s: &str| s.lines().next().unwrap().to_string();
    assert!(plain.starts_with("package_id: "));
    assert_eq!(package_line(&plain), package_line(&testing));
    assert_ne!(package_line(&plain), package_line(&timer));
}

#[test]
fn test_id_text_reduces_dependencies() {
    let tmp = project(CORE_MANIFEST, "Core");

    recipekit(tmp.path())
        .args(["id", "--text"])
        .args(LINUX_RELEASE)
        .assert()
        .success()
        .stdout(predicate::str::contains("Boost/1.75.0"))
        .stdout(predicate::str::contains("Zlib/1.Y.Z"))
        .stdout(predicate::str::contains("enable_testing").count(1));
}

#[test]
fn test_id_ios_is_fat() {
    let tmp = project(CORE_MANIFEST, "Core");
    let ios = |arch: &str| {
        stdout_of(recipekit(tmp.path()).args([
            "id",
            "-s",
            "os=iOS",
            "-s",
            &format!("arch={}", arch),
            "-s",
            "compiler=apple-clang",
        ]))
    };

    let package_line = |s: String| s.lines().next().unwrap().to_string();
    assert_eq!(package_line(ios("armv8")), package_line(ios("x86_64")));
}

#[test]
fn test_id_lists_compatible_archs() {
    let tmp = project(CORE_MANIFEST, "Core");

    recipekit(tmp.path())
        .arg("id")
        .args(LINUX_RELEASE)
        .assert()
        .success()
        .stdout(predicate::str::contains("compatible_archs: x86_64\n"));

    recipekit(tmp.path())
        .args(["id", "-s", "os=Macos", "-s", "arch=armv8", "-s", "compiler=apple-clang"])
        .assert()
        .success()
        .stdout(predicate::str::contains("compatible_archs: armv8 x86_64"));
}

#[test]
fn test_id_text_names_the_package() {
    let tmp = project(CORE_MANIFEST, "Core");

    recipekit(tmp.path())
        .args(["id", "--text"])
        .args(LINUX_RELEASE)
        .assert()
        .success()
        .stdout(predicate::str::starts_with("# package\n[package]\nCore/3.2.0\n"));
}

// ============================================================================
// recipekit info
// ============================================================================

#[test]
fn test_info_cross_build_has_no_sanitizers() {
    let tmp = project(CORE_MANIFEST, "Core");

    recipekit(tmp.path())
        .args([
            "info",
            "-s",
            "os=Android",
            "-s",
            "arch=armv7",
            "-s",
            "compiler=clang",
            "-s",
            "build_type=Debug",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("fsanitize").not())
        .stdout(predicate::str::contains("compatible_archs: armv7"));
}

#[cfg(all(target_os = "linux", target_arch = "x86_64"))]
#[test]
fn test_info_debug_clang_links_sanitizers() {
    let tmp = project(CORE_MANIFEST, "Core");

    recipekit(tmp.path())
        .args([
            "info",
            "--json",
            "-s",
            "os=Linux",
            "-s",
            "arch=x86_64",
            "-s",
            "compiler=clang",
            "-s",
            "build_type=Debug",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("-fsanitize=address"))
        .stdout(predicate::str::contains("-fsanitize=integer"));
}

// ============================================================================
// recipekit package
// ============================================================================

/// Where `recipekit` will look for build outputs for these settings.
fn build_dir(tmp: &Path) -> PathBuf {
    let ids = stdout_of(recipekit(tmp).arg("id").args(LINUX_RELEASE));
    let build_key = ids
        .lines()
        .find_map(|l| l.strip_prefix("build_id: "))
        .unwrap();
    tmp.join(".recipekit/build").join(&build_key[..16])
}

#[test]
fn test_package_from_seeded_build() {
    let tmp = project(CORE_MANIFEST, "Core");
    let lib_dir = build_dir(tmp.path()).join("lib");
    fs::create_dir_all(&lib_dir).unwrap();
    fs::write(lib_dir.join("libCore.a"), "archive").unwrap();

    let out = stdout_of(recipekit(tmp.path()).arg("package").args(LINUX_RELEASE));
    let package_dir = PathBuf::from(out.trim());

    assert!(package_dir.join("include/Core.hpp").exists());
    assert!(package_dir.join("lib/libCore.a").exists());

    let info = fs::read_to_string(package_dir.join("recipekit-info.json")).unwrap();
    assert!(info.contains("\"name\": \"Core\""));
    assert!(info.contains("lib/libCore.a"));
}

#[test]
fn test_package_without_build_fails() {
    let tmp = project(CORE_MANIFEST, "Core");

    recipekit(tmp.path())
        .arg("package")
        .args(LINUX_RELEASE)
        .assert()
        .failure()
        .stderr(predicate::str::contains("matched no files"));

    let package_root = tmp.path().join(".recipekit/package");
    let leftovers = fs::read_dir(&package_root)
        .map(|entries| entries.count())
        .unwrap_or(0);
    assert_eq!(leftovers, 0);
}

#[test]
fn test_clean_removes_package() {
    let tmp = project(CORE_MANIFEST, "Core");
    let lib_dir = build_dir(tmp.path()).join("lib");
    fs::create_dir_all(&lib_dir).unwrap();
    fs::write(lib_dir.join("libCore.a"), "archive").unwrap();

    let out = stdout_of(recipekit(tmp.path()).arg("package").args(LINUX_RELEASE));
    let package_dir = PathBuf::from(out.trim());
    assert!(package_dir.exists());

    recipekit(tmp.path())
        .arg("clean")
        .args(LINUX_RELEASE)
        .assert()
        .success();
    assert!(!package_dir.exists());
    assert!(!lib_dir.exists());
}

// ============================================================================
// recipekit import
// ============================================================================

#[test]
fn test_import_copies_runtime_files() {
    let tmp = TempDir::new().unwrap();
    let dep = tmp.path().join("dep");
    fs::create_dir_all(dep.join("lib")).unwrap();
    fs::create_dir_all(dep.join("res/Dictionary/Dictionaries")).unwrap();
    fs::write(dep.join("lib/libCore.dylib"), "").unwrap();
    fs::write(dep.join("res/Dictionary/Dictionaries/en.zzip"), "").unwrap();
    let app = tmp.path().join("app");

    recipekit(tmp.path())
        .arg("import")
        .arg("--from")
        .arg(&dep)
        .arg("--to")
        .arg(&app)
        .assert()
        .success();

    assert!(app.join("libCore.dylib").exists());
    assert!(app.join("Dictionary/Dictionaries/en.zzip").exists());
}

// ============================================================================
// errors and misc
// ============================================================================

#[test]
fn test_missing_manifest_fails() {
    let tmp = TempDir::new().unwrap();

    recipekit(tmp.path())
        .arg("flags")
        .assert()
        .failure()
        .stderr(predicate::str::contains("could not find `Recipe.toml`"));
}

#[test]
fn test_manifest_path_flag() {
    let tmp = project(CORE_MANIFEST, "Core");
    let elsewhere = TempDir::new().unwrap();

    recipekit(elsewhere.path())
        .arg("--manifest-path")
        .arg(tmp.path().join("Recipe.toml"))
        .arg("flags")
        .args(LINUX_RELEASE)
        .assert()
        .success()
        .stdout(predicate::str::contains("-DMB_PACKAGE_NAME=Core"));
}

#[test]
fn test_completions() {
    let tmp = TempDir::new().unwrap();

    recipekit(tmp.path())
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("recipekit"));
}

#[test]
fn test_completions_to_file() {
    let tmp = TempDir::new().unwrap();
    let script = tmp.path().join("share/recipekit.zsh");

    recipekit(tmp.path())
        .args(["completions", "zsh", "--output"])
        .arg(&script)
        .assert()
        .success()
        .stdout(predicate::str::is_empty());

    assert!(fs::read_to_string(&script).unwrap().contains("recipekit"));
}
