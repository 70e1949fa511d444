use assert_cmd::Command;
use assert_cmd::cargo;
use pkgshare::commands::{self, Options};
use pkgshare::config::{BuildMode, DirectoryConfig, EnvOverrides, ProjectManifest, ledger_path};
use pkgshare::host::{InstalledRepository, Installer};
use pkgshare::installer::{ConfirmPolicy, SharedOperations, UninstallOutcome};
use pkgshare::package::{Package, PackageId};
use pkgshare::runtime::RealRuntime;
use pkgshare::store::{JsonUsageLedger, UsageLedger};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::tempdir;

const SHARED_STORE: &str = r#"{ "vendor-dir": "../store", "build-dir": "build/dev" }"#;

fn project(root: &Path, name: &str, manifest: &str) -> PathBuf {
    let dir = root.join(name);
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("pkgshare.json"), manifest).unwrap();
    dir
}

/// Write a distribution under `dist/<label>` and a descriptor pointing at it.
fn descriptor(
    root: &Path,
    label: &str,
    name: &str,
    version: &str,
    files: &[(&str, &str)],
) -> PathBuf {
    write_descriptor(
        root,
        label,
        serde_json::json!({ "name": name, "version": version }),
        files,
    )
}

fn write_descriptor(
    root: &Path,
    label: &str,
    mut json: serde_json::Value,
    files: &[(&str, &str)],
) -> PathBuf {
    let dist = root.join("dist").join(label);
    for (file, content) in files {
        let path = dist.join(file);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    let packages = root.join("packages");
    fs::create_dir_all(&packages).unwrap();
    let path = packages.join(format!("{}.json", label));
    json["dist"] = serde_json::Value::String(format!("../dist/{}", label));
    fs::write(&path, json.to_string()).unwrap();
    path
}

fn usage(project_dir: &Path, id: &PackageId) -> BTreeSet<String> {
    let config = DirectoryConfig::load(&RealRuntime, project_dir, BuildMode::Dev).unwrap();
    let runtime = RealRuntime;
    let ledger = JsonUsageLedger::new(&runtime, ledger_path(&config.store_dir));
    ledger.get_usage(id).unwrap()
}

fn project_id(project_dir: &Path) -> String {
    DirectoryConfig::load(&RealRuntime, project_dir, BuildMode::Dev)
        .unwrap()
        .project_id
}

fn assume_yes(project_dir: &Path) -> Options {
    Options::new(project_dir).with_confirm(ConfirmPolicy::AssumeYes)
}

#[test_log::test]
#[cfg_attr(pkgshare_skip_cross_windows_tests, ignore)]
fn test_two_projects_share_one_source() {
    let dir = tempdir().unwrap();
    let root = dir.path();
    let app_a = project(root, "a", SHARED_STORE);
    let app_b = project(root, "b", SHARED_STORE);
    let lib = descriptor(root, "lib-1.0.0", "acme/lib", "1.0.0", &[("src/lib.php", "v1")]);
    let id = PackageId::new("acme/lib", "1.0.0");

    let source = root.join("store/acme/lib-1.0.0");
    let link_a = app_a.join("build/store/acme/lib");
    let link_b = app_b.join("build/store/acme/lib");

    // First project copies the source and links it
    commands::install(RealRuntime, &assume_yes(&app_a), &[lib.clone()]).unwrap();
    assert_eq!(
        fs::read_to_string(source.join("src/lib.php")).unwrap(),
        "v1"
    );
    assert!(link_a.is_symlink());
    assert_eq!(
        fs::read_to_string(link_a.join("src/lib.php")).unwrap(),
        "v1"
    );
    assert_eq!(usage(&app_a, &id), BTreeSet::from([project_id(&app_a)]));

    // Second project reuses the populated source
    fs::write(source.join("marker"), "kept").unwrap();
    commands::install(RealRuntime, &assume_yes(&app_b), &[lib.clone()]).unwrap();
    assert_eq!(fs::read_to_string(source.join("marker")).unwrap(), "kept");
    assert!(link_b.is_symlink());
    assert_eq!(
        usage(&app_a, &id),
        BTreeSet::from([project_id(&app_a), project_id(&app_b)])
    );

    // Source survives while another project uses it, even with --yes
    commands::uninstall(RealRuntime, &assume_yes(&app_a), &[lib.clone()]).unwrap();
    assert!(source.join("src/lib.php").exists());
    assert!(!link_a.exists() && !link_a.is_symlink());
    assert!(link_b.is_symlink());
    assert_eq!(usage(&app_b, &id), BTreeSet::from([project_id(&app_b)]));

    // Last user deletes it
    commands::uninstall(RealRuntime, &assume_yes(&app_b), &[lib]).unwrap();
    assert!(!source.exists());
    assert!(!link_b.is_symlink());
    assert!(usage(&app_b, &id).is_empty());
}

#[test]
#[cfg_attr(pkgshare_skip_cross_windows_tests, ignore)]
fn test_last_user_declining_keeps_source() {
    let dir = tempdir().unwrap();
    let root = dir.path();
    let app = project(root, "a", SHARED_STORE);
    let lib = descriptor(root, "lib-1.0.0", "acme/lib", "1.0.0", &[("a.txt", "a")]);

    commands::install(RealRuntime, &assume_yes(&app), &[lib.clone()]).unwrap();
    commands::uninstall(
        RealRuntime,
        &Options::new(&app).with_confirm(ConfirmPolicy::AssumeNo),
        &[lib],
    )
    .unwrap();

    assert!(root.join("store/acme/lib-1.0.0/a.txt").exists());
    assert!(!app.join("build/store/acme/lib").is_symlink());
    assert!(usage(&app, &PackageId::new("acme/lib", "1.0.0")).is_empty());
}

#[test_log::test]
#[cfg_attr(pkgshare_skip_cross_windows_tests, ignore)]
fn test_same_slot_update_is_in_place() {
    let dir = tempdir().unwrap();
    let root = dir.path();
    let app = project(root, "a", SHARED_STORE);
    let before = descriptor(root, "lib-old", "acme/lib", "dev-main", &[("a.txt", "old")]);
    let after = descriptor(root, "lib-new", "acme/lib", "dev-main", &[("a.txt", "new")]);
    let id = PackageId::new("acme/lib", "dev-main");

    commands::install(RealRuntime, &assume_yes(&app), &[before.clone()]).unwrap();
    commands::update(RealRuntime, &assume_yes(&app), &before, &after).unwrap();

    let link = app.join("build/store/acme/lib");
    assert!(link.is_symlink());
    assert_eq!(fs::read_to_string(link.join("a.txt")).unwrap(), "new");
    assert_eq!(usage(&app, &id), BTreeSet::from([project_id(&app)]));
}

#[test]
#[cfg_attr(pkgshare_skip_cross_windows_tests, ignore)]
fn test_version_update_moves_to_new_slot() {
    let dir = tempdir().unwrap();
    let root = dir.path();
    let app = project(root, "a", SHARED_STORE);
    let v1 = descriptor(root, "lib-1", "acme/lib", "1.0.0", &[("a.txt", "1")]);
    let v2 = descriptor(root, "lib-2", "acme/lib", "2.0.0", &[("a.txt", "2")]);

    commands::install(RealRuntime, &assume_yes(&app), &[v1.clone()]).unwrap();
    commands::update(RealRuntime, &assume_yes(&app), &v1, &v2).unwrap();

    assert!(!root.join("store/acme/lib-1.0.0").exists());
    assert!(root.join("store/acme/lib-2.0.0/a.txt").exists());
    assert_eq!(
        fs::read_to_string(app.join("build/store/acme/lib/a.txt")).unwrap(),
        "2"
    );
    assert!(usage(&app, &PackageId::new("acme/lib", "1.0.0")).is_empty());
    assert_eq!(
        usage(&app, &PackageId::new("acme/lib", "2.0.0")),
        BTreeSet::from([project_id(&app)])
    );
}

/// Resolve a project whose name-only slots go to `shared`, as with `PKGSHARE_VENDOR_DIR`.
fn shared_vendor_config(project_dir: &Path, shared: &Path) -> DirectoryConfig {
    DirectoryConfig::from_manifest(
        &ProjectManifest::parse(r#"{ "build-dir": "build" }"#).unwrap(),
        project_dir,
        BuildMode::Dev,
        &EnvOverrides {
            vendor_dir: Some(shared.to_string_lossy().into_owned()),
            ..EnvOverrides::default()
        },
        None,
    )
    .unwrap()
}

fn tool_descriptor(root: &Path) -> PathBuf {
    write_descriptor(
        root,
        "tool-1.0.0",
        serde_json::json!({ "name": "acme/tool", "version": "1.0.0", "bin": ["bin/tool"] }),
        &[("bin/tool", "#!/bin/sh\n")],
    )
}

#[test_log::test]
#[cfg_attr(pkgshare_skip_cross_windows_tests, ignore)]
fn test_executable_shared_through_vendor_override() {
    let dir = tempdir().unwrap();
    let root = dir.path();
    let shared = root.join("shared");
    let app_a = project(root, "a", "{}");
    let app_b = project(root, "b", "{}");
    let tool = Package::load(&RealRuntime, &tool_descriptor(root)).unwrap();

    let runtime = RealRuntime;
    let config_a = shared_vendor_config(&app_a, &shared);
    let config_b = shared_vendor_config(&app_b, &shared);
    let router_a = commands::router(&runtime, &config_a, ConfirmPolicy::AssumeYes);
    let router_b = commands::router(&runtime, &config_b, ConfirmPolicy::AssumeYes);
    let mut repo_a =
        InstalledRepository::new(InstalledRepository::default_path(&config_a.build.vendor));
    let mut repo_b =
        InstalledRepository::new(InstalledRepository::default_path(&config_b.build.vendor));

    let source = shared.join("acme/tool");
    assert_eq!(router_a.install_path(&tool), source);

    router_a.install(&mut repo_a, &tool).unwrap();
    router_b.install(&mut repo_b, &tool).unwrap();
    assert!(source.join("bin/tool").exists());
    assert!(app_b.join("build/vendor/bin/tool").is_symlink());

    // One ledger next to the slot counts both projects
    let ledger = JsonUsageLedger::new(&runtime, ledger_path(&shared));
    assert_eq!(
        ledger.get_usage(&tool.id()).unwrap(),
        BTreeSet::from([config_a.project_id.clone(), config_b.project_id.clone()])
    );
    assert!(!ledger_path(&config_a.store_dir).exists());

    let outcome = router_a.shared().uninstall(&mut repo_a, &tool).unwrap();
    assert_eq!(outcome, UninstallOutcome::SourceRetained);
    assert!(source.join("bin/tool").exists());
    assert!(!app_a.join("build/vendor/bin/tool").is_symlink());
    assert!(router_b.is_installed(&repo_b, &tool));

    let outcome = router_b.shared().uninstall(&mut repo_b, &tool).unwrap();
    assert_eq!(outcome, UninstallOutcome::SourceDeleted);
    assert!(!source.exists());
    assert!(ledger.get_usage(&tool.id()).unwrap().is_empty());
}

#[test]
#[cfg_attr(pkgshare_skip_cross_windows_tests, ignore)]
fn test_cli_vendor_override_keeps_source_for_other_project() {
    let dir = tempdir().unwrap();
    let root = dir.path();
    let shared = root.join("shared");
    let app_a = project(root, "a", r#"{ "build-dir": "build" }"#);
    let app_b = project(root, "b", r#"{ "build-dir": "build" }"#);
    let tool = tool_descriptor(root);

    let run = |project: &Path, args: &[&str]| {
        Command::new(cargo::cargo_bin!("pkgshare"))
            .env("PKGSHARE_VENDOR_DIR", &shared)
            .env_remove("PKGSHARE_SYMLINK_BASE_PATH")
            .arg("--project")
            .arg(project)
            .args(args)
            .arg(&tool)
            .assert()
            .success();
    };

    run(&app_a, &["install"]);
    run(&app_b, &["install"]);
    run(&app_a, &["--yes", "uninstall"]);
    assert!(shared.join("acme/tool/bin/tool").exists());

    run(&app_b, &["--yes", "uninstall"]);
    assert!(!shared.join("acme/tool").exists());
}

#[test]
fn test_cli_paths() {
    let dir = tempdir().unwrap();
    let app = project(dir.path(), "a", SHARED_STORE);

    Command::new(cargo::cargo_bin!("pkgshare"))
        .env_remove("PKGSHARE_VENDOR_DIR")
        .env_remove("PKGSHARE_SYMLINK_BASE_PATH")
        .arg("--project")
        .arg(&app)
        .arg("paths")
        .assert()
        .success()
        .stdout(predicates::str::contains("store:"))
        .stdout(predicates::str::contains("shared vendor:"));
}

#[test]
fn test_cli_rejects_invalid_manifest() {
    let dir = tempdir().unwrap();
    let app = project(dir.path(), "a", r#"{ "vendor-directory": "lib" }"#);

    Command::new(cargo::cargo_bin!("pkgshare"))
        .arg("--project")
        .arg(&app)
        .arg("paths")
        .assert()
        .failure()
        .stderr(predicates::str::contains("Failed to load the configuration"));
}

#[test]
#[cfg_attr(pkgshare_skip_cross_windows_tests, ignore)]
fn test_cli_install_and_usage() {
    let dir = tempdir().unwrap();
    let root = dir.path();
    let app = project(root, "a", SHARED_STORE);
    let lib = descriptor(root, "lib-1.0.0", "acme/lib", "1.0.0", &[("a.txt", "a")]);

    Command::new(cargo::cargo_bin!("pkgshare"))
        .env_remove("PKGSHARE_VENDOR_DIR")
        .env_remove("PKGSHARE_SYMLINK_BASE_PATH")
        .arg("--project")
        .arg(&app)
        .arg("install")
        .arg(&lib)
        .assert()
        .success()
        .stdout(predicates::str::contains("Installed acme/lib (1.0.0) (shared)"));

    Command::new(cargo::cargo_bin!("pkgshare"))
        .env_remove("PKGSHARE_VENDOR_DIR")
        .arg("--project")
        .arg(&app)
        .arg("usage")
        .assert()
        .success()
        .stdout(predicates::str::contains("acme/lib (1.0.0)"))
        .stdout(predicates::str::contains(project_id(&app)));
}

#[test]
fn test_cli_usage_without_ledger() {
    let dir = tempdir().unwrap();
    let app = project(dir.path(), "a", SHARED_STORE);

    Command::new(cargo::cargo_bin!("pkgshare"))
        .env_remove("PKGSHARE_VENDOR_DIR")
        .arg("--project")
        .arg(&app)
        .arg("usage")
        .assert()
        .success()
        .stdout(predicates::str::contains("No shared packages in use."));
}

#[test]
fn test_cli_uninstall_unknown_package_fails() {
    let dir = tempdir().unwrap();
    let root = dir.path();
    let app = project(root, "a", SHARED_STORE);
    let lib = descriptor(root, "lib-1.0.0", "acme/lib", "1.0.0", &[("a.txt", "a")]);

    Command::new(cargo::cargo_bin!("pkgshare"))
        .env_remove("PKGSHARE_VENDOR_DIR")
        .arg("--project")
        .arg(&app)
        .arg("--no-interaction")
        .arg("uninstall")
        .arg(&lib)
        .assert()
        .failure()
        .stderr(predicates::str::contains("not installed"));
}
