// Drives the binary end to end. Outside the unix-only tests at the bottom no entry is flagged
// for patching, so the fake resource editor is only located, not executed.
use assert_cmd::Command;
use predicates::prelude::*;
use std::{fs, path::Path};

const CONFIG: &str = r#"
assembly_folder = 'External/acme.qt'
override_manifest = 'qtoverride.dll.manifest'
qt_bin_path = 'qt/bin'

[assembly]
name = "acme.qt"

[sdk]
bin_path = 'kits'
version_prefix = "10."
tool = 'x64/mt.exe'

[[dlls]]
path = "Qt5Core.dll"
add_in_assembly = true

[[dlls]]
path = "Qt5Gui.dll"
add_in_assembly = true

[[dlls]]
path = "../plugins/platforms/qwindows.dll"
"#;

fn workspace() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();

    fs::create_dir_all(root.join("kits/10.0.19041.0/x64")).unwrap();
    fs::write(root.join("kits/10.0.19041.0/x64/mt.exe"), b"").unwrap();
    fs::create_dir_all(root.join("qt/bin")).unwrap();
    fs::create_dir_all(root.join("qt/plugins/platforms")).unwrap();
    for name in ["Qt5Core", "Qt5Gui", "Qt5Cored", "Qt5Guid"] {
        fs::write(root.join(format!("qt/bin/{name}.dll")), name).unwrap();
    }
    fs::write(root.join("qt/plugins/platforms/qwindows.dll"), "qwindows").unwrap();
    fs::write(root.join("qt/plugins/platforms/qwindowsd.dll"), "qwindowsd").unwrap();
    fs::write(root.join("qtoverride.dll.manifest"), "<assembly/>").unwrap();
    fs::write(root.join("sxspack.toml"), CONFIG).unwrap();

    dir
}

fn sxspack(root: &Path) -> Command {
    let mut cmd = Command::cargo_bin("sxspack").unwrap();
    cmd.current_dir(root).env_remove("RUST_LOG");
    cmd
}

fn listing(dir: &Path) -> Vec<(String, String)> {
    let mut files: Vec<_> = fs::read_dir(dir)
        .unwrap()
        .map(|entry| {
            let entry = entry.unwrap();
            (
                entry.file_name().to_string_lossy().into_owned(),
                fs::read_to_string(entry.path()).unwrap(),
            )
        })
        .collect();
    files.sort();
    files
}

#[test]
fn deploy_builds_the_private_assembly() {
    let dir = workspace();
    let folder = dir.path().join("External/acme.qt");

    sxspack(dir.path())
        .arg("deploy")
        .assert()
        .success()
        .stdout(predicate::str::contains("Qt5Core.dll").and(predicate::str::contains("qwindows.dll")));

    let manifest = fs::read_to_string(folder.join("acme.qt.manifest")).unwrap();
    assert!(manifest.contains(r#"name="acme.qt" version="1.0.0.0" processorArchitecture="amd64""#));
    let core = manifest.find(r#"<file name="Qt5Core.dll" />"#).unwrap();
    let gui = manifest.find(r#"<file name="Qt5Gui.dll" />"#).unwrap();
    assert!(core < gui);
    assert!(!manifest.contains("qwindows.dll"));
    assert_eq!(fs::read_to_string(folder.join("qwindows.dll")).unwrap(), "qwindows");
}

#[test]
fn deploy_twice_yields_the_same_folder() {
    let dir = workspace();
    let folder = dir.path().join("External/acme.qt");

    sxspack(dir.path()).arg("deploy").assert().success();
    let first = listing(&folder);

    fs::write(folder.join("leftover.dll"), "old").unwrap();
    sxspack(dir.path()).arg("deploy").assert().success();

    assert_eq!(listing(&folder), first);
}

#[test]
fn debug_flag_ships_debug_builds() {
    let dir = workspace();

    sxspack(dir.path())
        .args(["deploy", "--debug-dlls"])
        .assert()
        .success();

    let manifest = fs::read_to_string(dir.path().join("External/acme.qt/acme.qt.manifest")).unwrap();
    assert!(manifest.contains(r#"<file name="Qt5Cored.dll" />"#));
    assert!(dir.path().join("External/acme.qt/qwindowsd.dll").is_file());
}

#[test]
fn missing_override_manifest_exits_1_and_keeps_folder() {
    let dir = workspace();
    fs::remove_file(dir.path().join("qtoverride.dll.manifest")).unwrap();
    fs::create_dir_all(dir.path().join("External/acme.qt")).unwrap();
    fs::write(dir.path().join("External/acme.qt/keep.txt"), "keep").unwrap();

    sxspack(dir.path())
        .arg("deploy")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("qtoverride.dll.manifest"));

    assert!(dir.path().join("External/acme.qt/keep.txt").is_file());
}

#[test]
fn missing_resource_editor_exits_1() {
    let dir = workspace();
    fs::remove_dir_all(dir.path().join("kits")).unwrap();

    sxspack(dir.path())
        .arg("deploy")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("mt.exe"));

    assert!(!dir.path().join("External").exists());
}

#[test]
fn missing_qt_dir_exits_1() {
    let dir = workspace();

    sxspack(dir.path())
        .args(["deploy", "--qt-bin", "nowhere/bin"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("nowhere"));

    assert!(!dir.path().join("External").exists());
}

#[test]
fn output_flag_redirects_the_assembly_folder() {
    let dir = workspace();

    sxspack(dir.path())
        .args(["deploy", "--output", "out/acme.qt"])
        .assert()
        .success();

    assert!(dir.path().join("out/acme.qt/acme.qt.manifest").is_file());
    assert!(!dir.path().join("External").exists());
}

#[test]
fn plan_lists_copies_without_writing() {
    let dir = workspace();

    sxspack(dir.path())
        .args(["plan", "--debug-dlls"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("Qt5Guid.dll")
                .and(predicate::str::contains("[manifest]"))
                .and(predicate::str::contains("acme.qt.manifest")),
        );

    assert!(!dir.path().join("External").exists());
}

#[test]
fn locate_reports_the_newest_sdk() {
    let dir = workspace();
    fs::create_dir_all(dir.path().join("kits/10.0.22621.0/x64")).unwrap();
    fs::write(dir.path().join("kits/10.0.22621.0/x64/mt.exe"), b"").unwrap();

    sxspack(dir.path())
        .arg("locate")
        .assert()
        .success()
        .stdout(predicate::str::contains("10.0.22621.0"));
}

#[test]
fn explicit_config_must_exist() {
    let dir = workspace();

    sxspack(dir.path())
        .args(["--config", "missing.toml", "plan"])
        .assert()
        .code(1);
}

/// Same layout as [`CONFIG`], with the second and third entries flagged for patching.
#[cfg(unix)]
const PATCHING_CONFIG: &str = r#"
assembly_folder = 'External/acme.qt'
override_manifest = 'qtoverride.dll.manifest'
qt_bin_path = 'qt/bin'

[assembly]
name = "acme.qt"

[sdk]
bin_path = 'kits'

[[dlls]]
path = "Qt5Core.dll"
add_in_assembly = true

[[dlls]]
path = "Qt5Gui.dll"
add_in_assembly = true
patch_with_manifest = true

[[dlls]]
path = "../plugins/platforms/qwindows.dll"
patch_with_manifest = true
"#;

/// Replaces the fake `mt.exe` with a script that logs its argv to `calls.log` and exits
/// with `status`.
#[cfg(unix)]
fn scripted_resource_editor(root: &Path, status: i32) {
    use std::os::unix::fs::PermissionsExt;

    let tool = root.join("kits/10.0.19041.0/x64/mt.exe");
    fs::write(
        &tool,
        format!("#!/bin/sh\necho \"$*\" >> calls.log\nexit {status}\n"),
    )
    .unwrap();
    fs::set_permissions(&tool, fs::Permissions::from_mode(0o755)).unwrap();
    fs::write(root.join("sxspack.toml"), PATCHING_CONFIG).unwrap();
}

#[cfg(unix)]
#[test]
fn deploy_embeds_override_manifest_into_flagged_entries() {
    let dir = workspace();
    scripted_resource_editor(dir.path(), 0);

    sxspack(dir.path()).arg("deploy").assert().success();

    let calls = fs::read_to_string(dir.path().join("calls.log")).unwrap();
    assert_eq!(
        calls.lines().collect::<Vec<_>>(),
        vec![
            "-manifest qtoverride.dll.manifest -outputresource:External/acme.qt/Qt5Gui.dll;#2",
            "-manifest qtoverride.dll.manifest -outputresource:External/acme.qt/qwindows.dll;#2",
        ]
    );
    assert!(dir.path().join("External/acme.qt/acme.qt.manifest").is_file());
}

#[cfg(unix)]
#[test]
fn failing_resource_editor_exits_1() {
    let dir = workspace();
    scripted_resource_editor(dir.path(), 3);

    sxspack(dir.path())
        .arg("deploy")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("resource editor failed"));

    let calls = fs::read_to_string(dir.path().join("calls.log")).unwrap();
    assert_eq!(calls.lines().count(), 1);
    assert!(!dir.path().join("External/acme.qt/qwindows.dll").exists());
}
