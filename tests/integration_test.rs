use assert_cmd::Command;
use assert_cmd::cargo;
use flate2::Compression;
use flate2::write::GzEncoder;
use predicates::prelude::*;
use std::fs;
use std::io::prelude::*;
use std::path::Path;
use tar::Builder;
use tempfile::{TempDir, tempdir};

fn create_tar_gz(files: &[(&str, &str)]) -> Vec<u8> {
    let mut tar_builder = Builder::new(Vec::new());
    for (name, content) in files {
        let mut header = tar::Header::new_gnu();
        header.set_size(content.len() as u64);
        header.set_path(name).unwrap();
        header.set_mode(0o644);
        header.set_cksum();
        tar_builder.append(&header, content.as_bytes()).unwrap();
    }
    let tar = tar_builder.into_inner().unwrap();

    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&tar).unwrap();
    encoder.finish().unwrap()
}

/// Write `<root>/<name>/<version>/package.json` plus any extra files.
fn write_package(root: &Path, descriptor: &str, files: &[(&str, &str)]) {
    let value: serde_json::Value = serde_json::from_str(descriptor).unwrap();
    let dir = root
        .join(value["name"].as_str().unwrap())
        .join(value["version"].as_str().unwrap());
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("package.json"), descriptor).unwrap();
    for (name, content) in files {
        let path = dir.join(name);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }
}

/// A `pkgman` command isolated from the user's home, config and environment.
fn pkgman(home: &TempDir) -> Command {
    let mut cmd = Command::new(cargo::cargo_bin!("pkgman"));
    cmd.env("HOME", home.path())
        .env("XDG_CONFIG_HOME", home.path().join("config"))
        .env_remove("PKGMAN_AVAILABLE")
        .env_remove("PKGMAN_INSTALLED")
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_end_to_end_install_from_archive() {
    let dir = tempdir().unwrap();
    let archive = dir.path().join("repo.tar.gz");
    let installed = dir.path().join("installed");
    fs::write(
        &archive,
        create_tar_gz(&[
            (
                "app/1.0/package.json",
                r#"{"name":"app","version":"1.0","dependencies":["lib"]}"#,
            ),
            ("app/1.0/bin/app", "#!/bin/sh\necho app\n"),
            ("lib/2/package.json", r#"{"name":"lib","version":"2"}"#),
            ("lib/2/lib.txt", "library"),
        ]),
    )
    .unwrap();

    pkgman(&dir)
        .arg("--available")
        .arg(&archive)
        .arg("--installed")
        .arg(&installed)
        .args(["install", "app"])
        .assert()
        .success()
        .stdout("Installed app:1.0\nInstalled lib:2\n");

    assert_eq!(
        fs::read_to_string(installed.join("app/1.0/bin/app")).unwrap(),
        "#!/bin/sh\necho app\n"
    );
    assert!(installed.join("lib/2/lib.txt").exists());
    assert!(installed.join("lib/2/package.json").exists());

    pkgman(&dir)
        .arg("--installed")
        .arg(&installed)
        .arg("list")
        .assert()
        .success()
        .stdout("app:1.0\nlib:2\n");

    pkgman(&dir)
        .arg("--available")
        .arg(&archive)
        .arg("--installed")
        .arg(&installed)
        .args(["install", "app:1.0"])
        .assert()
        .success()
        .stdout("app:1.0 is already installed.\n");

    pkgman(&dir)
        .arg("--installed")
        .arg(&installed)
        .args(["uninstall", "app"])
        .assert()
        .success()
        .stdout("Uninstalled app:1.0\n");

    assert!(!installed.join("app").exists());

    pkgman(&dir)
        .arg("--installed")
        .arg(&installed)
        .arg("list")
        .assert()
        .success()
        .stdout("lib:2\n");
}

#[test]
fn test_changes_and_update_from_directory() {
    let dir = tempdir().unwrap();
    let available = dir.path().join("available");
    let installed = dir.path().join("installed");
    write_package(&available, r#"{"name":"foo","version":"1.0"}"#, &[]);

    pkgman(&dir)
        .arg("-a")
        .arg(&available)
        .arg("-i")
        .arg(&installed)
        .args(["install", "foo"])
        .assert()
        .success();

    write_package(
        &available,
        r#"{"name":"foo","version":"2.0"}"#,
        &[("NEWS", "second release")],
    );

    pkgman(&dir)
        .arg("-a")
        .arg(&available)
        .arg("-i")
        .arg(&installed)
        .arg("changes")
        .assert()
        .success()
        .stdout("replace foo:1.0 with foo:2.0\n");

    pkgman(&dir)
        .arg("-a")
        .arg(&available)
        .arg("-i")
        .arg(&installed)
        .arg("update")
        .assert()
        .success()
        .stdout("replace foo:1.0 with foo:2.0\n");

    assert!(!installed.join("foo/1.0").exists());
    assert!(installed.join("foo/2.0/NEWS").exists());

    pkgman(&dir)
        .arg("-a")
        .arg(&available)
        .arg("-i")
        .arg(&installed)
        .arg("changes")
        .assert()
        .success()
        .stdout("No changes.\n");
}

#[test]
fn test_targets_filter_dependencies() {
    let dir = tempdir().unwrap();
    let available = dir.path().join("available");
    let installed = dir.path().join("installed");
    write_package(
        &available,
        r#"{"name":"app","version":"1","dependencies":["db@server","ui@client"]}"#,
        &[],
    );
    write_package(&available, r#"{"name":"db","version":"5"}"#, &[]);
    write_package(&available, r#"{"name":"ui","version":"3"}"#, &[]);

    pkgman(&dir)
        .arg("--available")
        .arg(&available)
        .arg("--installed")
        .arg(&installed)
        .args(["--target", "client", "install", "app"])
        .assert()
        .success()
        .stdout("Installed app:1\nInstalled ui:3\n");

    assert!(!installed.join("db").exists());
}

#[test]
fn test_environment_and_config_file() {
    let dir = tempdir().unwrap();
    let available = dir.path().join("available");
    let installed = dir.path().join("from-env");
    write_package(&available, r#"{"name":"tool","version":"0.1"}"#, &[]);

    let config = dir.path().join("pkgman.json");
    fs::write(
        &config,
        serde_json::json!({
            "available": [available],
            "installed": dir.path().join("from-config"),
        })
        .to_string(),
    )
    .unwrap();

    pkgman(&dir)
        .arg("--config")
        .arg(&config)
        .env("PKGMAN_INSTALLED", &installed)
        .args(["install", "tool"])
        .assert()
        .success()
        .stdout("Installed tool:0.1\n");

    assert!(installed.join("tool/0.1/package.json").exists());
    assert!(!dir.path().join("from-config").exists());
}

#[test]
fn test_closure_lists_installed_dependencies() {
    let dir = tempdir().unwrap();
    let installed = dir.path().join("installed");
    write_package(
        &installed,
        r#"{"name":"app","version":"1","dependencies":["lib:2"]}"#,
        &[],
    );
    write_package(&installed, r#"{"name":"lib","version":"2"}"#, &[]);

    pkgman(&dir)
        .arg("--installed")
        .arg(&installed)
        .arg("closure")
        .assert()
        .success()
        .stdout(predicate::str::starts_with("app:1"))
        .stdout(predicate::str::contains("lib:2"));
}

#[test]
fn test_closure_conflict_fails() {
    let dir = tempdir().unwrap();
    let available = dir.path().join("available");
    write_package(
        &available,
        r#"{"name":"app","version":"1","dependencies":["lib:1","tool"]}"#,
        &[],
    );
    write_package(
        &available,
        r#"{"name":"tool","version":"1","dependencies":["lib:2"]}"#,
        &[],
    );
    write_package(&available, r#"{"name":"lib","version":"1"}"#, &[]);
    write_package(&available, r#"{"name":"lib","version":"2"}"#, &[]);

    pkgman(&dir)
        .arg("--available")
        .arg(&available)
        .arg("--installed")
        .arg(dir.path().join("installed"))
        .args(["closure", "app"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("lib"));
}

#[test]
fn test_install_unknown_package_fails() {
    let dir = tempdir().unwrap();
    let available = dir.path().join("available");
    fs::create_dir_all(&available).unwrap();

    pkgman(&dir)
        .arg("--available")
        .arg(&available)
        .arg("--installed")
        .arg(dir.path().join("installed"))
        .args(["install", "ghost:1.0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("ghost:1.0"));
}

#[test]
fn test_invalid_identifier_fails() {
    let dir = tempdir().unwrap();

    pkgman(&dir)
        .arg("--installed")
        .arg(dir.path().join("installed"))
        .args(["uninstall", "a:b:c"])
        .assert()
        .failure();
}
