use std::fs;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use tempfile::tempdir;

#[test]
fn test_config_path_command() {
    let dir = tempdir().unwrap();

    cargo_bin_cmd!("foundee")
        .env("FOUNDEE_HOME", dir.path())
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("config.toml"));
}

#[test]
fn test_config_init_creates_file() {
    let dir = tempdir().unwrap();
    let config_path = dir.path().join("config.toml");

    cargo_bin_cmd!("foundee")
        .env("FOUNDEE_HOME", dir.path())
        .args(["config", "init"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created config at"));

    let contents = fs::read_to_string(&config_path).unwrap();
    assert!(contents.contains("api_url ="));
    assert!(contents.contains("[geolocation]"));
}

#[test]
fn test_config_init_fails_if_exists() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("config.toml"), "# existing config").unwrap();

    cargo_bin_cmd!("foundee")
        .env("FOUNDEE_HOME", dir.path())
        .args(["config", "init"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));
}

#[test]
fn test_config_show_prefers_env_api_url() {
    let dir = tempdir().unwrap();

    cargo_bin_cmd!("foundee")
        .env("FOUNDEE_HOME", dir.path())
        .env("FOUNDEE_API_URL", "https://api.foundee.example/api")
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("https://api.foundee.example/api"))
        .stdout(predicate::str::contains("session.json"));
}

#[test]
fn test_download_writes_png() {
    let dir = tempdir().unwrap();

    cargo_bin_cmd!("foundee")
        .env("FOUNDEE_HOME", dir.path())
        .env("FOUNDEE_ORIGIN", "https://foundee.example")
        .args(["codes", "download", "abc123", "--out"])
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("https://foundee.example/qr/abc123"));

    let png = fs::read(dir.path().join("foundee-qr-abc123.png")).unwrap();
    assert!(png.starts_with(b"\x89PNG"));
}

#[test]
fn test_logout_when_not_signed_in() {
    let dir = tempdir().unwrap();

    cargo_bin_cmd!("foundee")
        .env("FOUNDEE_HOME", dir.path())
        .arg("logout")
        .assert()
        .success()
        .stdout(predicate::str::contains("Not signed in."));
}

#[test]
fn test_login_requires_a_credential_flag() {
    let dir = tempdir().unwrap();

    cargo_bin_cmd!("foundee")
        .env("FOUNDEE_HOME", dir.path())
        .arg("login")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Please specify --id-token"));
}
