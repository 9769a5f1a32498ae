use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;

#[test]
fn test_help_shows_all_commands() {
    cargo_bin_cmd!("foundee")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("login"))
        .stdout(predicate::str::contains("codes"))
        .stdout(predicate::str::contains("scan"))
        .stdout(predicate::str::contains("view"))
        .stdout(predicate::str::contains("edit"));
}

#[test]
fn test_codes_help_shows_subcommands() {
    cargo_bin_cmd!("foundee")
        .args(["codes", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("list"))
        .stdout(predicate::str::contains("create"))
        .stdout(predicate::str::contains("download"));
}

#[test]
fn test_scan_requires_a_source() {
    cargo_bin_cmd!("foundee")
        .arg("scan")
        .assert()
        .failure()
        .stderr(predicate::str::contains("--image"));
}

#[test]
fn test_version_flag() {
    cargo_bin_cmd!("foundee")
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("0.1"));
}
