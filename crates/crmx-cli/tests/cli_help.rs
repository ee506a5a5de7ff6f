use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;

#[test]
fn test_help_shows_all_commands() {
    cargo_bin_cmd!("crmx")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("login"))
        .stdout(predicate::str::contains("register"))
        .stdout(predicate::str::contains("logout"))
        .stdout(predicate::str::contains("whoami"))
        .stdout(predicate::str::contains("profile"))
        .stdout(predicate::str::contains("contacts"))
        .stdout(predicate::str::contains("deals"));
}

#[test]
fn test_profile_help_shows_subcommands() {
    cargo_bin_cmd!("crmx")
        .args(["profile", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("show"))
        .stdout(predicate::str::contains("update"))
        .stdout(predicate::str::contains("refresh"))
        .stdout(predicate::str::contains("change-password"));
}

#[test]
fn test_deals_help_shows_subcommands() {
    cargo_bin_cmd!("crmx")
        .args(["deals", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("list"))
        .stdout(predicate::str::contains("create"))
        .stdout(predicate::str::contains("paid"))
        .stdout(predicate::str::contains("task"));
}

#[test]
fn test_version_flag() {
    cargo_bin_cmd!("crmx")
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("1.0"));
}
