//! Smoke tests for the binary's argument surface and store handling.

use assert_cmd::Command;
use predicates::prelude::*;

fn scaleway_machine() -> Command {
    Command::cargo_bin("scaleway-machine").unwrap_or_else(|err| panic!("binary: {err}"))
}

#[test]
fn help_lists_the_lifecycle_subcommands() {
    scaleway_machine()
        .arg("--help")
        .assert()
        .success()
        .stdout(
            predicate::str::contains("create")
                .and(predicate::str::contains("status"))
                .and(predicate::str::contains("ssh-hostname")),
        );
}

#[test]
fn create_help_lists_the_driver_flags() {
    scaleway_machine()
        .args(["create", "--help"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("--scaleway-organization")
                .and(predicate::str::contains("--scaleway-token"))
                .and(predicate::str::contains("--scaleway-reserved-ip-id"))
                .and(predicate::str::contains("SCALEWAY_ORGANIZATION")),
        );
}

#[test]
fn status_of_an_unknown_machine_fails_cleanly() {
    let temp = tempfile::tempdir().unwrap_or_else(|err| panic!("tempdir: {err}"));
    let store = temp
        .path()
        .to_str()
        .unwrap_or_else(|| panic!("non-utf8 temp dir"));

    scaleway_machine()
        .args(["--store-path", store, "--name", "ghost", "status"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("does not exist"));
}
