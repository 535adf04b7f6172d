//! CLI integration tests using assert_cmd
//!
//! These tests verify commands that only touch local state; nothing
//! here talks to the collection API.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// Get a command instance for the mirra binary
fn mirra_cmd(data_dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("mirra").expect("Failed to find mirra binary");
    cmd.arg("--data-dir").arg(data_dir.path());
    cmd
}

fn temp_dir() -> TempDir {
    TempDir::new().expect("Failed to create temp dir")
}

#[test]
fn test_help_command() {
    Command::cargo_bin("mirra")
        .expect("Failed to find mirra binary")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "addon collection mirroring across accounts",
        ));
}

#[test]
fn test_version_command() {
    Command::cargo_bin("mirra")
        .expect("Failed to find mirra binary")
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("mirra"));
}

#[test]
fn test_profile_list_empty() {
    let dir = temp_dir();
    mirra_cmd(&dir)
        .args(["profile", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No profiles registered"));
}

#[test]
fn test_profile_add_and_list() {
    let dir = temp_dir();
    mirra_cmd(&dir)
        .args(["profile", "add", "main", "--name", "Main Account"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Registered profile: main"));

    mirra_cmd(&dir)
        .args(["profile", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("main - Main Account"));
}

#[test]
fn test_duplicate_profile_fails() {
    let dir = temp_dir();
    mirra_cmd(&dir)
        .args(["profile", "add", "main"])
        .assert()
        .success();

    mirra_cmd(&dir)
        .args(["profile", "add", "main"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));
}

#[test]
fn test_profile_remove() {
    let dir = temp_dir();
    mirra_cmd(&dir)
        .args(["profile", "add", "main"])
        .assert()
        .success();

    mirra_cmd(&dir)
        .args(["profile", "remove", "main"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Removed profile: main"));

    mirra_cmd(&dir)
        .args(["profile", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No profiles registered"));
}

#[test]
fn test_mirror_add_requires_profiles() {
    let dir = temp_dir();
    mirra_cmd(&dir)
        .args(["mirror", "add", "main", "spare"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));
}

#[test]
fn test_mirror_add_and_list() {
    let dir = temp_dir();
    for name in ["main", "spare"] {
        mirra_cmd(&dir)
            .args(["profile", "add", name])
            .assert()
            .success();
    }

    mirra_cmd(&dir)
        .args(["mirror", "add", "main", "spare"])
        .assert()
        .success()
        .stdout(predicate::str::contains("'spare' now mirrors 'main'"));

    mirra_cmd(&dir)
        .args(["mirror", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("spare -> main"));
}

#[test]
fn test_mirror_cycle_rejected() {
    let dir = temp_dir();
    for name in ["main", "spare"] {
        mirra_cmd(&dir)
            .args(["profile", "add", name])
            .assert()
            .success();
    }
    mirra_cmd(&dir)
        .args(["mirror", "add", "main", "spare"])
        .assert()
        .success();

    mirra_cmd(&dir)
        .args(["mirror", "add", "spare", "main"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cycle"));
}

#[test]
fn test_mirror_protect_and_unprotect() {
    let dir = temp_dir();
    for name in ["main", "spare"] {
        mirra_cmd(&dir)
            .args(["profile", "add", name])
            .assert()
            .success();
    }

    mirra_cmd(&dir)
        .args([
            "mirror",
            "protect",
            "spare",
            "https://local.example/manifest.json",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Protected"));

    mirra_cmd(&dir)
        .args([
            "mirror",
            "unprotect",
            "spare",
            "https://local.example/manifest.json",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Unprotected"));
}

#[test]
fn test_sync_requires_master_or_all() {
    let dir = temp_dir();
    mirra_cmd(&dir)
        .arg("sync")
        .assert()
        .failure()
        .stderr(predicate::str::contains("specify a master profile or --all"));
}

#[test]
fn test_sync_all_with_no_masters() {
    let dir = temp_dir();
    mirra_cmd(&dir)
        .args(["sync", "--all"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No masters with mirrors"));
}

#[test]
fn test_clone_occurrence_requires_addon() {
    let dir = temp_dir();
    mirra_cmd(&dir)
        .args(["clone", "main", "spare", "--occurrence", "1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--addon"));
}

#[test]
fn test_backup_list_empty() {
    let dir = temp_dir();
    mirra_cmd(&dir)
        .args(["profile", "add", "main"])
        .assert()
        .success();

    mirra_cmd(&dir)
        .args(["backup", "list", "main"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No snapshots"));
}

#[test]
fn test_backup_delete_unknown_id() {
    let dir = temp_dir();
    mirra_cmd(&dir)
        .args(["backup", "delete", "00000000-0000-0000-0000-000000000000"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No such snapshot"));
}

#[test]
fn test_backup_rejects_malformed_id() {
    let dir = temp_dir();
    mirra_cmd(&dir)
        .args(["backup", "delete", "not-a-uuid"])
        .assert()
        .failure();
}
