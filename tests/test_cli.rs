mod common;

use arbor::error::exit_codes;
use assert_cmd::Command;
use common::init_repo;
use filetime::{set_file_mtime, FileTime};
use predicates::prelude::*;
use std::path::Path;
use tempfile::TempDir;

/// `arbor` with its global config isolated under `home`.
fn arbor(home: &Path, cwd: &Path) -> Command {
    let mut cmd = Command::cargo_bin("arbor").unwrap();
    cmd.current_dir(cwd)
        .env("XDG_CONFIG_HOME", home.join("config"));
    cmd
}

#[test]
fn test_help_lists_commands() {
    let temp = TempDir::new().unwrap();
    arbor(temp.path(), temp.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("work"))
        .stdout(predicate::str::contains("prune"));
}

#[test]
fn test_usage_error_exits_2() {
    let temp = TempDir::new().unwrap();
    arbor(temp.path(), temp.path())
        .args(["list", "--sort", "color"])
        .assert()
        .code(exit_codes::INVALID_ARGS);
}

#[test]
fn test_outside_a_project_exits_3() {
    let temp = TempDir::new().unwrap();
    arbor(temp.path(), temp.path())
        .arg("list")
        .assert()
        .code(exit_codes::WORKTREE_NOT_FOUND)
        .stderr(predicate::str::contains("not inside an Arbor project"));
}

#[test]
fn test_project_add_then_list() {
    let temp = TempDir::new().unwrap();
    std::fs::create_dir_all(temp.path().join("shop")).unwrap();

    arbor(temp.path(), temp.path())
        .args(["project", "add", "shop", "shop", "--preset", "laravel"])
        .assert()
        .success();
    assert!(temp.path().join("config/arbor").is_dir());

    arbor(temp.path(), temp.path())
        .args(["project", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("shop\t"));

    arbor(temp.path(), temp.path())
        .args(["project", "add", "shop", "shop"])
        .assert()
        .code(exit_codes::CONFIG);
}

#[test]
fn test_init_work_list_remove() {
    let temp = TempDir::new().unwrap();
    let root = temp.path().canonicalize().unwrap();
    init_repo(&root.join("origin"));

    arbor(&root, &root)
        .args(["init", "origin", "shop", "--no-scaffold"])
        .assert()
        .success();
    let main = root.join("shop/main");
    assert!(main.join("README.md").is_file());

    for branch in ["feature/a", "feature/b"] {
        arbor(&root, &main)
            .args(["work", branch])
            .assert()
            .success()
            .stdout(predicate::str::contains(branch));
    }
    assert!(root.join("shop/feature-a").is_dir());

    let mtimes = [
        ("feature-b", 1_600_000_000),
        ("main", 1_650_000_000),
        ("feature-a", 1_700_000_000),
    ];
    for (dir, secs) in mtimes {
        set_file_mtime(root.join("shop").join(dir), FileTime::from_unix_time(secs, 0)).unwrap();
    }

    let out = arbor(&root, &main)
        .args(["list", "--json", "--sort", "created"])
        .output()
        .unwrap();
    assert!(out.status.success());
    let listed: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    let names: Vec<&str> = listed
        .as_array()
        .unwrap()
        .iter()
        .map(|w| w["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["feature-b", "main", "feature-a"]);

    arbor(&root, &main)
        .args(["remove", "feature-a", "--yes"])
        .assert()
        .success();
    assert!(!root.join("shop/feature-a").exists());

    arbor(&root, &main)
        .args(["remove", "nope", "--yes"])
        .assert()
        .code(exit_codes::WORKTREE_NOT_FOUND);

    arbor(&root, &root.join("shop"))
        .arg("migrate")
        .assert()
        .code(exit_codes::WORKTREE_NOT_FOUND)
        .stderr(predicate::str::contains("is not inside a worktree of shop"));
    assert!(!root.join("shop/.arbor.local").exists());
}
