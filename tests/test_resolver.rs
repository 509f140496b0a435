mod common;

use anyhow::Result;
use arbor::config::{GlobalConfig, ProjectInfo};
use arbor::error::{exit_code_for, exit_codes};
use arbor::project::{resolve, ProjectLayout};
use arbor::utils::sanitize_branch;
use common::StaticGit;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn linked_global(project: &Path, base: &Path) -> GlobalConfig {
    let mut global = GlobalConfig {
        worktree_base: Some(base.display().to_string()),
        ..Default::default()
    };
    global
        .register_project("my-app", project, ProjectInfo::default())
        .unwrap();
    global
}

#[test]
fn test_linked_project_resolves_from_any_depth() -> Result<()> {
    let temp = TempDir::new()?;
    let root = temp.path().canonicalize()?;
    let project = root.join("opt/my-app");
    fs::create_dir_all(project.join("sub/sub2"))?;
    let global = linked_global(&project, &root.join("wt"));

    for cwd in [
        project.clone(),
        project.join("sub"),
        project.join("sub/sub2"),
    ] {
        let ctx = resolve(&cwd, global.clone(), &StaticGit::new("main"))?;
        assert_eq!(ctx.name(), "my-app", "from {}", cwd.display());
        assert_eq!(ctx.project_root, project);
        assert!(ctx.is_linked());
    }
    Ok(())
}

#[test]
fn test_outside_every_project_is_not_found() -> Result<()> {
    let temp = TempDir::new()?;
    let root = temp.path().canonicalize()?;
    let project = root.join("opt/my-app");
    let elsewhere = root.join("home/notes");
    fs::create_dir_all(&project)?;
    fs::create_dir_all(&elsewhere)?;

    let err = resolve(
        &elsewhere,
        linked_global(&project, &root.join("wt")),
        &StaticGit::new("main"),
    )
    .unwrap_err();
    assert_eq!(exit_code_for(&err), exit_codes::WORKTREE_NOT_FOUND);
    assert!(err.to_string().contains("not inside an Arbor project"));
    Ok(())
}

#[test]
fn test_linked_placement() -> Result<()> {
    let temp = TempDir::new()?;
    let root = temp.path().canonicalize()?;
    let project = root.join("opt/my-app");
    let base = root.join("tmp/wt");
    fs::create_dir_all(&project)?;

    let ctx = resolve(&project, linked_global(&project, &base), &StaticGit::new("main"))?;
    assert_eq!(
        ctx.layout,
        ProjectLayout::Linked {
            name: "my-app".into(),
            worktree_base: Some(base.clone()),
        }
    );
    assert_eq!(
        ctx.worktree_path("feature/x")?,
        base.join("my-app").join("feature-x")
    );
    assert_eq!(ctx.worktree_path("main")?, base.join("my-app").join("main"));
    Ok(())
}

#[test]
fn test_worktree_under_base_resolves_to_its_project() -> Result<()> {
    let temp = TempDir::new()?;
    let root = temp.path().canonicalize()?;
    let project = root.join("opt/my-app");
    let base = root.join("wt");
    let worktree = base.join("my-app/feature-x/src");
    fs::create_dir_all(&project)?;
    fs::create_dir_all(&worktree)?;

    let ctx = resolve(&worktree, linked_global(&project, &base), &StaticGit::new("main"))?;
    assert_eq!(ctx.name(), "my-app");
    assert!(ctx.is_in_worktree());
    Ok(())
}

#[test]
fn test_legacy_placement() -> Result<()> {
    let temp = TempDir::new()?;
    let root = temp.path().canonicalize()?.join("shop");
    fs::create_dir_all(root.join(".bare"))?;
    fs::create_dir_all(root.join("main"))?;

    let ctx = resolve(&root.join("main"), GlobalConfig::default(), &StaticGit::new("main"))?;
    assert_eq!(ctx.layout, ProjectLayout::Legacy);
    for branch in ["feature/x", "main", "a/b/c", "release-1.2"] {
        let expected: PathBuf = root.join(sanitize_branch(branch));
        assert_eq!(ctx.worktree_path(branch)?, expected);
    }
    Ok(())
}

#[test]
fn test_sanitize_branch_properties() {
    for branch in ["feature/x", "a//b", "/lead", "trail/", "plain", "dots.and-dashes"] {
        let sanitized = sanitize_branch(branch);
        assert!(!sanitized.contains('/'));
        if !branch.contains('/') {
            assert_eq!(sanitized, branch);
        }
    }
}
