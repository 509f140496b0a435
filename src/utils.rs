//! Path and name helpers shared by the resolver, placement and scaffold code.

use anyhow::{Context, Result};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Directory-safe form of a branch name: every `/` becomes `-`, nothing else
/// changes.
pub fn sanitize_branch(branch: &str) -> String {
    branch.replace('/', "-")
}

/// Extract the repository name from an SSH, HTTPS, short-form or bare name.
///
/// `git@github.com:owner/repo.git`, `https://github.com/owner/repo.git`,
/// `owner/repo` and `repo` all yield `repo`.
pub fn extract_repo_name(repo_url: &str) -> Result<String> {
    let trimmed = repo_url.trim().trim_end_matches('/');
    let last = trimmed
        .rsplit(['/', ':'])
        .next()
        .unwrap_or(trimmed);
    let name = last.strip_suffix(".git").unwrap_or(last);

    if name.is_empty() {
        anyhow::bail!("Could not extract repository name from URL: '{}'", repo_url);
    }

    Ok(name.to_string())
}

/// Whether `s` is an `owner/repo` shorthand: it contains a `/` and neither
/// `@` nor `:`. A bare name without `/` is not short form.
pub fn is_short_form(s: &str) -> bool {
    s.contains('/') && !s.contains('@') && !s.contains(':')
}

/// Expand `owner/repo` into a GitHub HTTPS clone URL; anything else is
/// returned untouched.
pub fn normalize_clone_url(s: &str) -> String {
    if is_short_form(s) && !Path::new(s).exists() {
        let repo = s.trim_end_matches('/').trim_end_matches(".git");
        format!("https://github.com/{repo}.git")
    } else {
        s.to_string()
    }
}

/// Absolute path to the user's home directory.
pub fn home_dir() -> Result<PathBuf> {
    dirs::home_dir().context("Could not determine home directory")
}

/// Expand a leading `~` (alone or followed by a separator) to the home
/// directory.
pub fn expand_tilde(path: &str) -> Result<PathBuf> {
    if path == "~" {
        return home_dir();
    }
    if let Some(rest) = path.strip_prefix("~/") {
        return Ok(home_dir()?.join(rest));
    }
    Ok(PathBuf::from(path))
}

pub fn ensure_directory_exists(path: &Path) -> Result<()> {
    fs::create_dir_all(path)
        .with_context(|| format!("Failed to create directory: {}", path.display()))
}

/// Replace `path` with `contents` atomically.
///
/// A uniquely named temp file is created next to the target, written,
/// given the target's previous mode (or `default_mode` for new files) and
/// renamed over it. Parent directories are created as needed.
pub fn atomic_write(path: &Path, contents: &[u8], default_mode: u32) -> Result<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    ensure_directory_exists(&dir)?;

    let mode = existing_mode(path).unwrap_or(default_mode);

    let mut tmp = NamedTempFile::new_in(&dir)
        .with_context(|| format!("Failed to create temp file in {}", dir.display()))?;
    tmp.write_all(contents)
        .with_context(|| format!("Failed to write temp file for {}", path.display()))?;
    tmp.as_file()
        .sync_all()
        .with_context(|| format!("Failed to flush temp file for {}", path.display()))?;
    set_mode(tmp.path(), mode)?;

    tmp.persist(path)
        .map_err(|e| e.error)
        .with_context(|| format!("Failed to replace {}", path.display()))?;
    Ok(())
}

#[cfg(unix)]
fn existing_mode(path: &Path) -> Option<u32> {
    use std::os::unix::fs::PermissionsExt;
    fs::metadata(path).ok().map(|m| m.permissions().mode() & 0o7777)
}

#[cfg(not(unix))]
fn existing_mode(_path: &Path) -> Option<u32> {
    None
}

#[cfg(unix)]
fn set_mode(path: &Path, mode: u32) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(mode))
        .with_context(|| format!("Failed to set permissions on {}", path.display()))
}

#[cfg(not(unix))]
fn set_mode(_path: &Path, _mode: u32) -> Result<()> {
    Ok(())
}

/// Remove `start` and its ancestors while they are empty, never touching
/// `stop` or anything outside it.
pub fn remove_empty_dirs(start: &Path, stop: &Path) -> Result<()> {
    let mut current = start.to_path_buf();
    while current != stop && current.starts_with(stop) {
        if !current.is_dir() {
            match current.parent() {
                Some(parent) => {
                    current = parent.to_path_buf();
                    continue;
                }
                None => break,
            }
        }
        let is_empty = fs::read_dir(&current)
            .with_context(|| format!("Failed to read directory: {}", current.display()))?
            .next()
            .is_none();
        if !is_empty {
            break;
        }
        fs::remove_dir(&current)
            .with_context(|| format!("Failed to remove directory: {}", current.display()))?;
        match current.parent() {
            Some(parent) => current = parent.to_path_buf(),
            None => break,
        }
    }
    Ok(())
}

/// Reject branch names that cannot safely become a directory name.
pub fn validate_branch_name(branch_name: &str) -> Result<()> {
    if branch_name.is_empty() {
        anyhow::bail!("Branch name cannot be empty");
    }

    if branch_name.contains("..") {
        anyhow::bail!("Branch name cannot contain '..'");
    }

    if branch_name.starts_with('/') || branch_name.ends_with('/') {
        anyhow::bail!("Branch name cannot start or end with '/'");
    }

    if branch_name.starts_with('-') {
        anyhow::bail!("Branch name cannot start with '-'");
    }

    if branch_name.chars().any(|c| c.is_control() || c.is_whitespace()) {
        anyhow::bail!("Branch name cannot contain whitespace or control characters");
    }

    if branch_name.len() > 255 {
        anyhow::bail!("Branch name too long (max 255 characters)");
    }

    Ok(())
}
