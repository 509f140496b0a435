//! Reading and editing `KEY=VALUE` env files.
//!
//! Parsing is forgiving: blank lines, `#` comments and lines without `=` are
//! skipped, keys and values are trimmed, and the first occurrence of a key
//! wins. Edits rewrite only the line that holds the key and go through
//! [`atomic_write`], under a per-file lock shared by every writer in the
//! process.

use crate::error::ArborError;
use crate::utils::atomic_write;
use anyhow::{Context, Result};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

/// Mode given to env files that do not exist yet.
pub const NEW_FILE_MODE: u32 = 0o644;

/// Parsed env file contents in file order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvVars {
    entries: Vec<(String, String)>,
}

impl EnvVars {
    /// Value of the first line that defines `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// True when `key` is present with a non-empty value.
    pub fn has_value(&self, key: &str) -> bool {
        self.get(key).is_some_and(|v| !v.is_empty())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// First-wins map of every key.
    pub fn to_map(&self) -> HashMap<String, String> {
        let mut map = HashMap::new();
        for (k, v) in &self.entries {
            map.entry(k.clone()).or_insert_with(|| v.clone());
        }
        map
    }
}

pub fn parse(content: &str) -> EnvVars {
    let entries = content
        .lines()
        .filter_map(|line| {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                return None;
            }
            let (key, value) = trimmed.split_once('=')?;
            Some((key.trim().to_string(), value.trim().to_string()))
        })
        .collect();
    EnvVars { entries }
}

pub fn read_file(path: &Path) -> Result<EnvVars> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read env file: {}", path.display()))?;
    Ok(parse(&content))
}

/// `None` when the file does not exist.
pub fn read_file_if_exists(path: &Path) -> Result<Option<EnvVars>> {
    if !path.exists() {
        return Ok(None);
    }
    read_file(path).map(Some)
}

/// Look up `key`, failing with NotFound when the file has no such key.
pub fn read_value(path: &Path, key: &str) -> Result<String> {
    let vars = read_file(path)?;
    vars.get(key).map(str::to_string).ok_or_else(|| {
        ArborError::not_found(format!("key {key} not found in {}", path.display())).into()
    })
}

/// Set one key. See [`update_values`].
pub fn write_value(path: &Path, key: &str, value: &str) -> Result<()> {
    update_values(path, &[(key.to_string(), value.to_string())])
}

/// Set several keys in one atomic rewrite.
///
/// A missing file is created with its parents and mode 0644. For each key the
/// first line defining it is replaced in place; keys with no such line are
/// appended. Every other byte of the file is kept.
pub fn update_values(path: &Path, pairs: &[(String, String)]) -> Result<()> {
    for (key, value) in pairs {
        validate_pair(key, value)?;
    }

    let lock = file_lock(path)?;
    let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);

    let mut content = if path.exists() {
        fs::read_to_string(path)
            .with_context(|| format!("Failed to read env file: {}", path.display()))?
    } else {
        String::new()
    };
    for (key, value) in pairs {
        content = apply_update(&content, key, value);
    }

    atomic_write(path, content.as_bytes(), NEW_FILE_MODE)
        .with_context(|| format!("Failed to write env file: {}", path.display()))
}

fn validate_pair(key: &str, value: &str) -> Result<()> {
    if key.trim().is_empty() || key.contains('=') || key.contains(char::is_whitespace) {
        return Err(ArborError::config(format!("invalid env key '{key}'")).into());
    }
    if value.contains(['\n', '\r']) {
        return Err(ArborError::config(format!("value for {key} contains a line break")).into());
    }
    Ok(())
}

/// Text of `content` with `key` set to `value`.
pub fn apply_update(content: &str, key: &str, value: &str) -> String {
    let new_line = format!("{key}={value}");
    let mut out = String::with_capacity(content.len() + new_line.len() + 1);
    let mut replaced = false;

    for line in content.split_inclusive('\n') {
        if !replaced && defines_key(line, key) {
            out.push_str(&new_line);
            if line.ends_with("\r\n") {
                out.push_str("\r\n");
            } else if line.ends_with('\n') {
                out.push('\n');
            }
            replaced = true;
        } else {
            out.push_str(line);
        }
    }

    if !replaced {
        if !out.is_empty() && !out.ends_with('\n') {
            out.push('\n');
        }
        out.push_str(&new_line);
        out.push('\n');
    }
    out
}

/// A line defines `key` when, after leading whitespace, it starts with
/// `KEY=` or `KEY` followed by whitespace. Comments never match.
fn defines_key(line: &str, key: &str) -> bool {
    let trimmed = line.trim_start();
    if trimmed.starts_with('#') {
        return false;
    }
    match trimmed.strip_prefix(key) {
        Some(rest) => rest.starts_with('=') || rest.starts_with([' ', '\t']),
        None => false,
    }
}

type LockTable = Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>;

fn lock_table() -> &'static LockTable {
    static LOCKS: OnceLock<LockTable> = OnceLock::new();
    LOCKS.get_or_init(|| Mutex::new(HashMap::new()))
}

/// The writer lock for `path`, keyed by its absolute form.
///
/// Entries nobody holds are dropped on the next lookup, so the table only
/// grows with the number of files being written at once.
fn file_lock(path: &Path) -> Result<Arc<Mutex<()>>> {
    let key = std::path::absolute(path)
        .with_context(|| format!("Failed to resolve path: {}", path.display()))?;
    let mut table = lock_table().lock().unwrap_or_else(PoisonError::into_inner);
    table.retain(|_, lock| Arc::strong_count(lock) > 1);
    Ok(Arc::clone(table.entry(key).or_default()))
}
