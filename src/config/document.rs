//! Comment-preserving edits of block-style YAML files.
//!
//! serde_yaml round-trips lose comments and key order, which users of
//! `arbor.yaml` rely on. [`YamlDocument`] keeps the original lines and only
//! rewrites the key blocks whose value actually changed. Keys are located by
//! indentation; values are rendered with serde_yaml. Documents that are not
//! block mappings at the top level (flow style, scalars) are re-rendered
//! whole.

use crate::error::ArborError;
use anyhow::Result;
use serde_yaml::{Mapping, Value};
use std::sync::OnceLock;

const INDENT_STEP: usize = 2;

#[derive(Debug, Clone)]
pub struct YamlDocument {
    lines: Vec<String>,
}

/// Lines `start..end` hold a key and its value; `start` is the key line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Span {
    start: usize,
    end: usize,
    indent: usize,
}

struct KeyLine {
    indent: usize,
    key: String,
    has_inline_value: bool,
}

fn key_line_regex() -> &'static regex::Regex {
    static RE: OnceLock<regex::Regex> = OnceLock::new();
    RE.get_or_init(|| {
        regex::Regex::new(
            r#"^( *)("[^"]*"|'[^']*'|[^\s#'"\-\[\]{}?][^#]*?)[ \t]*:(?:[ \t]+(.*))?$"#,
        )
        .expect("valid regex")
    })
}

fn parse_key_line(line: &str) -> Option<KeyLine> {
    let caps = key_line_regex().captures(line)?;
    let indent = caps.get(1).map_or(0, |m| m.as_str().len());
    let raw_key = caps.get(2)?.as_str();
    let key = raw_key
        .strip_prefix('"')
        .and_then(|k| k.strip_suffix('"'))
        .or_else(|| raw_key.strip_prefix('\'').and_then(|k| k.strip_suffix('\'')))
        .unwrap_or(raw_key)
        .to_string();
    let has_inline_value = caps
        .get(3)
        .map(|m| m.as_str().trim())
        .is_some_and(|rest| !rest.is_empty() && !rest.starts_with('#'));
    Some(KeyLine {
        indent,
        key,
        has_inline_value,
    })
}

/// The `# ...` comment trailing a key line, with the spacing before it.
fn trailing_comment(line: &str) -> Option<String> {
    let rest = key_line_regex().captures(line)?.get(3)?.as_str();
    let mut quote = None;
    let mut prev = ' ';
    for (i, c) in rest.char_indices() {
        match (quote, c) {
            (Some(q), _) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(c),
            (None, '#') if prev.is_whitespace() => {
                let before = rest[..i].trim_end();
                let spacing = if before.is_empty() { " " } else { &rest[before.len()..i] };
                return Some(format!("{spacing}{}", rest[i..].trim_end()));
            }
            _ => {}
        }
        prev = c;
    }
    None
}

fn is_content(line: &str) -> bool {
    let trimmed = line.trim_start();
    !trimmed.is_empty() && !trimmed.starts_with('#')
}

fn indent_of(line: &str) -> usize {
    line.len() - line.trim_start_matches(' ').len()
}

fn is_sequence_item(line: &str) -> bool {
    let trimmed = line.trim_start();
    trimmed == "-" || trimmed.starts_with("- ")
}

fn is_document_marker(line: &str) -> bool {
    line.starts_with("---") || line.starts_with("...")
}

impl YamlDocument {
    /// Wrap `text`, failing with a ConfigError when it is not valid YAML.
    pub fn parse(text: &str) -> Result<Self> {
        if !text.trim().is_empty() {
            serde_yaml::from_str::<Value>(text)
                .map_err(|e| ArborError::config(format!("invalid YAML: {e}")))?;
        }
        Ok(Self {
            lines: text.lines().map(str::to_string).collect(),
        })
    }

    pub fn render(&self) -> String {
        if self.lines.is_empty() {
            return String::new();
        }
        let mut out = self.lines.join("\n");
        out.push('\n');
        out
    }

    /// Current contents as a YAML value; an empty document is null.
    pub fn value(&self) -> Result<Value> {
        let text = self.render();
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_yaml::from_str(&text)
            .map_err(|e| ArborError::config(format!("invalid YAML: {e}")).into())
    }

    /// Make the document equal to `new`, touching only what differs.
    pub fn sync(&mut self, new: &Value) -> Result<()> {
        let Value::Mapping(new_map) = new else {
            return Err(ArborError::config("document root must be a mapping").into());
        };
        let old = self.value()?;
        let old_map = match old {
            Value::Mapping(m) => m,
            Value::Null => Mapping::new(),
            _ => {
                self.replace_all(new)?;
                return Ok(());
            }
        };
        if !self.is_block_document() {
            self.replace_all(new)?;
            return Ok(());
        }
        self.sync_mapping(&[], &old_map, new_map)
    }

    fn sync_mapping(&mut self, path: &[String], old: &Mapping, new: &Mapping) -> Result<()> {
        for key in old.keys().filter_map(Value::as_str) {
            if !new.contains_key(key) {
                self.remove(&child_path(path, key));
            }
        }
        for (key, new_value) in new {
            let Some(key) = key.as_str() else {
                continue;
            };
            let key_path = child_path(path, key);
            match old.get(key) {
                Some(old_value) if old_value == new_value => {}
                Some(Value::Mapping(old_child)) => match new_value {
                    Value::Mapping(new_child) if self.is_block_mapping_at(&key_path) => {
                        self.sync_mapping(&key_path, old_child, new_child)?;
                    }
                    _ => self.set(&key_path, new_value)?,
                },
                _ => self.set(&key_path, new_value)?,
            }
        }
        Ok(())
    }

    /// Set the value at `path`, creating missing parents. A new key is
    /// appended at the end of its parent mapping.
    pub fn set(&mut self, path: &[String], value: &Value) -> Result<()> {
        let Some((key, parent)) = path.split_last() else {
            return self.replace_all(value);
        };

        if let Some(span) = self.locate(path) {
            let mut rendered = render_entry(key, value, span.indent)?;
            if let (Some(comment), Some(first)) =
                (trailing_comment(&self.lines[span.start]), rendered.first_mut())
            {
                first.push_str(&comment);
            }
            self.lines.splice(span.start..span.end, rendered);
            return Ok(());
        }

        if parent.is_empty() {
            let at = self.top_level_insert_point();
            let rendered = render_entry(key, value, 0)?;
            self.lines.splice(at..at, rendered);
            return Ok(());
        }

        match self.locate(parent) {
            Some(span) if self.is_block_mapping(span) => {
                let indent = self
                    .child_indent(span)
                    .unwrap_or(span.indent + INDENT_STEP);
                let rendered = render_entry(key, value, indent)?;
                self.lines.splice(span.end..span.end, rendered);
                Ok(())
            }
            _ => {
                // Parent missing or not a block mapping: rebuild the parent
                // as a mapping holding the existing entries plus this one.
                let mut merged = match lookup(&self.value()?, parent) {
                    Some(Value::Mapping(m)) => m.clone(),
                    _ => Mapping::new(),
                };
                merged.insert(Value::String(key.clone()), value.clone());
                self.set(parent, &Value::Mapping(merged))
            }
        }
    }

    /// Delete the key at `path` and its value. Comments above it stay.
    pub fn remove(&mut self, path: &[String]) -> bool {
        match self.locate(path) {
            Some(span) => {
                self.lines.drain(span.start..span.end);
                true
            }
            None => false,
        }
    }

    fn replace_all(&mut self, value: &Value) -> Result<()> {
        let text = serde_yaml::to_string(value)
            .map_err(|e| ArborError::config(format!("failed to render YAML: {e}")))?;
        let leading_comments: Vec<String> = self
            .lines
            .iter()
            .take_while(|l| !is_content(l))
            .cloned()
            .collect();
        self.lines = leading_comments;
        self.lines.extend(text.lines().map(str::to_string));
        Ok(())
    }

    fn is_block_document(&self) -> bool {
        self.lines
            .iter()
            .filter(|l| is_content(l) && indent_of(l) == 0)
            .all(|l| is_document_marker(l) || parse_key_line(l).is_some())
    }

    fn top_level_insert_point(&self) -> usize {
        // After the last content line, so trailing comments stay at the end.
        self.lines
            .iter()
            .rposition(|l| is_content(l) && !is_document_marker(l))
            .map_or(self.lines.len(), |i| i + 1)
    }

    fn locate(&self, path: &[String]) -> Option<Span> {
        let mut range = (0, self.lines.len());
        let mut found = None;
        for key in path {
            let indent = self.min_key_indent(range.0, range.1)?;
            let start = (range.0..range.1).find(|&i| {
                parse_key_line(&self.lines[i])
                    .is_some_and(|k| k.indent == indent && k.key == *key)
            })?;
            let span = self.span_from(start, indent);
            range = (span.start + 1, span.end);
            found = Some(span);
        }
        found
    }

    fn min_key_indent(&self, from: usize, to: usize) -> Option<usize> {
        (from..to)
            .filter_map(|i| parse_key_line(&self.lines[i]))
            .map(|k| k.indent)
            .min()
    }

    fn span_from(&self, start: usize, indent: usize) -> Span {
        let value_on_key_line = parse_key_line(&self.lines[start]).is_some_and(|k| k.has_inline_value);
        let mut last = start;
        for i in start + 1..self.lines.len() {
            let line = &self.lines[i];
            if !is_content(line) {
                continue;
            }
            let line_indent = indent_of(line);
            let same_level_item =
                line_indent == indent && !value_on_key_line && is_sequence_item(line);
            if line_indent > indent || same_level_item {
                last = i;
            } else {
                break;
            }
        }
        Span {
            start,
            end: last + 1,
            indent,
        }
    }

    fn child_indent(&self, span: Span) -> Option<usize> {
        self.min_key_indent(span.start + 1, span.end)
            .filter(|&i| i > span.indent)
    }

    fn is_block_mapping(&self, span: Span) -> bool {
        let inline = parse_key_line(&self.lines[span.start]).is_some_and(|k| k.has_inline_value);
        if inline {
            return false;
        }
        let first_child = (span.start + 1..span.end).find(|&i| is_content(&self.lines[i]));
        match first_child {
            Some(i) => !is_sequence_item(&self.lines[i]) && parse_key_line(&self.lines[i]).is_some(),
            None => false,
        }
    }

    fn is_block_mapping_at(&self, path: &[String]) -> bool {
        self.locate(path).is_some_and(|span| self.is_block_mapping(span))
    }
}

fn child_path(path: &[String], key: &str) -> Vec<String> {
    let mut p = path.to_vec();
    p.push(key.to_string());
    p
}

fn lookup<'a>(value: &'a Value, path: &[String]) -> Option<&'a Value> {
    path.iter().try_fold(value, |v, key| v.get(key.as_str()))
}

/// Lines for `key: value` at `indent`.
fn render_entry(key: &str, value: &Value, indent: usize) -> Result<Vec<String>> {
    let pad = " ".repeat(indent);
    let key_text = serde_yaml::to_string(&Value::String(key.to_string()))
        .map_err(|e| ArborError::config(format!("failed to render YAML key: {e}")))?;
    let key_text = key_text.trim_end();
    let body = serde_yaml::to_string(value)
        .map_err(|e| ArborError::config(format!("failed to render YAML: {e}")))?;
    let body_lines: Vec<&str> = body.lines().collect();
    let is_collection = match value {
        Value::Mapping(m) => !m.is_empty(),
        Value::Sequence(s) => !s.is_empty(),
        _ => false,
    };

    match body_lines.as_slice() {
        [single] if !is_collection => Ok(vec![format!("{pad}{key_text}: {single}")]),
        [first, rest @ ..] if !is_collection && (first.starts_with('|') || first.starts_with('>')) => {
            let mut out = vec![format!("{pad}{key_text}: {first}")];
            out.extend(rest.iter().map(|l| format!("{pad}{l}")));
            Ok(out)
        }
        lines => {
            let child_pad = " ".repeat(indent + INDENT_STEP);
            let mut out = vec![format!("{pad}{key_text}:")];
            out.extend(lines.iter().map(|l| {
                if l.is_empty() {
                    String::new()
                } else {
                    format!("{child_pad}{l}")
                }
            }));
            Ok(out)
        }
    }
}
