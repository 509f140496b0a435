//! `{{ .Name }}` expansion for step arguments and values.
//!
//! Values come from a snapshot of the scaffold context (`Path`, `RepoPath`,
//! `RepoName`, `SiteName`, `Branch`, `DbSuffix` and every variable). A
//! reference to anything else is an error rather than an empty string.

use anyhow::Result;
use regex::Regex;
use std::collections::HashMap;
use std::sync::OnceLock;

fn reference_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\{\{\s*\.([A-Za-z_][A-Za-z0-9_]*)\s*\}\}").expect("valid regex")
    })
}

/// Expand every `{{ .Name }}` in `text` from `vars`.
pub fn expand(text: &str, vars: &HashMap<String, String>) -> Result<String> {
    if !text.contains("{{") {
        return Ok(text.to_string());
    }

    let re = reference_regex();
    let mut out = String::with_capacity(text.len());
    let mut last = 0;

    for caps in re.captures_iter(text) {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        let name = &caps[1];

        check_literal(&text[last..whole.start()], text)?;
        out.push_str(&text[last..whole.start()]);

        let value = vars.get(name).ok_or_else(|| {
            anyhow::anyhow!("unknown template variable '{name}' in \"{text}\"")
        })?;
        out.push_str(value);
        last = whole.end();
    }

    check_literal(&text[last..], text)?;
    out.push_str(&text[last..]);
    Ok(out)
}

/// Expand each element of `items`.
pub fn expand_all(items: &[String], vars: &HashMap<String, String>) -> Result<Vec<String>> {
    items.iter().map(|item| expand(item, vars)).collect()
}

/// Text between references must not contain a stray `{{`: it is either
/// unterminated or not a `.Name` reference.
fn check_literal(segment: &str, text: &str) -> Result<()> {
    if segment.contains("{{") {
        anyhow::bail!("malformed template reference in \"{text}\"");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars() -> HashMap<String, String> {
        let mut vars = HashMap::new();
        vars.insert("SiteName".to_string(), "my_app".to_string());
        vars.insert("DbSuffix".to_string(), "brave_otter".to_string());
        vars.insert("Branch".to_string(), "feature/x".to_string());
        vars
    }

    #[test]
    fn test_plain_text_unchanged() {
        assert_eq!(expand("npm ci", &vars()).unwrap(), "npm ci");
    }

    #[test]
    fn test_whitespace_insignificant() {
        let v = vars();
        assert_eq!(
            expand("{{.SiteName}}_{{ .DbSuffix }}", &v).unwrap(),
            "my_app_brave_otter"
        );
        assert_eq!(expand("{{   .Branch\t}}", &v).unwrap(), "feature/x");
    }

    #[test]
    fn test_unknown_variable_fails() {
        let err = expand("{{ .Nope }}", &vars()).unwrap_err();
        assert!(err.to_string().contains("Nope"));
    }

    #[test]
    fn test_unterminated_reference_fails() {
        assert!(expand("{{ .SiteName", &vars()).is_err());
        assert!(expand("{{ SiteName }}", &vars()).is_err());
    }

    #[test]
    fn test_single_braces_are_literal() {
        assert_eq!(expand("{a} {{.Branch}}", &vars()).unwrap(), "{a} feature/x");
    }

    #[test]
    fn test_expand_all_stops_at_first_error() {
        let items = vec!["{{.Branch}}".to_string(), "{{.Missing}}".to_string()];
        assert!(expand_all(&items, &vars()).is_err());
    }
}
