use super::Session;
use crate::output::Output;
use crate::styles::{self, colors_enabled, paint};
use crate::worktree::{list_worktrees, sort_worktrees, SortKey, Worktree};
use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use std::path::Path;
use tabled::{builder::Builder, settings::Style};

#[derive(clap::Args)]
#[command(long_about = r#"
Lists the project's worktrees.

Each worktree is shown with:
  - A `>` marker for the worktree you are in
  - Its directory name and branch ("(detached)" when HEAD is detached)
  - Its path relative to the current directory
  - `main` for the default branch, `merged` once the default branch contains
    it and has moved on
  - When its directory was created

Use --json for machine-readable output suitable for scripting.
"#)]
pub struct Args {
    #[arg(long, value_enum, default_value_t = SortKey::Name, help = "Sort order")]
    sort: SortKey,

    #[arg(short, long, help = "Reverse the sort order")]
    reverse: bool,

    #[arg(long, help = "Output in JSON format")]
    json: bool,
}

pub fn run(args: Args, session: &Session, output: &mut dyn Output) -> Result<()> {
    let git = session.git();
    let project = session.project(&git)?;
    let mut worktrees = list_worktrees(
        &git,
        &project.git_dir,
        &project.default_branch,
        &project.cwd,
    )?;
    sort_worktrees(&mut worktrees, args.sort, args.reverse);

    if args.json {
        let json =
            serde_json::to_string_pretty(&worktrees).context("Failed to serialize worktrees")?;
        output.raw(&format!("{json}\n"));
        return Ok(());
    }

    if worktrees.is_empty() {
        output.info("No worktrees.");
        return Ok(());
    }
    output.raw(&format!("{}\n", render_table(&worktrees, &session.cwd, colors_enabled())));
    Ok(())
}

fn status(worktree: &Worktree) -> &'static str {
    if worktree.is_main {
        "main"
    } else if worktree.is_merged {
        "merged"
    } else {
        ""
    }
}

fn created(at: Option<DateTime<Local>>) -> String {
    at.map(|t| t.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_default()
}

fn render_table(worktrees: &[Worktree], cwd: &Path, use_color: bool) -> String {
    let mut builder = Builder::new();
    let header: Vec<String> = ["", "Name", "Branch", "Path", "Status", "Created"]
        .iter()
        .map(|h| {
            if h.is_empty() {
                String::new()
            } else {
                paint(h, styles::DIM, use_color)
            }
        })
        .collect();
    builder.push_record(header);

    for worktree in worktrees {
        let marker = if worktree.is_current {
            paint(">", styles::GREEN, use_color)
        } else {
            " ".to_string()
        };
        let relative = pathdiff::diff_paths(&worktree.path, cwd)
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| ".".into());
        let status = match status(worktree) {
            "merged" => paint("merged", styles::YELLOW, use_color),
            other => other.to_string(),
        };
        builder.push_record([
            marker,
            worktree.name.clone(),
            worktree
                .branch
                .clone()
                .unwrap_or_else(|| "(detached)".to_string()),
            relative.display().to_string(),
            status,
            created(worktree.created),
        ]);
    }

    let mut table = builder.build();
    table.with(Style::blank());
    table.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn wt(name: &str, branch: Option<&str>) -> Worktree {
        Worktree {
            name: name.into(),
            path: PathBuf::from(format!("/srv/shop/{name}")),
            branch: branch.map(str::to_string),
            is_main: name == "main",
            is_current: name == "feature-x",
            is_merged: name == "old",
            created: None,
        }
    }

    #[test]
    fn test_table_contents() {
        let table = render_table(
            &[
                wt("main", Some("main")),
                wt("feature-x", Some("feature/x")),
                wt("old", Some("old")),
                wt("loose", None),
            ],
            Path::new("/srv/shop/feature-x"),
            false,
        );
        let lines: Vec<&str> = table.lines().collect();
        assert!(lines[1].contains("../main") && lines[1].contains("main"));
        assert!(lines[2].trim_start().starts_with('>'));
        assert!(lines[2].contains("feature/x"));
        assert!(lines[3].contains("merged"));
        assert!(lines[4].contains("(detached)"));
    }

    #[test]
    fn test_json_has_classification() {
        let json = serde_json::to_value(vec![wt("old", Some("old"))]).unwrap();
        assert_eq!(json[0]["is_merged"], true);
        assert_eq!(json[0]["branch"], "old");
        assert!(json[0].get("created").is_none());
    }
}
