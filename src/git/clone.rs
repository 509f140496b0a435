use super::GitCommand;
use crate::error::ArborError;
use std::path::Path;
use std::process::Command;

impl GitCommand {
    pub fn clone_bare(&self, repo_url: &str, target_dir: &Path) -> anyhow::Result<()> {
        let mut cmd = Command::new("git");
        cmd.args(["clone", "--bare"]);

        if self.quiet {
            cmd.arg("--quiet");
        }

        // No credential prompt can be answered with stdin closed.
        cmd.env("GIT_TERMINAL_PROMPT", "0");
        cmd.arg(repo_url).arg(target_dir);

        let output = self.exec("clone", cmd)?;
        if !output.success() {
            return Err(ArborError::git("clone", target_dir, output.error_message()).into());
        }
        Ok(())
    }
}
