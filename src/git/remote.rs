use super::GitCommand;
use crate::error::ArborError;
use anyhow::Result;
use std::path::Path;

impl GitCommand {
    pub fn config_set(&self, git_dir: &Path, key: &str, value: &str) -> Result<()> {
        let mut cmd = self.git_in(git_dir);
        cmd.args(["config", key, value]);
        self.exec_ok("config", git_dir, cmd)?;
        Ok(())
    }

    /// Set up the fetch refspec for a remote; bare clones are created without
    /// one, so upstream tracking would not work.
    pub fn setup_fetch_refspec(&self, git_dir: &Path, remote: &str) -> Result<()> {
        let refspec = format!("+refs/heads/*:refs/remotes/{remote}/*");
        self.config_set(git_dir, &format!("remote.{remote}.fetch"), &refspec)
    }

    pub fn remote_get_url(&self, git_dir: &Path, remote: &str) -> Result<String> {
        let mut cmd = self.git_in(git_dir);
        cmd.args(["config", "--get"])
            .arg(format!("remote.{remote}.url"));
        let output = self.exec("config", cmd)?;
        match output.status.code() {
            Some(0) => Ok(output.stdout.trim().to_string()),
            // Key not set
            Some(1) => Ok(String::new()),
            _ => Err(ArborError::git("config", git_dir, output.error_message()).into()),
        }
    }

    pub fn branch_set_upstream(&self, git_dir: &Path, branch: &str, remote: &str) -> Result<()> {
        let mut cmd = self.git_in(git_dir);
        cmd.arg("branch")
            .arg(format!("--set-upstream-to={remote}/{branch}"))
            .arg(branch);
        self.exec_ok("branch --set-upstream-to", git_dir, cmd)?;
        Ok(())
    }

    pub fn branch_has_upstream(&self, git_dir: &Path, branch: &str) -> Result<bool> {
        let mut cmd = self.git_in(git_dir);
        cmd.args(["config", "--get"])
            .arg(format!("branch.{branch}.merge"));
        self.exec_predicate("config", git_dir, cmd)
    }
}
