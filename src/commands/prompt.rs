//! Yes/no confirmation before destructive commands.

use crate::error::ArborError;
use anyhow::{Context, Result};
use dialoguer::{theme::ColorfulTheme, Confirm};
use std::io::{self, IsTerminal};

/// Ask `question`, defaulting to no.
///
/// Skipped (answered yes) with `--yes` or when stdin is not a terminal. A
/// "no" answer or an interrupted prompt is [`ArborError::Aborted`].
pub(crate) fn confirm(question: &str, assume_yes: bool) -> Result<()> {
    if assume_yes || !io::stdin().is_terminal() {
        return Ok(());
    }
    let answer = Confirm::with_theme(&ColorfulTheme::default())
        .with_prompt(question)
        .default(false)
        .interact()
        .map_err(|e| match e {
            dialoguer::Error::IO(err) if err.kind() == io::ErrorKind::Interrupted => {
                anyhow::Error::new(ArborError::Aborted)
            }
            other => anyhow::Error::new(other),
        })
        .context("Confirmation prompt failed")?;
    if answer {
        Ok(())
    } else {
        Err(ArborError::Aborted.into())
    }
}
