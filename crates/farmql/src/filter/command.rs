use crate::{bail, Result};

use std::{collections::HashMap, fmt::Debug, process};

/// Runs the commands written between backticks in a WHERE string.
pub trait CommandRunner: Debug + Send + Sync {
    /// Returns the standard output of `command` with surrounding whitespace
    /// removed.
    fn run(&self, command: &str) -> Result<String>;
}

/// Runs commands through `sh -c`.
#[derive(Debug, Default, Clone, Copy)]
pub struct ShellCommand;

impl CommandRunner for ShellCommand {
    fn run(&self, command: &str) -> Result<String> {
        let output = process::Command::new("sh").arg("-c").arg(command).output()?;

        if !output.status.success() {
            bail!(
                "command `{command}` failed with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

/// Canned output per command.
impl CommandRunner for HashMap<String, String> {
    fn run(&self, command: &str) -> Result<String> {
        match self.get(command) {
            Some(output) => Ok(output.trim().to_string()),
            None => bail!("unknown command `{command}`"),
        }
    }
}
