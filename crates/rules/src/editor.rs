//! External editor configuration and the scoped temp-file round trip.
//!
//! The editor command is an explicit [`EditorConfig`] value rather than an
//! implicit environment read at edit time. The command string is split on
//! whitespace into a program and its arguments and spawned directly (no
//! shell), with the temp-file path appended as the final argument.

use std::env;
use std::fs;
use std::io::Write;
use std::path::Path;
use std::process::Command;

use tracing::{debug, info};

use crate::error::{Result, RuleError};

/// Environment variable naming the editor command.
pub const EDITOR_ENV: &str = "EDITOR";

/// Which external editor to open rule drafts in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EditorConfig {
    command: Option<String>,
}

impl EditorConfig {
    /// Read the editor command from `EDITOR`. Empty values count as unset.
    pub fn from_env() -> Self {
        Self::from_env_var(EDITOR_ENV)
    }

    /// Read the editor command from an arbitrary environment variable.
    pub fn from_env_var(key: &str) -> Self {
        Self {
            command: env::var(key).ok().filter(|s| !s.trim().is_empty()),
        }
    }

    /// Use an explicit command line, e.g. `"subl -w"`.
    pub fn with_command(command: impl Into<String>) -> Self {
        Self {
            command: Some(command.into()),
        }
    }

    /// No editor configured; `create`/`edit` fail with [`RuleError::NoEditor`].
    pub fn unset() -> Self {
        Self { command: None }
    }

    pub fn command(&self) -> Option<&str> {
        self.command.as_deref()
    }

    /// Split the configured command into program and arguments.
    pub(crate) fn resolve(&self) -> Result<EditorCommand> {
        let mut parts = self
            .command
            .as_deref()
            .unwrap_or_default()
            .split_whitespace()
            .map(str::to_string);
        let program = parts.next().ok_or(RuleError::NoEditor)?;
        Ok(EditorCommand {
            program,
            args: parts.collect(),
        })
    }
}

/// A resolved editor invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct EditorCommand {
    pub(crate) program: String,
    pub(crate) args: Vec<String>,
}

impl EditorCommand {
    /// Run the editor against `path`, blocking until it exits.
    fn run(&self, path: &Path) -> Result<()> {
        debug!(program = %self.program, path = %path.display(), "launching editor");
        let status = Command::new(&self.program)
            .args(&self.args)
            .arg(path)
            .status()?;
        if !status.success() {
            return Err(RuleError::EditorFailed {
                program: self.program.clone(),
                status,
            });
        }
        Ok(())
    }

    /// Write `contents` to a temporary `.yml` file, open it in the editor and
    /// return the file's final bytes.
    ///
    /// The temp file is removed when this returns, whether or not the editor
    /// or the read-back succeeded.
    pub(crate) fn edit_buffer(&self, contents: &str) -> Result<Vec<u8>> {
        let mut tmp = tempfile::Builder::new()
            .prefix("customs-rules-")
            .suffix(".yml")
            .tempfile()?;
        tmp.write_all(contents.as_bytes())?;
        tmp.flush()?;

        self.run(tmp.path())?;

        // Re-read by path: editors that save via rename leave the open handle stale.
        let edited = fs::read(tmp.path())?;
        info!(program = %self.program, bytes = edited.len(), "editor session finished");
        Ok(edited)
    }
}
