// src/action/error.rs

//! Structured failures raised while an action executes.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Discriminant of an [`ExecError`], for matching without destructuring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExecErrorKind {
    CommandFailure,
    InputIsDirectory,
    OutputIsDirectory,
    OutputMissing,
    Interrupted,
}

impl fmt::Display for ExecErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ExecErrorKind::CommandFailure => "command failure",
            ExecErrorKind::InputIsDirectory => "input is a directory",
            ExecErrorKind::OutputIsDirectory => "output is a directory",
            ExecErrorKind::OutputMissing => "output missing",
            ExecErrorKind::Interrupted => "interrupted",
        };
        f.write_str(s)
    }
}

/// Every way an action can fail once `execute` has been called.
///
/// All variants are fatal to the owning action; nothing at this layer
/// retries.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExecError {
    /// The process exited non-zero (`exit_code` is `Some`) or could not be
    /// launched or was killed by a signal (`exit_code` is `None`).
    #[error("{}", command_failure_message(.exit_code, .message))]
    CommandFailure {
        exit_code: Option<i32>,
        message: String,
    },

    #[error("input '{}' is a directory; declare it as a tree artifact or depend on individual files", .path.display())]
    InputIsDirectory { path: PathBuf },

    #[error("output '{}' is not a regular file; declare it as a tree artifact if a directory is intended", .path.display())]
    OutputIsDirectory { path: PathBuf },

    #[error("output '{}' was not created", .path.display())]
    OutputMissing { path: PathBuf },

    #[error("execution interrupted")]
    Interrupted,
}

fn command_failure_message(exit_code: &Option<i32>, message: &str) -> String {
    let head = match exit_code {
        Some(code) => format!("command failed with exit code {code}"),
        None => "command failed".to_string(),
    };
    if message.trim().is_empty() {
        head
    } else {
        format!("{head}: {}", message.trim_end())
    }
}

impl ExecError {
    pub fn kind(&self) -> ExecErrorKind {
        match self {
            ExecError::CommandFailure { .. } => ExecErrorKind::CommandFailure,
            ExecError::InputIsDirectory { .. } => ExecErrorKind::InputIsDirectory,
            ExecError::OutputIsDirectory { .. } => ExecErrorKind::OutputIsDirectory,
            ExecError::OutputMissing { .. } => ExecErrorKind::OutputMissing,
            ExecError::Interrupted => ExecErrorKind::Interrupted,
        }
    }

    /// The artifact path a shape violation is about, if any.
    pub fn path(&self) -> Option<&PathBuf> {
        match self {
            ExecError::InputIsDirectory { path }
            | ExecError::OutputIsDirectory { path }
            | ExecError::OutputMissing { path } => Some(path),
            ExecError::CommandFailure { .. } | ExecError::Interrupted => None,
        }
    }

    pub fn is_interrupted(&self) -> bool {
        matches!(self, ExecError::Interrupted)
    }
}
