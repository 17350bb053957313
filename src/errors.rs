// src/errors.rs

//! Crate-wide error type for everything that happens *before* an action runs:
//! manifest loading, action construction, graph building.
//!
//! Failures that happen while an action executes use the
//! [`ExecError`](crate::action::ExecError) taxonomy instead.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum GenspawnError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Invalid action: {0}")]
    InvalidAction(String),

    #[error("Invalid resource set: {0}")]
    InvalidResources(String),

    #[error("Output '{path}' is declared by both '{first}' and '{second}'")]
    DuplicateOutput {
        path: String,
        first: String,
        second: String,
    },

    #[error("Cycle detected in action graph: {0}")]
    GraphCycle(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, GenspawnError>;
