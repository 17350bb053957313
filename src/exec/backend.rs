// src/exec/backend.rs

//! Pluggable executor abstraction.
//!
//! Actions never spawn processes themselves: they describe the process as a
//! [`SpawnRequest`] and hand it to an [`Executor`] taken from the execution
//! context. Production code uses [`LocalExecutor`](super::LocalExecutor);
//! tests provide fakes that record requests without spawning anything.

use std::collections::BTreeMap;
use std::fmt::Debug;
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::time::Duration;

use thiserror::Error;

use crate::action::ResourceSet;

use super::cancel::CancelSignal;

/// Concrete description of one process to run.
#[derive(Debug, Clone, PartialEq)]
pub struct SpawnRequest {
    pub mnemonic: String,
    /// Label of the owning rule, for logging.
    pub owner: String,
    pub progress_message: String,
    /// Full argv; `arguments[0]` is the program.
    pub arguments: Vec<String>,
    /// The *exact* environment of the process.
    pub environment: BTreeMap<String, String>,
    pub execution_info: BTreeMap<String, String>,
    /// Directory (relative to the execution root) runfiles are materialised in.
    pub runfiles_dir: Option<PathBuf>,
    /// Runfiles-relative link path → execution-root-relative target.
    pub runfiles: BTreeMap<PathBuf, PathBuf>,
    pub inputs: Vec<PathBuf>,
    /// Regular-file outputs; their parent directories are created before spawning.
    pub outputs: Vec<PathBuf>,
    /// Directory outputs; created (empty) before spawning.
    pub tree_outputs: Vec<PathBuf>,
    pub resources: ResourceSet,
}

/// What a terminated process left behind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessResult {
    /// `None` if the process was killed by a signal.
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub wall_time: Duration,
}

impl ProcessResult {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

#[derive(Debug, Error)]
pub enum SpawnError {
    #[error("failed to launch '{program}': {message}")]
    Launch { program: String, message: String },

    #[error("spawn cancelled")]
    Cancelled,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type SpawnFuture<'a> =
    Pin<Box<dyn Future<Output = Result<ProcessResult, SpawnError>> + Send + 'a>>;

/// Runs processes on behalf of actions.
///
/// `spawn` resolves when the process terminates. If `cancel` fires first the
/// implementation must stop the process and resolve to
/// [`SpawnError::Cancelled`].
pub trait Executor: Send + Sync + Debug {
    fn spawn(&self, request: SpawnRequest, cancel: CancelSignal) -> SpawnFuture<'_>;
}
