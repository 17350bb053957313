// src/action/context.rs

use std::fmt;
use std::sync::Arc;

use crate::exec::{CancelSignal, Executor};
use crate::fs::FilesystemProbe;
use crate::report::Reporter;

use super::Artifact;

/// Everything one `execute` call may use.
///
/// A context is consumed by the execution attempt it was created for and is
/// not `Clone`.
/// Filesystem queries take [`Artifact`]s rather than raw paths, which keeps
/// them scoped to what the action declared.
pub struct ActionExecutionContext {
    executor: Arc<dyn Executor>,
    reporter: Arc<dyn Reporter>,
    fs: Arc<dyn FilesystemProbe>,
    cancel: CancelSignal,
}

impl ActionExecutionContext {
    pub fn new(
        executor: Arc<dyn Executor>,
        reporter: Arc<dyn Reporter>,
        fs: Arc<dyn FilesystemProbe>,
    ) -> Self {
        Self {
            executor,
            reporter,
            fs,
            cancel: CancelSignal::never(),
        }
    }

    pub fn with_cancel(mut self, cancel: CancelSignal) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn executor(&self) -> &dyn Executor {
        self.executor.as_ref()
    }

    pub fn reporter(&self) -> &dyn Reporter {
        self.reporter.as_ref()
    }

    pub fn cancel_signal(&self) -> &CancelSignal {
        &self.cancel
    }

    pub fn exists(&self, artifact: &Artifact) -> bool {
        self.fs.exists(&artifact.exec_path())
    }

    pub fn is_directory(&self, artifact: &Artifact) -> bool {
        self.fs.is_dir(&artifact.exec_path())
    }

    pub fn is_file(&self, artifact: &Artifact) -> bool {
        self.fs.is_file(&artifact.exec_path())
    }
}

impl fmt::Debug for ActionExecutionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionExecutionContext")
            .field("executor", &self.executor)
            .field("reporter", &self.reporter)
            .field("fs", &self.fs)
            .field("cancelled", &self.cancel.is_cancelled())
            .finish()
    }
}
