// src/exec/local.rs

//! Executor that runs processes on the local machine.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Instant;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use super::backend::{Executor, ProcessResult, SpawnError, SpawnFuture, SpawnRequest};
use super::cancel::CancelSignal;

/// Runs each request as a child process of the current one, with the
/// execution root as working directory.
///
/// - The environment is exactly `request.environment`; nothing is inherited.
/// - Declared outputs left by an earlier build are removed first; tree
///   outputs are then recreated empty.
/// - stdout/stderr are captured (and logged at debug level).
/// - If the cancel signal fires, the child is killed and the spawn resolves
///   to [`SpawnError::Cancelled`].
#[derive(Debug, Clone)]
pub struct LocalExecutor {
    exec_root: PathBuf,
}

impl LocalExecutor {
    pub fn new(exec_root: impl Into<PathBuf>) -> Self {
        Self {
            exec_root: exec_root.into(),
        }
    }

    pub fn exec_root(&self) -> &Path {
        &self.exec_root
    }

    async fn run(
        &self,
        request: SpawnRequest,
        cancel: CancelSignal,
    ) -> Result<ProcessResult, SpawnError> {
        let Some((program, args)) = request.arguments.split_first() else {
            return Err(SpawnError::Launch {
                program: String::new(),
                message: "empty argument list".to_string(),
            });
        };

        if cancel.is_cancelled() {
            debug!(owner = %request.owner, "cancelled before spawning");
            return Err(SpawnError::Cancelled);
        }

        self.prepare(&request).await?;

        info!(
            owner = %request.owner,
            mnemonic = %request.mnemonic,
            argv = ?request.arguments,
            "spawning process"
        );

        let mut cmd = Command::new(program);
        cmd.args(args)
            .env_clear()
            .envs(&request.environment)
            .current_dir(&self.exec_root)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let started = Instant::now();
        let mut child = cmd.spawn().map_err(|e| SpawnError::Launch {
            program: program.clone(),
            message: e.to_string(),
        })?;

        let stdout = child
            .stdout
            .take()
            .map(|s| capture(s, request.owner.clone(), "stdout"));
        let stderr = child
            .stderr
            .take()
            .map(|s| capture(s, request.owner.clone(), "stderr"));

        // Either the process exits and its pipes drain, or cancellation is
        // requested. A backgrounded grandchild can hold the pipes open after
        // the child exits, so the drain is raced against the signal too.
        tokio::select! {
            (status_res, wall_time, stdout, stderr) = async {
                let status_res = child.wait().await;
                let wall_time = started.elapsed();
                (status_res, wall_time, collect(stdout).await, collect(stderr).await)
            } => {
                let status = status_res
                    .with_context(|| format!("waiting for process '{program}'"))?;

                info!(
                    owner = %request.owner,
                    exit_code = ?status.code(),
                    success = status.success(),
                    elapsed_ms = wall_time.as_millis() as u64,
                    "process exited"
                );

                Ok(ProcessResult {
                    exit_code: status.code(),
                    stdout,
                    stderr,
                    wall_time,
                })
            }

            _ = cancel.cancelled() => {
                info!(
                    owner = %request.owner,
                    "cancellation requested; killing process"
                );
                if let Err(e) = child.kill().await {
                    // Already reaped when only the drain was pending.
                    debug!(
                        owner = %request.owner,
                        error = %e,
                        "could not kill child process on cancellation"
                    );
                }
                Err(SpawnError::Cancelled)
            }
        }
    }

    /// Clear stale outputs, create output directories and materialise
    /// runfiles.
    async fn prepare(&self, request: &SpawnRequest) -> Result<()> {
        for output in request.outputs.iter().chain(&request.tree_outputs) {
            remove_stale(&self.exec_root.join(output)).await?;
        }

        for output in &request.outputs {
            if let Some(parent) = output.parent() {
                if !parent.as_os_str().is_empty() {
                    let dir = self.exec_root.join(parent);
                    tokio::fs::create_dir_all(&dir)
                        .await
                        .with_context(|| format!("creating output directory {:?}", dir))?;
                }
            }
        }

        for tree in &request.tree_outputs {
            let dir = self.exec_root.join(tree);
            tokio::fs::create_dir_all(&dir)
                .await
                .with_context(|| format!("creating tree output {:?}", dir))?;
        }

        if let Some(runfiles_dir) = &request.runfiles_dir {
            let base = self.exec_root.join(runfiles_dir);
            for (link, target) in &request.runfiles {
                self.link_runfile(&base.join(link), target).await?;
            }
        }

        Ok(())
    }

    async fn link_runfile(&self, link: &Path, target: &Path) -> Result<()> {
        if tokio::fs::symlink_metadata(link).await.is_ok() {
            debug!(link = ?link, "runfile already present");
            return Ok(());
        }
        if let Some(parent) = link.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("creating runfiles directory {:?}", parent))?;
        }

        let source = tokio::fs::canonicalize(self.exec_root.join(target))
            .await
            .with_context(|| format!("resolving runfile target {:?}", target))?;

        #[cfg(unix)]
        tokio::fs::symlink(&source, link)
            .await
            .with_context(|| format!("linking runfile {:?} -> {:?}", link, source))?;

        #[cfg(not(unix))]
        tokio::fs::copy(&source, link)
            .await
            .with_context(|| format!("copying runfile {:?} -> {:?}", source, link))?;

        Ok(())
    }
}

impl Executor for LocalExecutor {
    fn spawn(&self, request: SpawnRequest, cancel: CancelSignal) -> SpawnFuture<'_> {
        Box::pin(self.run(request, cancel))
    }
}

/// Remove whatever a previous build left at an output path.
async fn remove_stale(path: &Path) -> Result<()> {
    let Ok(meta) = tokio::fs::symlink_metadata(path).await else {
        return Ok(());
    };

    debug!(path = ?path, "removing stale output");
    if meta.is_dir() {
        tokio::fs::remove_dir_all(path)
            .await
            .with_context(|| format!("removing stale output directory {:?}", path))
    } else {
        tokio::fs::remove_file(path)
            .await
            .with_context(|| format!("removing stale output {:?}", path))
    }
}

/// Drain a child stream line by line, logging each line at debug level.
fn capture<R>(stream: R, owner: String, name: &'static str) -> JoinHandle<String>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = BufReader::new(stream).lines();
        let mut captured = String::new();

        while let Ok(Some(line)) = lines.next_line().await {
            debug!(owner = %owner, stream = name, "{}", line);
            captured.push_str(&line);
            captured.push('\n');
        }

        captured
    })
}

async fn collect(handle: Option<JoinHandle<String>>) -> String {
    match handle {
        Some(handle) => handle.await.unwrap_or_default(),
        None => String::new(),
    }
}
