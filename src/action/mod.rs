// src/action/mod.rs

//! Actions: declared units of work and their execution.
//!
//! An [`Action`] is composed rather than subclassed:
//!
//! - [`ActionMetadata`]: owner, declared artifacts, resources, environment.
//! - [`SpawnBehavior`]: turns the metadata into a [`SpawnRequest`] and runs
//!   it through the context's executor.
//! - an optional [`ValidationPolicy`] whose `pre_check` / `post_check` wrap
//!   the spawn (see [`crate::genrule`]).
//!
//! `execute` always runs pre-check → spawn → post-check in that order, and
//! any failure short-circuits the remaining stages.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::errors::{GenspawnError, Result};
use crate::exec::{SpawnError, SpawnRequest};
use crate::report::{Event, Severity};

pub mod artifact;
pub mod command_line;
pub mod context;
pub mod error;
pub mod key;
pub mod owner;
pub mod resources;

pub use artifact::{Artifact, ArtifactRoot, DeclaredShape, RootKind};
pub use command_line::{expand_template, CommandLine, TemplateError, TemplateVars, DEFAULT_SHELL};
pub use context::ActionExecutionContext;
pub use error::{ExecError, ExecErrorKind};
pub use owner::ActionOwner;
pub use resources::{ResourceBudget, ResourceLease, ResourceSet};

/// Mnemonic of a plain spawn action.
pub const SPAWN_MNEMONIC: &str = "Action";

/// Number of trailing stderr lines carried on a [`ExecError::CommandFailure`].
const DIAGNOSTIC_TAIL_LINES: usize = 50;

/// Frozen, read-only description of an action.
#[derive(Debug, Clone)]
pub struct ActionMetadata {
    owner: ActionOwner,
    inputs: BTreeSet<Artifact>,
    outputs: BTreeSet<Artifact>,
    resources: ResourceSet,
    environment: BTreeMap<String, String>,
    execution_info: BTreeMap<String, String>,
    runfiles: BTreeMap<PathBuf, Artifact>,
    progress_message: String,
    mnemonic: String,
}

impl ActionMetadata {
    pub fn owner(&self) -> &ActionOwner {
        &self.owner
    }

    pub fn inputs(&self) -> &BTreeSet<Artifact> {
        &self.inputs
    }

    pub fn outputs(&self) -> &BTreeSet<Artifact> {
        &self.outputs
    }

    pub fn resource_set(&self) -> ResourceSet {
        self.resources
    }

    pub fn environment(&self) -> &BTreeMap<String, String> {
        &self.environment
    }

    pub fn execution_info(&self) -> &BTreeMap<String, String> {
        &self.execution_info
    }

    pub fn runfiles_manifests(&self) -> &BTreeMap<PathBuf, Artifact> {
        &self.runfiles
    }

    pub fn progress_message(&self) -> &str {
        &self.progress_message
    }

    pub fn mnemonic(&self) -> &str {
        &self.mnemonic
    }

    /// Build an event attributed to this action.
    pub fn event(&self, severity: Severity, message: impl Into<String>) -> Event {
        Event::new(severity, message, self.owner.clone(), self.mnemonic.clone())
    }
}

/// Checks that wrap the spawn of an action.
///
/// Implementations report every violation they find on
/// [`ActionExecutionContext::reporter`] before returning the error. Neither
/// hook may spawn processes.
pub trait ValidationPolicy: Send + Sync + fmt::Debug {
    /// Runs before anything is spawned.
    fn pre_check(&self, _action: &ActionMetadata, _ctx: &ActionExecutionContext) -> std::result::Result<(), ExecError> {
        Ok(())
    }

    /// Runs after a successful spawn only.
    fn post_check(&self, _action: &ActionMetadata, _ctx: &ActionExecutionContext) -> std::result::Result<(), ExecError> {
        Ok(())
    }
}

/// Summary of a successful execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionResult {
    pub exit_code: i32,
    /// Best effort; `None` if the executor could not measure it.
    pub wall_time: Option<Duration>,
    pub stdout: String,
    pub stderr: String,
}

/// The "spawn a command and wait for it" capability.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpawnBehavior {
    command_line: CommandLine,
}

impl SpawnBehavior {
    pub fn new(command_line: CommandLine) -> Self {
        Self { command_line }
    }

    pub fn command_line(&self) -> &CommandLine {
        &self.command_line
    }

    /// Resolve the command line and metadata into a concrete request.
    pub fn request(&self, action: &ActionMetadata) -> SpawnRequest {
        let (outputs, tree_outputs): (Vec<&Artifact>, Vec<&Artifact>) =
            action.outputs.iter().partition(|a| !a.is_tree());

        let runfiles_dir = if action.runfiles.is_empty() {
            None
        } else {
            action.outputs.iter().next().map(|first| {
                let mut dir = first.exec_path().into_os_string();
                dir.push(".runfiles");
                PathBuf::from(dir)
            })
        };

        SpawnRequest {
            mnemonic: action.mnemonic.clone(),
            owner: action.owner.label().to_string(),
            progress_message: action.progress_message.clone(),
            arguments: self.command_line.arguments(),
            environment: action.environment.clone(),
            execution_info: action.execution_info.clone(),
            runfiles_dir,
            runfiles: action
                .runfiles
                .iter()
                .map(|(link, target)| (link.clone(), target.exec_path()))
                .collect(),
            inputs: action.inputs.iter().map(Artifact::exec_path).collect(),
            outputs: outputs.into_iter().map(Artifact::exec_path).collect(),
            tree_outputs: tree_outputs.into_iter().map(Artifact::exec_path).collect(),
            resources: action.resources,
        }
    }

    /// Spawn the process once and wait for it.
    pub async fn run(
        &self,
        action: &ActionMetadata,
        ctx: &ActionExecutionContext,
    ) -> std::result::Result<ExecutionResult, ExecError> {
        let cancel = ctx.cancel_signal();
        if cancel.is_cancelled() {
            return Err(ExecError::Interrupted);
        }

        let request = self.request(action);
        match ctx.executor().spawn(request, cancel.clone()).await {
            // A build abort (e.g. Ctrl-C delivered to the whole process group)
            // can end the child before the executor observes the signal.
            // Outputs of an interrupted spawn are never validated.
            Ok(_) if cancel.is_cancelled() => Err(ExecError::Interrupted),
            Ok(result) if result.success() => Ok(ExecutionResult {
                exit_code: 0,
                wall_time: Some(result.wall_time),
                stdout: result.stdout,
                stderr: result.stderr,
            }),
            Ok(result) => Err(ExecError::CommandFailure {
                exit_code: result.exit_code,
                message: diagnostic_tail(&result.stderr),
            }),
            Err(SpawnError::Cancelled) => Err(ExecError::Interrupted),
            Err(err @ SpawnError::Launch { .. }) => Err(ExecError::CommandFailure {
                exit_code: None,
                message: err.to_string(),
            }),
            Err(SpawnError::Other(err)) => Err(ExecError::CommandFailure {
                exit_code: None,
                message: format!("{err:#}"),
            }),
        }
    }
}

fn diagnostic_tail(stderr: &str) -> String {
    let lines: Vec<&str> = stderr.lines().collect();
    let start = lines.len().saturating_sub(DIAGNOSTIC_TAIL_LINES);
    lines[start..].join("\n")
}

/// A declared unit of work.
///
/// Built once through [`ActionBuilder`] and never mutated afterwards. The
/// scheduler reads the metadata for admission and graph bookkeeping and calls
/// [`execute`](Self::execute) at most once per build.
#[derive(Debug, Clone)]
pub struct Action {
    metadata: ActionMetadata,
    spawn: SpawnBehavior,
    validation: Option<Arc<dyn ValidationPolicy>>,
}

impl Action {
    pub fn builder(owner: ActionOwner) -> ActionBuilder {
        ActionBuilder::new(owner)
    }

    pub fn metadata(&self) -> &ActionMetadata {
        &self.metadata
    }

    pub fn owner(&self) -> &ActionOwner {
        self.metadata.owner()
    }

    pub fn inputs(&self) -> &BTreeSet<Artifact> {
        self.metadata.inputs()
    }

    pub fn outputs(&self) -> &BTreeSet<Artifact> {
        self.metadata.outputs()
    }

    pub fn resource_set(&self) -> ResourceSet {
        self.metadata.resource_set()
    }

    pub fn environment(&self) -> &BTreeMap<String, String> {
        self.metadata.environment()
    }

    pub fn execution_info(&self) -> &BTreeMap<String, String> {
        self.metadata.execution_info()
    }

    pub fn runfiles_manifests(&self) -> &BTreeMap<PathBuf, Artifact> {
        self.metadata.runfiles_manifests()
    }

    pub fn progress_message(&self) -> &str {
        self.metadata.progress_message()
    }

    pub fn mnemonic(&self) -> &str {
        self.metadata.mnemonic()
    }

    pub fn command_line(&self) -> &CommandLine {
        self.spawn.command_line()
    }

    pub fn spawn_behavior(&self) -> &SpawnBehavior {
        &self.spawn
    }

    pub fn has_validation(&self) -> bool {
        self.validation.is_some()
    }

    /// Deterministic fingerprint of the declaration.
    pub fn key(&self) -> String {
        key::compute_action_key(self)
    }

    /// Execute the action: pre-check, spawn, post-check.
    ///
    /// The context is consumed; each execution attempt gets its own.
    pub async fn execute(
        &self,
        ctx: ActionExecutionContext,
    ) -> std::result::Result<ExecutionResult, ExecError> {
        let meta = &self.metadata;
        info!(
            owner = %meta.owner,
            mnemonic = %meta.mnemonic,
            "{}",
            meta.progress_message
        );

        if let Some(policy) = &self.validation {
            policy.pre_check(meta, &ctx)?;
        }

        let result = match self.spawn.run(meta, &ctx).await {
            Ok(result) => result,
            Err(err) => {
                self.report_spawn_failure(&ctx, &err);
                return Err(err);
            }
        };

        if let Some(policy) = &self.validation {
            policy.post_check(meta, &ctx)?;
        }

        debug!(
            owner = %meta.owner,
            mnemonic = %meta.mnemonic,
            elapsed_ms = result.wall_time.map(|d| d.as_millis() as u64),
            "action succeeded"
        );
        Ok(result)
    }

    fn report_spawn_failure(&self, ctx: &ActionExecutionContext, err: &ExecError) {
        let meta = &self.metadata;
        let event = if err.is_interrupted() {
            warn!(owner = %meta.owner, mnemonic = %meta.mnemonic, "action interrupted");
            meta.event(
                Severity::Warning,
                format!("{} interrupted", meta.progress_message),
            )
        } else {
            warn!(owner = %meta.owner, mnemonic = %meta.mnemonic, error = %err, "action failed");
            meta.event(
                Severity::Error,
                format!("{} failed: {err}", meta.progress_message),
            )
        };
        ctx.reporter().report(event);
    }
}

/// Builder-then-freeze construction of an [`Action`].
#[derive(Debug, Clone)]
pub struct ActionBuilder {
    owner: ActionOwner,
    inputs: Vec<Artifact>,
    outputs: Vec<Artifact>,
    resources: ResourceSet,
    command_line: Option<CommandLine>,
    environment: BTreeMap<String, String>,
    execution_info: BTreeMap<String, String>,
    runfiles: BTreeMap<PathBuf, Artifact>,
    progress_message: Option<String>,
    mnemonic: String,
    validation: Option<Arc<dyn ValidationPolicy>>,
}

impl ActionBuilder {
    pub fn new(owner: ActionOwner) -> Self {
        Self {
            owner,
            inputs: Vec::new(),
            outputs: Vec::new(),
            resources: ResourceSet::ZERO,
            command_line: None,
            environment: BTreeMap::new(),
            execution_info: BTreeMap::new(),
            runfiles: BTreeMap::new(),
            progress_message: None,
            mnemonic: SPAWN_MNEMONIC.to_string(),
            validation: None,
        }
    }

    pub fn input(mut self, artifact: Artifact) -> Self {
        self.inputs.push(artifact);
        self
    }

    pub fn inputs(mut self, artifacts: impl IntoIterator<Item = Artifact>) -> Self {
        self.inputs.extend(artifacts);
        self
    }

    pub fn output(mut self, artifact: Artifact) -> Self {
        self.outputs.push(artifact);
        self
    }

    pub fn outputs(mut self, artifacts: impl IntoIterator<Item = Artifact>) -> Self {
        self.outputs.extend(artifacts);
        self
    }

    pub fn resources(mut self, resources: ResourceSet) -> Self {
        self.resources = resources;
        self
    }

    pub fn command_line(mut self, command_line: CommandLine) -> Self {
        self.command_line = Some(command_line);
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.environment.insert(key.into(), value.into());
        self
    }

    pub fn environment(mut self, env: impl IntoIterator<Item = (String, String)>) -> Self {
        self.environment.extend(env);
        self
    }

    pub fn execution_info(mut self, info: impl IntoIterator<Item = (String, String)>) -> Self {
        self.execution_info.extend(info);
        self
    }

    pub fn runfile(mut self, path: impl Into<PathBuf>, artifact: Artifact) -> Self {
        self.runfiles.insert(path.into(), artifact);
        self
    }

    pub fn runfiles(mut self, runfiles: impl IntoIterator<Item = (PathBuf, Artifact)>) -> Self {
        self.runfiles.extend(runfiles);
        self
    }

    pub fn progress_message(mut self, message: impl Into<String>) -> Self {
        self.progress_message = Some(message.into());
        self
    }

    pub fn mnemonic(mut self, mnemonic: impl Into<String>) -> Self {
        self.mnemonic = mnemonic.into();
        self
    }

    pub fn validation(mut self, policy: Arc<dyn ValidationPolicy>) -> Self {
        self.validation = Some(policy);
        self
    }

    /// Check the declaration and freeze it.
    ///
    /// Rejects: no outputs, a missing or empty command line, an empty
    /// mnemonic, two distinct artifacts resolving to the same path, and an
    /// artifact that is both input and output.
    pub fn build(self) -> Result<Action> {
        let label = self.owner.label().to_string();
        let invalid = |msg: String| GenspawnError::InvalidAction(format!("{label}: {msg}"));

        if self.mnemonic.trim().is_empty() {
            return Err(invalid("mnemonic must not be empty".to_string()));
        }
        if self.outputs.is_empty() {
            return Err(invalid("an action must declare at least one output".to_string()));
        }
        let command_line = match self.command_line {
            Some(cl) if !cl.is_empty() => cl,
            _ => return Err(invalid("command line must not be empty".to_string())),
        };

        let inputs = dedup_artifacts(self.inputs, "input").map_err(invalid)?;
        let outputs = dedup_artifacts(self.outputs, "output").map_err(invalid)?;

        let input_paths: BTreeSet<PathBuf> = inputs.iter().map(Artifact::exec_path).collect();
        if let Some(clash) = outputs.iter().find(|o| input_paths.contains(&o.exec_path())) {
            return Err(invalid(format!(
                "'{clash}' is declared as both an input and an output"
            )));
        }

        let progress_message = self
            .progress_message
            .unwrap_or_else(|| format!("{} {}", self.mnemonic, self.owner));

        Ok(Action {
            metadata: ActionMetadata {
                owner: self.owner,
                inputs,
                outputs,
                resources: self.resources,
                environment: self.environment,
                execution_info: self.execution_info,
                runfiles: self.runfiles,
                progress_message,
                mnemonic: self.mnemonic,
            },
            spawn: SpawnBehavior::new(command_line),
            validation: self.validation,
        })
    }
}

/// Collapse identical artifacts; reject distinct ones that share a path.
fn dedup_artifacts(
    artifacts: Vec<Artifact>,
    what: &str,
) -> std::result::Result<BTreeSet<Artifact>, String> {
    let mut by_path: BTreeMap<PathBuf, Artifact> = BTreeMap::new();
    for artifact in artifacts {
        let path = artifact.exec_path();
        match by_path.get(&path) {
            Some(existing) if *existing != artifact => {
                return Err(format!(
                    "{what} '{}' is declared twice with different identities",
                    path.display()
                ));
            }
            Some(_) => {}
            None => {
                by_path.insert(path, artifact);
            }
        }
    }
    Ok(by_path.into_values().collect())
}
