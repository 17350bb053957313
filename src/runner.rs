// src/runner.rs

//! Minimal driver that executes an [`ActionGraph`] one action at a time.
//!
//! The runner executes actions sequentially. For each action, in topological
//! order, it:
//!
//! 1. skips the action if a dependency failed (or the build is stopping),
//! 2. waits for its declared resources on the [`ResourceBudget`],
//! 3. executes it with a fresh [`ActionExecutionContext`].

use std::sync::Arc;

use tracing::{error, info, warn};

use crate::action::{
    ActionExecutionContext, ExecError, ExecutionResult, ResourceBudget,
};
use crate::exec::{CancelSignal, Executor};
use crate::fs::FilesystemProbe;
use crate::graph::ActionGraph;
use crate::report::{Reporter, Severity};

#[derive(Debug, Clone, Copy, Default)]
pub struct RunnerOptions {
    /// Continue with independent actions after a failure.
    pub keep_going: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome {
    Succeeded(ExecutionResult),
    Failed(ExecError),
    Skipped { reason: String },
}

/// Per-action outcome, in execution order.
#[derive(Debug, Clone, Default)]
pub struct BuildSummary {
    pub outcomes: Vec<(String, ActionOutcome)>,
}

impl BuildSummary {
    pub fn succeeded(&self) -> usize {
        self.count(|o| matches!(o, ActionOutcome::Succeeded(_)))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, ActionOutcome::Failed(_)))
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, ActionOutcome::Skipped { .. }))
    }

    pub fn is_success(&self) -> bool {
        self.failed() == 0 && self.skipped() == 0
    }

    /// Outcome of the action owned by `label`, if it was visited.
    pub fn outcome_of(&self, label: &str) -> Option<&ActionOutcome> {
        self.outcomes
            .iter()
            .find(|(owner, _)| owner == label)
            .map(|(_, outcome)| outcome)
    }

    fn count(&self, pred: impl Fn(&ActionOutcome) -> bool) -> usize {
        self.outcomes.iter().filter(|(_, o)| pred(o)).count()
    }
}

pub struct BuildRunner {
    executor: Arc<dyn Executor>,
    reporter: Arc<dyn Reporter>,
    fs: Arc<dyn FilesystemProbe>,
    budget: ResourceBudget,
    cancel: CancelSignal,
    options: RunnerOptions,
}

impl BuildRunner {
    pub fn new(
        executor: Arc<dyn Executor>,
        reporter: Arc<dyn Reporter>,
        fs: Arc<dyn FilesystemProbe>,
        budget: ResourceBudget,
    ) -> Self {
        Self {
            executor,
            reporter,
            fs,
            budget,
            cancel: CancelSignal::never(),
            options: RunnerOptions::default(),
        }
    }

    pub fn with_cancel(mut self, cancel: CancelSignal) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_options(mut self, options: RunnerOptions) -> Self {
        self.options = options;
        self
    }

    pub async fn run(&self, graph: &ActionGraph) -> BuildSummary {
        let actions = graph.actions();
        let mut blocked = vec![false; actions.len()];
        let mut stop_reason: Option<String> = None;
        let mut summary = BuildSummary::default();

        info!(actions = actions.len(), "starting build");

        for &idx in graph.topological_order() {
            let action = &actions[idx];
            let label = action.owner().label().to_string();

            let skip_reason = if let Some(reason) = &stop_reason {
                Some(reason.clone())
            } else if self.cancel.is_cancelled() {
                Some("build interrupted".to_string())
            } else {
                graph
                    .dependencies_of(idx)
                    .iter()
                    .find(|&&dep| blocked[dep])
                    .map(|&dep| format!("dependency '{}' did not build", actions[dep].owner()))
            };

            if let Some(reason) = skip_reason {
                info!(owner = %label, reason = %reason, "skipping action");
                self.reporter.report(
                    action
                        .metadata()
                        .event(Severity::Info, format!("skipped: {reason}")),
                );
                blocked[idx] = true;
                summary.outcomes.push((label, ActionOutcome::Skipped { reason }));
                continue;
            }

            let lease = self.budget.acquire(&action.resource_set()).await;
            let ctx = ActionExecutionContext::new(
                Arc::clone(&self.executor),
                Arc::clone(&self.reporter),
                Arc::clone(&self.fs),
            )
            .with_cancel(self.cancel.clone());

            let outcome = match action.execute(ctx).await {
                Ok(result) => ActionOutcome::Succeeded(result),
                Err(err) => {
                    blocked[idx] = true;
                    if err.is_interrupted() {
                        warn!(owner = %label, "build interrupted");
                        stop_reason = Some("build interrupted".to_string());
                    } else {
                        error!(owner = %label, kind = %err.kind(), error = %err, "action failed");
                        if !self.options.keep_going {
                            stop_reason = Some(format!("build stopped after '{label}' failed"));
                        }
                    }
                    ActionOutcome::Failed(err)
                }
            };
            drop(lease);

            summary.outcomes.push((label, outcome));
        }

        info!(
            succeeded = summary.succeeded(),
            failed = summary.failed(),
            skipped = summary.skipped(),
            "build finished"
        );
        summary
    }
}
