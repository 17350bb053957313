use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use genspawn::exec::{
    CancelHandle, CancelSignal, Executor, ProcessResult, SpawnError, SpawnFuture, SpawnRequest,
};
use genspawn::fs::mock::MockFileSystem;
use genspawn::report::{Event, Reporter, Severity};

/// Something the fake "command" does to the filesystem before it exits.
#[derive(Debug, Clone)]
pub enum SideEffect {
    WriteFile(PathBuf),
    MakeDir(PathBuf),
    Remove(PathBuf),
    /// Write every declared file output and create every tree output.
    WriteDeclaredOutputs,
    /// Request cancellation while the process is "running", as a Ctrl-C
    /// delivered to the whole process group would.
    Cancel(CancelHandle),
}

/// How the fake process terminates.
#[derive(Debug, Clone)]
pub enum FakeOutcome {
    Exit { code: i32, stderr: String },
    /// Killed by a signal: no exit code.
    Killed,
    /// Pend until the cancel signal fires, then resolve to `Cancelled`.
    BlockUntilCancelled,
    LaunchFailure(String),
}

#[derive(Debug, Clone)]
pub struct Script {
    pub effects: Vec<SideEffect>,
    pub outcome: FakeOutcome,
}

impl Script {
    pub fn success() -> Self {
        Self::exit(0, "")
    }

    pub fn exit(code: i32, stderr: &str) -> Self {
        Self {
            effects: vec![],
            outcome: FakeOutcome::Exit {
                code,
                stderr: stderr.to_string(),
            },
        }
    }

    pub fn killed() -> Self {
        Self {
            effects: vec![],
            outcome: FakeOutcome::Killed,
        }
    }

    pub fn block_until_cancelled() -> Self {
        Self {
            effects: vec![],
            outcome: FakeOutcome::BlockUntilCancelled,
        }
    }

    pub fn launch_failure(message: &str) -> Self {
        Self {
            effects: vec![],
            outcome: FakeOutcome::LaunchFailure(message.to_string()),
        }
    }

    pub fn writes_file(mut self, path: &str) -> Self {
        self.effects.push(SideEffect::WriteFile(PathBuf::from(path)));
        self
    }

    pub fn makes_dir(mut self, path: &str) -> Self {
        self.effects.push(SideEffect::MakeDir(PathBuf::from(path)));
        self
    }

    pub fn removes(mut self, path: &str) -> Self {
        self.effects.push(SideEffect::Remove(PathBuf::from(path)));
        self
    }

    pub fn writes_declared_outputs(mut self) -> Self {
        self.effects.push(SideEffect::WriteDeclaredOutputs);
        self
    }

    pub fn cancels(mut self, handle: CancelHandle) -> Self {
        self.effects.push(SideEffect::Cancel(handle));
        self
    }
}

/// A fake executor that:
/// - records every request it was asked to spawn
/// - applies a scripted set of side effects to a shared [`MockFileSystem`]
/// - terminates the way the script says.
///
/// Scripts are chosen by the owner label of the request, falling back to a
/// default.
#[derive(Debug)]
pub struct FakeExecutor {
    fs: MockFileSystem,
    default: Script,
    per_owner: HashMap<String, Script>,
    requests: Arc<Mutex<Vec<SpawnRequest>>>,
}

impl FakeExecutor {
    pub fn new(fs: MockFileSystem) -> Self {
        Self {
            fs,
            default: Script::success(),
            per_owner: HashMap::new(),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_default(mut self, script: Script) -> Self {
        self.default = script;
        self
    }

    pub fn with_script(mut self, owner: &str, script: Script) -> Self {
        self.per_owner.insert(owner.to_string(), script);
        self
    }

    pub fn spawn_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<SpawnRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Owner labels in spawn order.
    pub fn spawned_owners(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.owner.clone())
            .collect()
    }

    fn apply(&self, effect: &SideEffect, request: &SpawnRequest) {
        match effect {
            SideEffect::WriteFile(path) => self.fs.add_file(path, b"generated".to_vec()),
            SideEffect::MakeDir(path) => self.fs.add_dir(path),
            SideEffect::Remove(path) => self.fs.remove(path),
            SideEffect::WriteDeclaredOutputs => {
                for out in &request.outputs {
                    self.fs.add_file(out, b"generated".to_vec());
                }
                for tree in &request.tree_outputs {
                    self.fs.add_dir(tree);
                }
            }
            SideEffect::Cancel(handle) => handle.cancel(),
        }
    }
}

impl Executor for FakeExecutor {
    fn spawn(&self, request: SpawnRequest, cancel: CancelSignal) -> SpawnFuture<'_> {
        Box::pin(async move {
            let script = self
                .per_owner
                .get(&request.owner)
                .unwrap_or(&self.default)
                .clone();
            self.requests.lock().unwrap().push(request.clone());

            if let FakeOutcome::LaunchFailure(message) = &script.outcome {
                return Err(SpawnError::Launch {
                    program: request.arguments.first().cloned().unwrap_or_default(),
                    message: message.clone(),
                });
            }

            for effect in &script.effects {
                self.apply(effect, &request);
            }

            let exit_code = match script.outcome {
                FakeOutcome::Exit { code, stderr } => {
                    return Ok(ProcessResult {
                        exit_code: Some(code),
                        stdout: String::new(),
                        stderr,
                        wall_time: Duration::from_millis(1),
                    });
                }
                FakeOutcome::Killed => None,
                FakeOutcome::BlockUntilCancelled => {
                    cancel.cancelled().await;
                    return Err(SpawnError::Cancelled);
                }
                FakeOutcome::LaunchFailure(_) => unreachable!("handled above"),
            };

            Ok(ProcessResult {
                exit_code,
                stdout: String::new(),
                stderr: "killed".to_string(),
                wall_time: Duration::from_millis(1),
            })
        })
    }
}

/// Reporter that keeps every event in memory.
#[derive(Debug, Default, Clone)]
pub struct RecordingReporter {
    events: Arc<Mutex<Vec<Event>>>,
}

impl RecordingReporter {
    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    pub fn with_severity(&self, severity: Severity) -> Vec<Event> {
        self.events()
            .into_iter()
            .filter(|e| e.severity == severity)
            .collect()
    }

    pub fn errors(&self) -> Vec<Event> {
        self.with_severity(Severity::Error)
    }
}

impl Reporter for RecordingReporter {
    fn report(&self, event: Event) {
        self.events.lock().unwrap().push(event);
    }
}
