pub mod builders;
pub mod fake_executor;

use std::sync::{Arc, Once};

use genspawn::action::ActionExecutionContext;
use genspawn::exec::CancelSignal;
use genspawn::fs::mock::MockFileSystem;
use tracing_subscriber::{fmt, EnvFilter};

use crate::fake_executor::{FakeExecutor, RecordingReporter};

static INIT: Once = Once::new();

/// Initialise tracing for tests.
///
/// - Uses `with_test_writer()`, so logs are captured per-test.
/// - The Rust test harness only prints captured output for **failing** tests
///   (unless you run with `-- --nocapture`).
///
/// Enable levels with e.g.:
/// `RUST_LOG=debug cargo test`
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        fmt()
            .with_env_filter(filter)
            .with_test_writer() // print only for failing tests unless --nocapture
            .with_target(true)
            .init();
    });
}

/// Run a future with a 5-second timeout.
pub async fn with_timeout<F, T>(f: F) -> T
where
    F: std::future::Future<Output = T>,
{
    tokio::time::timeout(std::time::Duration::from_secs(5), f)
        .await
        .expect("Test timed out after 5 seconds")
}

/// The three collaborators an action test usually needs, sharing one
/// in-memory filesystem.
#[derive(Debug, Clone)]
pub struct Harness {
    pub fs: MockFileSystem,
    pub executor: Arc<FakeExecutor>,
    pub reporter: Arc<RecordingReporter>,
}

impl Harness {
    /// Fresh filesystem, an executor that succeeds without side effects,
    /// and an empty reporter.
    pub fn new() -> Self {
        let fs = MockFileSystem::new();
        Self::with_executor(fs.clone(), FakeExecutor::new(fs))
    }

    pub fn with_executor(fs: MockFileSystem, executor: FakeExecutor) -> Self {
        Self {
            fs,
            executor: Arc::new(executor),
            reporter: Arc::new(RecordingReporter::default()),
        }
    }

    pub fn context(&self) -> ActionExecutionContext {
        ActionExecutionContext::new(
            self.executor.clone(),
            self.reporter.clone(),
            Arc::new(self.fs.clone()),
        )
    }

    pub fn context_with_cancel(&self, cancel: CancelSignal) -> ActionExecutionContext {
        self.context().with_cancel(cancel)
    }
}

impl Default for Harness {
    fn default() -> Self {
        Self::new()
    }
}
