// tests/cancellation.rs

use std::error::Error;
use std::time::Duration;

use genspawn::action::ExecError;
use genspawn::exec::cancellation;
use genspawn::fs::mock::MockFileSystem;
use genspawn::report::Severity;
use genspawn_test_utils::builders::{out_file, GenRuleBuilder};
use genspawn_test_utils::fake_executor::{FakeExecutor, Script};
use genspawn_test_utils::{init_tracing, with_timeout, Harness};

type TestResult = Result<(), Box<dyn Error>>;

/// Cancelling a running spawn yields `Interrupted` and never reaches the
/// output checks, even though the declared output is missing.
#[tokio::test]
async fn cancel_during_spawn_is_interrupted_without_output_report() -> TestResult {
    init_tracing();

    let fs = MockFileSystem::new();
    let h = Harness::with_executor(
        fs.clone(),
        FakeExecutor::new(fs).with_default(Script::block_until_cancelled()),
    );
    let action = GenRuleBuilder::new("slow", "sleep 60 && touch out/b.txt")
        .output(out_file("b.txt"))
        .build();

    let (handle, signal) = cancellation();
    let ctx = h.context_with_cancel(signal);

    let canceller = async {
        tokio::time::sleep(Duration::from_millis(20)).await;
        handle.cancel();
    };
    let (result, ()) = with_timeout(async move { tokio::join!(action.execute(ctx), canceller) }).await;

    assert_eq!(result, Err(ExecError::Interrupted));
    assert_eq!(h.executor.spawn_count(), 1);
    assert!(
        h.reporter.errors().is_empty(),
        "interruption is not reported as an error"
    );

    let warnings = h.reporter.with_severity(Severity::Warning);
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].message.contains("interrupted"));
    assert_eq!(warnings[0].path, None);
    Ok(())
}

#[tokio::test]
async fn already_cancelled_context_never_spawns() -> TestResult {
    init_tracing();

    let h = Harness::new();
    let action = GenRuleBuilder::new("never", "true")
        .output(out_file("b.txt"))
        .build();

    let (handle, signal) = cancellation();
    handle.cancel();

    let result = with_timeout(action.execute(h.context_with_cancel(signal))).await;

    assert_eq!(result, Err(ExecError::Interrupted));
    assert_eq!(h.executor.spawn_count(), 0);
    Ok(())
}

/// A Ctrl-C delivered to the process group can kill the child before the
/// executor sees the signal; that still counts as an interruption.
#[tokio::test]
async fn killed_process_after_cancel_is_interrupted_not_failure() -> TestResult {
    init_tracing();

    let (handle, signal) = cancellation();
    let fs = MockFileSystem::new();
    let h = Harness::with_executor(
        fs.clone(),
        FakeExecutor::new(fs).with_default(Script::killed().cancels(handle)),
    );
    let action = GenRuleBuilder::new("victim", "sleep 60")
        .output(out_file("b.txt"))
        .build();

    let result = with_timeout(action.execute(h.context_with_cancel(signal))).await;

    assert_eq!(result, Err(ExecError::Interrupted));
    assert!(h.reporter.errors().is_empty());
    Ok(())
}

/// A spawn can finish cleanly after the cancel was requested; its outputs
/// are still not validated.
#[tokio::test]
async fn clean_exit_after_cancel_is_interrupted_without_output_checks() -> TestResult {
    init_tracing();

    let (handle, signal) = cancellation();
    let fs = MockFileSystem::new();
    let h = Harness::with_executor(
        fs.clone(),
        FakeExecutor::new(fs).with_default(Script::success().cancels(handle)),
    );
    let action = GenRuleBuilder::new("late", "true")
        .output(out_file("b.txt"))
        .build();

    let result = with_timeout(action.execute(h.context_with_cancel(signal))).await;

    assert_eq!(result, Err(ExecError::Interrupted));
    assert!(h.reporter.errors().is_empty(), "{:?}", h.reporter.errors());
    Ok(())
}

#[tokio::test]
async fn killed_process_without_cancel_is_a_command_failure() -> TestResult {
    init_tracing();

    let fs = MockFileSystem::new();
    let h = Harness::with_executor(
        fs.clone(),
        FakeExecutor::new(fs).with_default(Script::killed()),
    );
    let action = GenRuleBuilder::new("oom", "true")
        .output(out_file("b.txt"))
        .build();

    let result = with_timeout(action.execute(h.context())).await;

    assert!(matches!(
        result,
        Err(ExecError::CommandFailure { exit_code: None, .. })
    ));
    Ok(())
}

#[tokio::test]
async fn signal_from_dropped_handle_never_fires() -> TestResult {
    let (handle, signal) = cancellation();
    drop(handle);

    let waited = tokio::time::timeout(Duration::from_millis(20), signal.cancelled()).await;
    assert!(waited.is_err(), "dropping the handle is not a cancellation");
    assert!(!signal.is_cancelled());
    Ok(())
}

#[tokio::test]
async fn cancel_is_observed_by_every_signal() -> TestResult {
    let (handle, signal) = cancellation();
    let second = handle.signal();
    let cloned = signal.clone();

    handle.cancel();
    handle.cancel();

    with_timeout(signal.cancelled()).await;
    with_timeout(second.cancelled()).await;
    assert!(cloned.is_cancelled());
    assert!(handle.is_cancelled());
    Ok(())
}
