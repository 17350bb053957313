// tests/genrule_validation.rs

use std::error::Error;
use std::path::PathBuf;

use genspawn::action::{ExecError, ExecErrorKind};
use genspawn::fs::mock::MockFileSystem;
use genspawn::report::Severity;
use genspawn_test_utils::builders::{out_file, out_tree, src_file, src_tree, GenRuleBuilder};
use genspawn_test_utils::fake_executor::{FakeExecutor, Script};
use genspawn_test_utils::{init_tracing, with_timeout, Harness};

type TestResult = Result<(), Box<dyn Error>>;

fn harness(fs: MockFileSystem, script: Script) -> Harness {
    Harness::with_executor(fs.clone(), FakeExecutor::new(fs).with_default(script))
}

/// `cp a.txt b.txt` where a.txt is a regular file and the command produces
/// b.txt as a regular file.
#[tokio::test]
async fn copy_of_regular_file_succeeds_without_events() -> TestResult {
    init_tracing();

    let fs = MockFileSystem::new();
    fs.add_file("a.txt", b"hello".to_vec());
    let h = harness(fs, Script::success().writes_file("out/b.txt"));

    let action = GenRuleBuilder::new("copy", "cp a.txt out/b.txt")
        .input(src_file("a.txt"))
        .output(out_file("b.txt"))
        .build();

    let result = with_timeout(action.execute(h.context())).await?;

    assert_eq!(result.exit_code, 0);
    assert!(result.wall_time.is_some());
    assert_eq!(h.executor.spawn_count(), 1);
    assert!(h.reporter.events().is_empty(), "no events on success");
    Ok(())
}

#[tokio::test]
async fn zero_inputs_one_output_succeeds() -> TestResult {
    init_tracing();

    let h = harness(MockFileSystem::new(), Script::success().writes_file("out/stamp"));
    let action = GenRuleBuilder::new("stamp", "date > out/stamp")
        .output(out_file("stamp"))
        .build();

    let result = with_timeout(action.execute(h.context())).await?;

    assert_eq!(result.exit_code, 0);
    assert_eq!(h.executor.spawn_count(), 1);
    Ok(())
}

/// a.txt is a directory on disk: the action fails before spawning and the
/// report names the path.
#[tokio::test]
async fn directory_input_fails_before_spawn() -> TestResult {
    init_tracing();

    let fs = MockFileSystem::new();
    fs.add_dir("a.txt");
    let h = harness(fs, Script::success().writes_file("out/b.txt"));

    let action = GenRuleBuilder::new("copy", "cp a.txt out/b.txt")
        .input(src_file("a.txt"))
        .output(out_file("b.txt"))
        .build();

    let err = with_timeout(action.execute(h.context()))
        .await
        .expect_err("directory input must fail");

    assert_eq!(
        err,
        ExecError::InputIsDirectory {
            path: PathBuf::from("a.txt")
        }
    );
    assert_eq!(h.executor.spawn_count(), 0, "nothing may be spawned");

    let errors = h.reporter.errors();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].path, Some(PathBuf::from("a.txt")));
    assert_eq!(errors[0].owner.label(), "copy");
    assert_eq!(errors[0].mnemonic, "Genrule");
    assert!(errors[0].message.contains("a.txt"));
    Ok(())
}

#[tokio::test]
async fn generated_directory_input_is_also_rejected() -> TestResult {
    init_tracing();

    let fs = MockFileSystem::new();
    fs.add_dir("out/gen");
    let h = harness(fs, Script::success().writes_file("out/b.txt"));

    let action = GenRuleBuilder::new("consume", "cat out/gen > out/b.txt")
        .input(out_file("gen"))
        .output(out_file("b.txt"))
        .build();

    let err = with_timeout(action.execute(h.context()))
        .await
        .expect_err("directory input must fail");

    assert_eq!(err.kind(), ExecErrorKind::InputIsDirectory);
    assert_eq!(err.path(), Some(&PathBuf::from("out/gen")));
    assert_eq!(h.executor.spawn_count(), 0);
    Ok(())
}

/// `mkdir b.txt` exits 0 but leaves a directory where a file was declared.
#[tokio::test]
async fn directory_output_fails_after_successful_spawn() -> TestResult {
    init_tracing();

    let fs = MockFileSystem::new();
    fs.add_file("a.txt", b"hello".to_vec());
    let h = harness(fs, Script::success().makes_dir("out/b.txt"));

    let action = GenRuleBuilder::new("mkdir", "mkdir out/b.txt")
        .input(src_file("a.txt"))
        .output(out_file("b.txt"))
        .build();

    let err = with_timeout(action.execute(h.context()))
        .await
        .expect_err("directory output must fail");

    assert_eq!(
        err,
        ExecError::OutputIsDirectory {
            path: PathBuf::from("out/b.txt")
        }
    );
    assert_eq!(h.executor.spawn_count(), 1);

    let errors = h.reporter.errors();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].path, Some(PathBuf::from("out/b.txt")));
    Ok(())
}

#[tokio::test]
async fn missing_output_fails_after_successful_spawn() -> TestResult {
    init_tracing();

    let h = harness(MockFileSystem::new(), Script::success());
    let action = GenRuleBuilder::new("forgetful", "true")
        .output(out_file("b.txt"))
        .build();

    let err = with_timeout(action.execute(h.context()))
        .await
        .expect_err("missing output must fail");

    assert_eq!(err.kind(), ExecErrorKind::OutputMissing);
    assert_eq!(err.path(), Some(&PathBuf::from("out/b.txt")));
    assert_eq!(h.executor.spawn_count(), 1);
    Ok(())
}

/// Every violation is reported; the first one is returned.
#[tokio::test]
async fn every_output_violation_is_reported() -> TestResult {
    init_tracing();

    let h = harness(MockFileSystem::new(), Script::success().makes_dir("out/b.txt"));
    let action = GenRuleBuilder::new("two", "true")
        .output(out_file("a.txt"))
        .output(out_file("b.txt"))
        .build();

    let err = with_timeout(action.execute(h.context()))
        .await
        .expect_err("both outputs are wrong");

    assert_eq!(
        err,
        ExecError::OutputMissing {
            path: PathBuf::from("out/a.txt")
        }
    );

    let paths: Vec<Option<PathBuf>> = h.reporter.errors().into_iter().map(|e| e.path).collect();
    assert_eq!(
        paths,
        vec![
            Some(PathBuf::from("out/a.txt")),
            Some(PathBuf::from("out/b.txt"))
        ]
    );
    Ok(())
}

#[tokio::test]
async fn declared_trees_are_exempt_from_file_checks() -> TestResult {
    init_tracing();

    let fs = MockFileSystem::new();
    fs.add_dir("assets");
    fs.add_file("assets/logo.png", b"png".to_vec());
    let h = harness(fs, Script::success().makes_dir("out/bundle"));

    let action = GenRuleBuilder::new("bundle", "cp -r assets out/bundle")
        .input(src_tree("assets"))
        .output(out_tree("bundle"))
        .build();

    let result = with_timeout(action.execute(h.context())).await?;

    assert_eq!(result.exit_code, 0);
    assert!(h.reporter.events().is_empty());
    Ok(())
}

#[tokio::test]
async fn declared_tree_output_must_still_exist() -> TestResult {
    init_tracing();

    let h = harness(MockFileSystem::new(), Script::success());
    let action = GenRuleBuilder::new("bundle", "true")
        .output(out_tree("bundle"))
        .build();

    let err = with_timeout(action.execute(h.context()))
        .await
        .expect_err("tree output was never created");

    assert_eq!(err.kind(), ExecErrorKind::OutputMissing);
    Ok(())
}

#[tokio::test]
async fn non_zero_exit_is_a_command_failure_and_skips_output_checks() -> TestResult {
    init_tracing();

    let h = harness(MockFileSystem::new(), Script::exit(2, "cp: cannot stat 'a.txt'\n"));
    let action = GenRuleBuilder::new("copy", "cp a.txt out/b.txt")
        .output(out_file("b.txt"))
        .build();

    let err = with_timeout(action.execute(h.context()))
        .await
        .expect_err("exit 2 must fail");

    match &err {
        ExecError::CommandFailure { exit_code, message } => {
            assert_eq!(*exit_code, Some(2));
            assert!(message.contains("cannot stat"));
        }
        other => panic!("expected CommandFailure, got {other:?}"),
    }

    // One report for the failure itself; no OutputMissing report.
    let errors = h.reporter.errors();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].path, None);
    assert!(errors[0].message.contains("exit code 2"));
    Ok(())
}

#[tokio::test]
async fn launch_failure_is_a_command_failure_without_exit_code() -> TestResult {
    init_tracing();

    let h = harness(MockFileSystem::new(), Script::launch_failure("No such file or directory"));
    let action = GenRuleBuilder::new("broken", "true")
        .output(out_file("b.txt"))
        .build();

    let err = with_timeout(action.execute(h.context()))
        .await
        .expect_err("launch failure must fail");

    assert_eq!(err.kind(), ExecErrorKind::CommandFailure);
    assert!(matches!(err, ExecError::CommandFailure { exit_code: None, .. }));
    assert!(err.to_string().contains("No such file or directory"));
    Ok(())
}

#[tokio::test]
async fn spawn_request_carries_declaration() -> TestResult {
    init_tracing();

    let fs = MockFileSystem::new();
    fs.add_file("a.txt", b"hello".to_vec());
    let h = harness(fs, Script::success().writes_declared_outputs());

    let action = GenRuleBuilder::new("copy", "cp a.txt out/b.txt")
        .input(src_file("a.txt"))
        .output(out_file("b.txt"))
        .env("LANG", "C")
        .build();

    with_timeout(action.execute(h.context())).await?;

    let requests = h.executor.requests();
    assert_eq!(requests.len(), 1);
    let req = &requests[0];
    assert_eq!(req.mnemonic, "Genrule");
    assert_eq!(req.owner, "copy");
    assert_eq!(req.arguments, vec!["/bin/sh", "-c", "cp a.txt out/b.txt"]);
    assert_eq!(req.environment.get("LANG").map(String::as_str), Some("C"));
    assert_eq!(req.inputs, vec![PathBuf::from("a.txt")]);
    assert_eq!(req.outputs, vec![PathBuf::from("out/b.txt")]);
    assert!(req.tree_outputs.is_empty());
    assert_eq!(req.progress_message, "Executing genrule copy");

    assert!(h.reporter.with_severity(Severity::Error).is_empty());
    Ok(())
}
