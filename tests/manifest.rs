// tests/manifest.rs

use std::error::Error;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use genspawn::action::RootKind;
use genspawn::config::actions::DEFAULT_PATH;
use genspawn::config::{build_actions, load_and_validate, load_from_path, Manifest};
use genspawn::errors::GenspawnError;
use genspawn_test_utils::builders::{ManifestBuilder, RuleBuilder};

type TestResult = Result<(), Box<dyn Error>>;

fn write_manifest(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("create temp manifest");
    file.write_all(contents.as_bytes()).expect("write temp manifest");
    file
}

fn load(contents: &str) -> genspawn::errors::Result<Manifest> {
    let file = write_manifest(contents);
    load_and_validate(file.path())
}

#[test]
fn full_manifest_round_trips_defaults_and_fields() -> TestResult {
    let manifest = load(
        r#"
        [config]
        output_root = "gen"

        [config.resources]
        memory_mb = 1024.0
        cpu = 2.0

        [rule.copy]
        srcs = ["a.txt"]
        outs = ["b.txt"]
        cmd = "cp $< $@"
        env = { LANG = "C" }
        execution_info = { "no-remote" = "1" }
        message = "Copying a.txt"
        runfiles = { "data/a.txt" = "a.txt" }
        "#,
    )?;

    assert_eq!(manifest.config.output_root, PathBuf::from("gen"));
    assert_eq!(manifest.config.exec_root, PathBuf::from("."));
    assert_eq!(manifest.config.shell, "/bin/sh");
    assert!(!manifest.config.keep_going);
    assert_eq!(manifest.config.resources.memory_mb, 1024.0);
    assert_eq!(manifest.config.resources.cpu, 2.0);
    assert_eq!(manifest.config.resources.io, 1.0);

    let rule = &manifest.rule["copy"];
    assert_eq!(rule.srcs, vec!["a.txt"]);
    assert_eq!(rule.message.as_deref(), Some("Copying a.txt"));
    assert_eq!(rule.runfiles.get("data/a.txt").map(String::as_str), Some("a.txt"));
    Ok(())
}

#[test]
fn missing_file_is_an_io_error() {
    let err = load_from_path(Path::new("/definitely/not/Genspawn.toml")).expect_err("no file");
    assert!(matches!(err, GenspawnError::IoError(_)), "{err:?}");
}

#[test]
fn malformed_toml_and_unknown_rule_fields_are_parse_errors() {
    let err = load("[rule.x\ncmd = 1").expect_err("bad toml");
    assert!(matches!(err, GenspawnError::TomlError(_)), "{err:?}");

    let err = load(
        r#"
        [rule.x]
        outs = ["x"]
        cmd = "true"
        watch = ["*.rs"]
        "#,
    )
    .expect_err("unknown field");
    assert!(matches!(err, GenspawnError::TomlError(_)), "{err:?}");
}

#[test]
fn semantic_validation_errors() {
    let cases: &[(&str, &str)] = &[
        ("[config]\nshell = \"/bin/sh\"\n", "at least one [rule"),
        ("[rule.x]\ncmd = \"true\"\n", "must declare at least one"),
        ("[rule.x]\nouts = [\"x\"]\ncmd = \"  \"\n", "empty `cmd`"),
        ("[rule.x]\nsrcs = [\"../etc/passwd\"]\nouts = [\"x\"]\ncmd = \"true\"\n", "must be relative"),
        ("[rule.x]\nouts = [\"/abs\"]\ncmd = \"true\"\n", "must be relative"),
        ("[rule.x]\nsrcs = [\"x\"]\nouts = [\"x\"]\ncmd = \"true\"\n", "consumes its own output"),
        ("[config]\nshell = \"\"\n[rule.x]\nouts = [\"x\"]\ncmd = \"true\"\n", "shell"),
    ];

    for (toml, needle) in cases {
        match load(toml) {
            Err(GenspawnError::ConfigError(msg)) => {
                assert!(msg.contains(needle), "{msg:?} should mention {needle:?}")
            }
            other => panic!("expected ConfigError for {toml:?}, got {other:?}"),
        }
    }
}

#[test]
fn negative_budget_is_rejected() {
    let err = load(
        r#"
        [config.resources]
        memory_mb = -1.0

        [rule.x]
        outs = ["x"]
        cmd = "true"
        "#,
    )
    .expect_err("negative memory");
    assert!(matches!(err, GenspawnError::InvalidResources(_)), "{err:?}");
}

#[test]
fn duplicate_outputs_are_rejected() {
    let err = load(
        r#"
        [rule.a]
        outs = ["x"]
        cmd = "true"

        [rule.b]
        tree_outs = ["x"]
        cmd = "true"
        "#,
    )
    .expect_err("x produced twice");

    match err {
        GenspawnError::DuplicateOutput { path, first, second } => {
            assert_eq!(path, "x");
            assert_eq!(first, "a");
            assert_eq!(second, "b");
        }
        other => panic!("expected DuplicateOutput, got {other:?}"),
    }
}

#[test]
fn dependency_cycles_are_rejected() {
    let raw = ManifestBuilder::new()
        .with_rule("a", RuleBuilder::new("true").src("y").out("x").build())
        .with_rule("b", RuleBuilder::new("true").src("x").out("y").build())
        .build_raw();

    let err = Manifest::try_from(raw).expect_err("a <-> b");
    assert!(matches!(err, GenspawnError::GraphCycle(_)), "{err:?}");
}

#[test]
fn build_actions_resolves_generated_inputs_and_expands_commands() -> TestResult {
    let manifest = ManifestBuilder::new()
        .with_rule(
            "gen",
            RuleBuilder::new("echo hi > $@").out("hello.txt").build(),
        )
        .with_rule(
            "copy",
            RuleBuilder::new("cp $(SRCS) $(@D)/copy.txt")
                .src("hello.txt")
                .src("notes.md")
                .out("copy.txt")
                .env("LANG", "C")
                .build(),
        )
        .build();

    let actions = build_actions(&manifest, Some(Path::new("Genspawn.toml")))?;
    assert_eq!(actions.len(), 2);

    // Rule-name order.
    let copy = &actions[0];
    let generator = &actions[1];
    assert_eq!(copy.owner().label(), "copy");
    assert_eq!(generator.owner().label(), "gen");
    assert_eq!(copy.owner().location(), Some("Genspawn.toml[rule.copy]"));

    let kinds: Vec<(String, RootKind)> = copy
        .inputs()
        .iter()
        .map(|a| (a.to_string(), a.root().kind()))
        .collect();
    assert!(kinds.contains(&("out/hello.txt".to_string(), RootKind::Output)));
    assert!(kinds.contains(&("notes.md".to_string(), RootKind::Source)));

    assert_eq!(
        copy.command_line().arguments(),
        vec!["/bin/sh", "-c", "cp out/hello.txt notes.md out/copy.txt"]
    );
    assert_eq!(generator.command_line().arguments()[2], "echo hi > out/hello.txt");

    assert_eq!(copy.environment().get("LANG").map(String::as_str), Some("C"));
    assert_eq!(
        copy.environment().get("PATH").map(String::as_str),
        Some(DEFAULT_PATH)
    );
    assert_eq!(copy.progress_message(), "Executing genrule copy");
    Ok(())
}

#[test]
fn rule_path_overrides_default_path_and_message() -> TestResult {
    let manifest = ManifestBuilder::new()
        .with_rule(
            "x",
            RuleBuilder::new("true")
                .out("x")
                .env("PATH", "/opt/bin")
                .message("Making x")
                .build(),
        )
        .build();

    let actions = build_actions(&manifest, None)?;
    assert_eq!(
        actions[0].environment().get("PATH").map(String::as_str),
        Some("/opt/bin")
    );
    assert_eq!(actions[0].progress_message(), "Making x");
    assert_eq!(actions[0].owner().location(), None);
    Ok(())
}

#[test]
fn bad_template_is_a_config_error() {
    let manifest = ManifestBuilder::new()
        .with_rule(
            "two",
            RuleBuilder::new("cp $< $@").src("a").src("b").out("c").build(),
        )
        .build();

    match build_actions(&manifest, None) {
        Err(GenspawnError::ConfigError(msg)) => {
            assert!(msg.contains("rule 'two'"), "{msg}");
            assert!(msg.contains("$<"), "{msg}");
        }
        other => panic!("expected ConfigError, got {other:?}"),
    }
}
