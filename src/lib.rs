// src/lib.rs

pub mod action;
pub mod cli;
pub mod config;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod genrule;
pub mod graph;
pub mod logging;
pub mod report;
pub mod runner;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Result};
use tracing::{debug, info};

use crate::action::{ResourceBudget, ResourceSet};
use crate::cli::CliArgs;
use crate::config::{build_actions, load_and_validate, Manifest};
use crate::exec::{cancellation, LocalExecutor};
use crate::fs::RealFileSystem;
use crate::graph::ActionGraph;
use crate::report::ChannelReporter;
use crate::runner::{BuildRunner, RunnerOptions};

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - manifest loading
/// - action graph construction
/// - local executor, filesystem probe and reporting channel
/// - Ctrl-C handling
pub async fn run(args: CliArgs) -> Result<()> {
    let manifest_path = PathBuf::from(&args.manifest);
    let manifest = load_and_validate(&manifest_path)?;
    let actions = build_actions(&manifest, Some(&manifest_path))?;
    let graph = ActionGraph::new(actions)?;

    if args.dry_run {
        print_dry_run(&manifest, &graph);
        return Ok(());
    }

    let exec_root = exec_root_dir(&manifest_path, &manifest.config.exec_root);
    info!(exec_root = ?exec_root, actions = graph.len(), "loaded manifest");

    let resources = &manifest.config.resources;
    let budget = ResourceBudget::new(ResourceSet::try_new(
        resources.memory_mb,
        resources.cpu,
        resources.io,
    )?);

    // Diagnostics go to the user on stderr, one line per event.
    let (reporter, mut events) = ChannelReporter::channel();
    let printer = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            eprintln!("{event}");
        }
    });

    // Ctrl-C → cancel the in-flight action.
    let (cancel, signal) = cancellation();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            eprintln!("failed to listen for Ctrl+C: {e}");
            return;
        }
        cancel.cancel();
    });

    let options = RunnerOptions {
        keep_going: args.keep_going || manifest.config.keep_going,
    };
    let runner = BuildRunner::new(
        Arc::new(LocalExecutor::new(&exec_root)),
        Arc::new(reporter),
        Arc::new(RealFileSystem::new(&exec_root)),
        budget,
    )
    .with_cancel(signal)
    .with_options(options);

    let summary = runner.run(&graph).await;

    // Dropping the runner closes the channel, which ends the printer.
    drop(runner);
    let _ = printer.await;

    if !summary.is_success() {
        bail!(
            "build failed: {} succeeded, {} failed, {} skipped",
            summary.succeeded(),
            summary.failed(),
            summary.skipped()
        );
    }
    Ok(())
}

/// Resolve `exec_root` against the directory containing the manifest.
///
/// A bare manifest filename like "Genspawn.toml" (parent = "") resolves
/// against the current working directory.
fn exec_root_dir(manifest_path: &Path, exec_root: &Path) -> PathBuf {
    if exec_root.is_absolute() {
        return exec_root.to_path_buf();
    }
    match manifest_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.join(exec_root),
        _ => exec_root.to_path_buf(),
    }
}

/// Dry-run output: print every action in execution order.
fn print_dry_run(manifest: &Manifest, graph: &ActionGraph) {
    println!("genspawn dry-run");
    println!("  config.exec_root = {}", manifest.config.exec_root.display());
    println!("  config.output_root = {}", manifest.config.output_root.display());
    println!("  config.keep_going = {}", manifest.config.keep_going);
    println!();

    println!("actions ({}):", graph.len());
    for &idx in graph.topological_order() {
        let action = &graph.actions()[idx];
        println!("  - {} [{}]", action.owner(), action.mnemonic());
        println!("      key: {}", action.key());
        println!("      argv: {:?}", action.command_line().arguments());
        if !action.inputs().is_empty() {
            let inputs: Vec<String> = action.inputs().iter().map(|a| a.to_string()).collect();
            println!("      inputs: {:?}", inputs);
        }
        let outputs: Vec<String> = action.outputs().iter().map(|a| a.to_string()).collect();
        println!("      outputs: {:?}", outputs);
        let deps: Vec<String> = graph
            .dependencies_of(idx)
            .iter()
            .map(|&d| graph.actions()[d].owner().to_string())
            .collect();
        if !deps.is_empty() {
            println!("      after: {:?}", deps);
        }
    }

    debug!("dry-run complete (no execution)");
}
