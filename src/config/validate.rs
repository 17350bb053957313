// src/config/validate.rs

use std::collections::BTreeMap;
use std::path::{Component, Path};

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::action::ResourceSet;
use crate::config::model::{Manifest, RawManifest, RuleConfig};
use crate::errors::{GenspawnError, Result};

impl TryFrom<RawManifest> for Manifest {
    type Error = GenspawnError;

    fn try_from(raw: RawManifest) -> std::result::Result<Self, Self::Error> {
        validate_raw_manifest(&raw)?;
        Ok(Manifest::new_unchecked(raw.config, raw.rule))
    }
}

fn validate_raw_manifest(manifest: &RawManifest) -> Result<()> {
    ensure_has_rules(manifest)?;
    validate_global_config(manifest)?;
    for (name, rule) in manifest.rule.iter() {
        validate_rule(name, rule)?;
    }
    let producers = validate_unique_outputs(manifest)?;
    validate_rule_graph(manifest, &producers)?;
    Ok(())
}

fn ensure_has_rules(manifest: &RawManifest) -> Result<()> {
    if manifest.rule.is_empty() {
        return Err(GenspawnError::ConfigError(
            "manifest must contain at least one [rule.<name>] section".to_string(),
        ));
    }
    Ok(())
}

fn validate_global_config(manifest: &RawManifest) -> Result<()> {
    let cfg = &manifest.config;
    ResourceSet::try_new(cfg.resources.memory_mb, cfg.resources.cpu, cfg.resources.io)?;

    if cfg.shell.trim().is_empty() {
        return Err(GenspawnError::ConfigError(
            "[config].shell must not be empty".to_string(),
        ));
    }
    if cfg.output_root.as_os_str().is_empty() {
        return Err(GenspawnError::ConfigError(
            "[config].output_root must not be empty".to_string(),
        ));
    }
    Ok(())
}

fn validate_rule(name: &str, rule: &RuleConfig) -> Result<()> {
    if rule.cmd.trim().is_empty() {
        return Err(GenspawnError::ConfigError(format!(
            "rule '{name}' has an empty `cmd`"
        )));
    }
    if rule.all_outputs().next().is_none() {
        return Err(GenspawnError::ConfigError(format!(
            "rule '{name}' must declare at least one entry in `outs` or `tree_outs`"
        )));
    }

    let paths = rule
        .srcs
        .iter()
        .chain(rule.tree_srcs.iter())
        .chain(rule.all_outputs())
        .chain(rule.runfiles.keys())
        .chain(rule.runfiles.values());
    for path in paths {
        ensure_relative(name, path)?;
    }
    Ok(())
}

/// Paths must be relative and stay below their root.
fn ensure_relative(rule: &str, path: &str) -> Result<()> {
    let p = Path::new(path);
    let escapes = p
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
    if path.is_empty() || escapes {
        return Err(GenspawnError::ConfigError(format!(
            "rule '{rule}': path '{path}' must be relative and must not contain '..'"
        )));
    }
    Ok(())
}

/// No output may be declared by two rules (or twice by one rule).
///
/// Returns output path → producing rule.
fn validate_unique_outputs(manifest: &RawManifest) -> Result<BTreeMap<&str, &str>> {
    let mut producers: BTreeMap<&str, &str> = BTreeMap::new();
    for (name, rule) in manifest.rule.iter() {
        for out in rule.all_outputs() {
            if let Some(first) = producers.insert(out.as_str(), name.as_str()) {
                return Err(GenspawnError::DuplicateOutput {
                    path: out.clone(),
                    first: first.to_string(),
                    second: name.clone(),
                });
            }
        }
    }
    Ok(producers)
}

fn validate_rule_graph(manifest: &RawManifest, producers: &BTreeMap<&str, &str>) -> Result<()> {
    // Edge direction: producer -> consumer.
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();

    for name in manifest.rule.keys() {
        graph.add_node(name.as_str());
    }

    for (name, rule) in manifest.rule.iter() {
        let consumed = rule
            .srcs
            .iter()
            .chain(rule.tree_srcs.iter())
            .chain(rule.runfiles.values());
        for src in consumed {
            if let Some(producer) = producers.get(src.as_str()) {
                if *producer == name.as_str() {
                    return Err(GenspawnError::ConfigError(format!(
                        "rule '{name}' consumes its own output '{src}'"
                    )));
                }
                graph.add_edge(*producer, name.as_str(), ());
            }
        }
    }

    match toposort(&graph, None) {
        Ok(_order) => Ok(()),
        Err(cycle) => Err(GenspawnError::GraphCycle(format!(
            "cycle detected between rules involving '{}'",
            cycle.node_id()
        ))),
    }
}
