// src/config/actions.rs

//! Turn a validated [`Manifest`] into genrule [`Action`]s.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::action::{
    expand_template, Action, ActionOwner, Artifact, ArtifactRoot, CommandLine, TemplateVars,
};
use crate::config::model::{Manifest, RuleConfig};
use crate::errors::{GenspawnError, Result};
use crate::genrule::GenRule;

/// `PATH` given to rules that do not set one. Commands never inherit the
/// caller's environment.
pub const DEFAULT_PATH: &str = "/bin:/usr/bin:/usr/local/bin";

/// Build one genrule action per `[rule.<name>]`, in rule-name order.
///
/// `origin` (the manifest file) is recorded as the owner's location.
pub fn build_actions(manifest: &Manifest, origin: Option<&Path>) -> Result<Vec<Action>> {
    let source_root = ArtifactRoot::source(".");
    let output_root = ArtifactRoot::output(manifest.config.output_root.clone());

    // Every generated artifact, by the name rules use to refer to it.
    let mut generated: BTreeMap<&str, Artifact> = BTreeMap::new();
    for rule in manifest.rule.values() {
        for out in &rule.outs {
            generated.insert(out.as_str(), Artifact::file(output_root.clone(), out));
        }
        for out in &rule.tree_outs {
            generated.insert(out.as_str(), Artifact::tree(output_root.clone(), out));
        }
    }

    let resolve = |name: &str, tree: bool| -> Artifact {
        match generated.get(name) {
            Some(artifact) => artifact.clone(),
            None if tree => Artifact::tree(source_root.clone(), name),
            None => Artifact::file(source_root.clone(), name),
        }
    };

    let mut actions = Vec::with_capacity(manifest.rule.len());
    for (name, rule) in manifest.rule.iter() {
        let inputs: Vec<Artifact> = rule
            .srcs
            .iter()
            .map(|s| resolve(s.as_str(), false))
            .chain(rule.tree_srcs.iter().map(|s| resolve(s.as_str(), true)))
            .collect();
        let outputs: Vec<Artifact> = rule
            .all_outputs()
            .filter_map(|o| generated.get(o.as_str()).cloned())
            .collect();
        let runfiles: BTreeMap<PathBuf, Artifact> = rule
            .runfiles
            .iter()
            .map(|(link, target)| (PathBuf::from(link), resolve(target.as_str(), false)))
            .collect();

        let script = expand_command(name, rule, &inputs, &outputs)?;
        let command_line = CommandLine::shell_script(manifest.config.shell.clone(), script);

        let mut owner = ActionOwner::new(name.clone());
        if let Some(origin) = origin {
            owner = owner.with_location(format!("{}[rule.{name}]", origin.display()));
        }

        let mut environment = rule.env.clone();
        environment
            .entry("PATH".to_string())
            .or_insert_with(|| DEFAULT_PATH.to_string());

        let mut genrule = GenRule::new(owner, command_line.argv().to_vec());
        genrule.inputs = inputs;
        genrule.outputs = outputs;
        genrule.environment = environment;
        genrule.execution_info = rule.execution_info.clone();
        genrule.runfiles = runfiles;
        if let Some(message) = &rule.message {
            genrule.progress_message = message.clone();
        }

        let action = genrule.into_action()?;
        debug!(rule = %name, key = %action.key(), "built genrule action");
        actions.push(action);
    }

    Ok(actions)
}

fn expand_command(
    name: &str,
    rule: &RuleConfig,
    inputs: &[Artifact],
    outputs: &[Artifact],
) -> Result<String> {
    let srcs: Vec<String> = inputs.iter().map(exec_path_string).collect();
    let outs: Vec<String> = outputs.iter().map(exec_path_string).collect();
    let vars = TemplateVars {
        srcs: &srcs,
        outs: &outs,
    };

    expand_template(&rule.cmd, &vars)
        .map_err(|e| GenspawnError::ConfigError(format!("rule '{name}': {e}")))
}

fn exec_path_string(artifact: &Artifact) -> String {
    artifact.exec_path().to_string_lossy().into_owned()
}
