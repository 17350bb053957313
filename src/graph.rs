// src/graph.rs

//! Dependency graph between actions.
//!
//! Edges come from artifacts: an action that consumes an artifact depends on
//! the action that produces it. This is bookkeeping for the runner, not a
//! scheduling policy.

use std::collections::HashMap;
use std::path::PathBuf;

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::action::Action;
use crate::errors::{GenspawnError, Result};

/// Actions plus their producer → consumer edges, in a topological order.
#[derive(Debug, Clone)]
pub struct ActionGraph {
    actions: Vec<Action>,
    deps: Vec<Vec<usize>>,
    dependents: Vec<Vec<usize>>,
    order: Vec<usize>,
}

impl ActionGraph {
    /// Build the graph.
    ///
    /// Fails if two actions declare the same output or if the edges form a
    /// cycle.
    pub fn new(actions: Vec<Action>) -> Result<Self> {
        let mut producers: HashMap<PathBuf, usize> = HashMap::new();
        for (idx, action) in actions.iter().enumerate() {
            for output in action.outputs() {
                if let Some(first) = producers.insert(output.exec_path(), idx) {
                    return Err(GenspawnError::DuplicateOutput {
                        path: output.to_string(),
                        first: actions[first].owner().to_string(),
                        second: action.owner().to_string(),
                    });
                }
            }
        }

        // Edge direction: producer -> consumer.
        let mut graph: DiGraphMap<usize, ()> = DiGraphMap::new();
        let mut deps = vec![Vec::new(); actions.len()];
        let mut dependents = vec![Vec::new(); actions.len()];

        for idx in 0..actions.len() {
            graph.add_node(idx);
        }

        for (idx, action) in actions.iter().enumerate() {
            let consumed = action
                .inputs()
                .iter()
                .chain(action.runfiles_manifests().values());
            for input in consumed {
                if let Some(&producer) = producers.get(&input.exec_path()) {
                    if !deps[idx].contains(&producer) {
                        deps[idx].push(producer);
                        dependents[producer].push(idx);
                        graph.add_edge(producer, idx, ());
                    }
                }
            }
        }

        let order = toposort(&graph, None).map_err(|cycle| {
            GenspawnError::GraphCycle(format!(
                "cycle detected involving action '{}'",
                actions[cycle.node_id()].owner()
            ))
        })?;

        Ok(Self {
            actions,
            deps,
            dependents,
            order,
        })
    }

    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Indices into [`actions`](Self::actions), producers before consumers.
    pub fn topological_order(&self) -> &[usize] {
        &self.order
    }

    /// Actions whose outputs `idx` consumes.
    pub fn dependencies_of(&self, idx: usize) -> &[usize] {
        self.deps.get(idx).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Actions that consume outputs of `idx`.
    pub fn dependents_of(&self, idx: usize) -> &[usize] {
        self.dependents.get(idx).map(Vec::as_slice).unwrap_or(&[])
    }
}
