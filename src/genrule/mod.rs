// src/genrule/mod.rs

//! Genrule actions: spawn actions whose inputs and outputs are checked for
//! directories before and after the command runs.
//!
//! A genrule command is an arbitrary user-supplied shell invocation, so
//! nothing guarantees that a declared input is a plain file or that the
//! command produced plain files.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use crate::action::{Action, ActionOwner, Artifact, CommandLine, ResourceSet};
use crate::errors::Result;

pub mod validate;

pub use validate::ShapeValidator;

pub const GENRULE_MNEMONIC: &str = "Genrule";

/// Not chosen carefully: 300 MB memory, one full core, 20% of total I/O.
pub const GENRULE_RESOURCES: ResourceSet = ResourceSet::new(300.0, 1.0, 0.2);

/// Declaration of a genrule action.
///
/// `argv` is used verbatim (no shell wrapping is added); genrule commands
/// are usually `[shell, "-c", script]`, see [`CommandLine::shell_script`].
#[derive(Debug, Clone)]
pub struct GenRule {
    pub owner: ActionOwner,
    pub inputs: Vec<Artifact>,
    pub outputs: Vec<Artifact>,
    pub argv: Vec<String>,
    pub environment: BTreeMap<String, String>,
    pub execution_info: BTreeMap<String, String>,
    pub runfiles: BTreeMap<PathBuf, Artifact>,
    pub progress_message: String,
}

impl GenRule {
    pub fn new(owner: ActionOwner, argv: Vec<String>) -> Self {
        let progress_message = format!("Executing genrule {}", owner.label());
        Self {
            owner,
            inputs: Vec::new(),
            outputs: Vec::new(),
            argv,
            environment: BTreeMap::new(),
            execution_info: BTreeMap::new(),
            runfiles: BTreeMap::new(),
            progress_message,
        }
    }

    /// Freeze into an [`Action`] with the genrule mnemonic, the fixed
    /// [`GENRULE_RESOURCES`] budget and a [`ShapeValidator`].
    pub fn into_action(self) -> Result<Action> {
        Action::builder(self.owner)
            .mnemonic(GENRULE_MNEMONIC)
            .resources(GENRULE_RESOURCES)
            .inputs(self.inputs)
            .outputs(self.outputs)
            .command_line(CommandLine::of(self.argv, false))
            .environment(self.environment)
            .execution_info(self.execution_info)
            .runfiles(self.runfiles)
            .progress_message(self.progress_message)
            .validation(Arc::new(ShapeValidator))
            .build()
    }
}
