// src/genrule/validate.rs

//! Directory-shape checks around a genrule's spawn.
//!
//! Exemption rule: artifacts *declared* as trees ([`DeclaredShape::Tree`])
//! are never required to be regular files. Tree outputs are still required
//! to exist. Everything else, source or generated, is checked. A non-tree
//! output must be a regular file once the command has run; any other
//! existing entry fails as [`ExecError::OutputIsDirectory`].
//!
//! [`DeclaredShape::Tree`]: crate::action::DeclaredShape::Tree

use tracing::{debug, warn};

use crate::action::{ActionExecutionContext, ActionMetadata, ExecError, ValidationPolicy};
use crate::report::Severity;

/// Checks every declared artifact and reports each violation; the first
/// violation found is returned as the error.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShapeValidator;

impl ShapeValidator {
    fn record(
        action: &ActionMetadata,
        ctx: &ActionExecutionContext,
        err: ExecError,
        first: &mut Option<ExecError>,
    ) {
        warn!(
            owner = %action.owner(),
            mnemonic = %action.mnemonic(),
            kind = %err.kind(),
            path = ?err.path(),
            "artifact shape violation"
        );

        let mut event = action.event(Severity::Error, err.to_string());
        if let Some(path) = err.path() {
            event = event.with_path(path.clone());
        }
        ctx.reporter().report(event);

        first.get_or_insert(err);
    }
}

impl ValidationPolicy for ShapeValidator {
    fn pre_check(&self, action: &ActionMetadata, ctx: &ActionExecutionContext) -> Result<(), ExecError> {
        let mut first = None;

        for input in action.inputs() {
            if input.is_tree() {
                continue;
            }
            if ctx.is_directory(input) {
                let err = ExecError::InputIsDirectory {
                    path: input.exec_path(),
                };
                Self::record(action, ctx, err, &mut first);
            }
        }

        match first {
            Some(err) => Err(err),
            None => {
                debug!(owner = %action.owner(), inputs = action.inputs().len(), "inputs passed shape check");
                Ok(())
            }
        }
    }

    fn post_check(&self, action: &ActionMetadata, ctx: &ActionExecutionContext) -> Result<(), ExecError> {
        let mut first = None;

        for output in action.outputs() {
            let path = output.exec_path();
            let err = if !ctx.exists(output) {
                ExecError::OutputMissing { path }
            } else if !output.is_tree() && !ctx.is_file(output) {
                // Directories, FIFOs and sockets alike.
                ExecError::OutputIsDirectory { path }
            } else {
                continue;
            };
            Self::record(action, ctx, err, &mut first);
        }

        match first {
            Some(err) => Err(err),
            None => {
                debug!(owner = %action.owner(), outputs = action.outputs().len(), "outputs passed shape check");
                Ok(())
            }
        }
    }
}
