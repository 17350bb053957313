// src/action/key.rs

//! Deterministic fingerprint of an action declaration.

use std::collections::BTreeMap;
use std::path::Path;

use blake3::Hasher;

use super::{Action, Artifact, RootKind};

/// Compute the key of `action`.
///
/// Every variable-length field is length-prefixed so that adjacent fields
/// cannot run into each other. Maps and sets are already ordered, which makes
/// the key independent of declaration order.
pub fn compute_action_key(action: &Action) -> String {
    let mut hasher = Hasher::new();

    put_str(&mut hasher, action.mnemonic());

    let arguments = action.command_line().arguments();
    put_len(&mut hasher, arguments.len());
    for arg in &arguments {
        put_str(&mut hasher, arg);
    }

    put_map(&mut hasher, action.environment());
    put_map(&mut hasher, action.execution_info());

    put_len(&mut hasher, action.inputs().len());
    for input in action.inputs() {
        put_artifact(&mut hasher, input);
    }

    put_len(&mut hasher, action.outputs().len());
    for output in action.outputs() {
        put_artifact(&mut hasher, output);
    }

    put_len(&mut hasher, action.runfiles_manifests().len());
    for (link, target) in action.runfiles_manifests() {
        put_path(&mut hasher, link);
        put_artifact(&mut hasher, target);
    }

    hasher.finalize().to_hex().to_string()
}

fn put_len(hasher: &mut Hasher, len: usize) {
    hasher.update(&(len as u64).to_le_bytes());
}

fn put_str(hasher: &mut Hasher, s: &str) {
    put_len(hasher, s.len());
    hasher.update(s.as_bytes());
}

fn put_path(hasher: &mut Hasher, path: &Path) {
    put_str(hasher, &path.to_string_lossy());
}

fn put_map(hasher: &mut Hasher, map: &BTreeMap<String, String>) {
    put_len(hasher, map.len());
    for (k, v) in map {
        put_str(hasher, k);
        put_str(hasher, v);
    }
}

fn put_artifact(hasher: &mut Hasher, artifact: &Artifact) {
    let kind = match artifact.root().kind() {
        RootKind::Source => 0u8,
        RootKind::Output => 1u8,
    };
    hasher.update(&[kind, artifact.is_tree() as u8]);
    put_path(hasher, artifact.root().path());
    put_path(hasher, artifact.root_relative_path());
}
