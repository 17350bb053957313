// src/config/model.rs

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Deserialize;

use crate::action::DEFAULT_SHELL;

/// Manifest as read from TOML, before validation.
///
/// ```toml
/// [config]
/// output_root = "out"
///
/// [rule.copy]
/// srcs = ["a.txt"]
/// outs = ["b.txt"]
/// cmd = "cp $< $@"
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct RawManifest {
    #[serde(default)]
    pub config: ConfigSection,

    /// All rules from `[rule.<name>]`, keyed by rule name.
    #[serde(default)]
    pub rule: BTreeMap<String, RuleConfig>,
}

/// A manifest that passed validation.
///
/// Only constructible through `TryFrom<RawManifest>` (see `validate.rs`).
#[derive(Debug, Clone)]
pub struct Manifest {
    pub config: ConfigSection,
    pub rule: BTreeMap<String, RuleConfig>,
}

impl Manifest {
    pub(crate) fn new_unchecked(config: ConfigSection, rule: BTreeMap<String, RuleConfig>) -> Self {
        Self { config, rule }
    }
}

/// `[config]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigSection {
    /// Working directory of spawned commands; source paths are relative to it.
    #[serde(default = "default_exec_root")]
    pub exec_root: PathBuf,

    /// Where generated artifacts live, relative to `exec_root`.
    #[serde(default = "default_output_root")]
    pub output_root: PathBuf,

    /// Shell used to run `cmd`.
    #[serde(default = "default_shell")]
    pub shell: String,

    /// Keep building independent rules after a failure.
    #[serde(default)]
    pub keep_going: bool,

    /// Local resource budget used to admit actions.
    #[serde(default)]
    pub resources: ResourcesSection,
}

fn default_exec_root() -> PathBuf {
    PathBuf::from(".")
}

fn default_output_root() -> PathBuf {
    PathBuf::from("out")
}

fn default_shell() -> String {
    DEFAULT_SHELL.to_string()
}

impl Default for ConfigSection {
    fn default() -> Self {
        Self {
            exec_root: default_exec_root(),
            output_root: default_output_root(),
            shell: default_shell(),
            keep_going: false,
            resources: ResourcesSection::default(),
        }
    }
}

/// `[config.resources]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ResourcesSection {
    #[serde(default = "default_memory_mb")]
    pub memory_mb: f64,

    /// Defaults to the number of available cores.
    #[serde(default = "default_cpu")]
    pub cpu: f64,

    #[serde(default = "default_io")]
    pub io: f64,
}

fn default_memory_mb() -> f64 {
    4096.0
}

fn default_cpu() -> f64 {
    std::thread::available_parallelism()
        .map(|n| n.get() as f64)
        .unwrap_or(1.0)
}

fn default_io() -> f64 {
    1.0
}

impl Default for ResourcesSection {
    fn default() -> Self {
        Self {
            memory_mb: default_memory_mb(),
            cpu: default_cpu(),
            io: default_io(),
        }
    }
}

/// `[rule.<name>]` section.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuleConfig {
    /// File inputs. A name listed in another rule's `outs` refers to that
    /// rule's output; anything else is a source file under `exec_root`.
    #[serde(default)]
    pub srcs: Vec<String>,

    /// Directory inputs (exempt from the "must be a file" check).
    #[serde(default)]
    pub tree_srcs: Vec<String>,

    /// File outputs, relative to `output_root`.
    #[serde(default)]
    pub outs: Vec<String>,

    /// Directory outputs, relative to `output_root`.
    #[serde(default)]
    pub tree_outs: Vec<String>,

    /// Shell command; supports `$(SRCS)`, `$(OUTS)`, `$<`, `$@`, `$(@D)`, `$$`.
    pub cmd: String,

    #[serde(default)]
    pub env: BTreeMap<String, String>,

    #[serde(default)]
    pub execution_info: BTreeMap<String, String>,

    /// Progress message; defaults to "Executing genrule <name>".
    #[serde(default)]
    pub message: Option<String>,

    /// Runfiles: link path → input name (resolved like `srcs`).
    #[serde(default)]
    pub runfiles: BTreeMap<String, String>,
}

impl RuleConfig {
    /// All declared outputs, files first, in declaration order.
    pub fn all_outputs(&self) -> impl Iterator<Item = &String> {
        self.outs.iter().chain(self.tree_outs.iter())
    }
}
