use std::collections::BTreeMap;

use genspawn::action::{Action, ActionOwner, Artifact, ArtifactRoot, CommandLine};
use genspawn::config::{ConfigSection, Manifest, RawManifest, RuleConfig};
use genspawn::genrule::GenRule;

/// Output root used by the artifact helpers below.
pub const OUT_ROOT: &str = "out";

pub fn src_file(path: &str) -> Artifact {
    Artifact::file(ArtifactRoot::source("."), path)
}

pub fn src_tree(path: &str) -> Artifact {
    Artifact::tree(ArtifactRoot::source("."), path)
}

pub fn out_file(path: &str) -> Artifact {
    Artifact::file(ArtifactRoot::output(OUT_ROOT), path)
}

pub fn out_tree(path: &str) -> Artifact {
    Artifact::tree(ArtifactRoot::output(OUT_ROOT), path)
}

/// Builder for genrule [`Action`]s.
pub struct GenRuleBuilder {
    rule: GenRule,
}

impl GenRuleBuilder {
    /// A genrule running `script` through `/bin/sh -c`.
    pub fn new(label: &str, script: &str) -> Self {
        let argv = CommandLine::shell_script("/bin/sh", script).argv().to_vec();
        Self {
            rule: GenRule::new(ActionOwner::new(label), argv),
        }
    }

    pub fn input(mut self, artifact: Artifact) -> Self {
        self.rule.inputs.push(artifact);
        self
    }

    pub fn output(mut self, artifact: Artifact) -> Self {
        self.rule.outputs.push(artifact);
        self
    }

    pub fn env(mut self, key: &str, value: &str) -> Self {
        self.rule.environment.insert(key.to_string(), value.to_string());
        self
    }

    pub fn runfile(mut self, link: &str, target: Artifact) -> Self {
        self.rule.runfiles.insert(link.into(), target);
        self
    }

    pub fn build(self) -> Action {
        self.rule
            .into_action()
            .expect("Failed to build valid genrule from builder")
    }
}

/// Builder for [`Manifest`] to simplify test setup.
pub struct ManifestBuilder {
    manifest: RawManifest,
}

impl ManifestBuilder {
    pub fn new() -> Self {
        Self {
            manifest: RawManifest {
                config: ConfigSection::default(),
                rule: BTreeMap::new(),
            },
        }
    }

    pub fn with_rule(mut self, name: &str, rule: RuleConfig) -> Self {
        self.manifest.rule.insert(name.to_string(), rule);
        self
    }

    pub fn output_root(mut self, root: &str) -> Self {
        self.manifest.config.output_root = root.into();
        self
    }

    pub fn keep_going(mut self, val: bool) -> Self {
        self.manifest.config.keep_going = val;
        self
    }

    pub fn build_raw(self) -> RawManifest {
        self.manifest
    }

    pub fn build(self) -> Manifest {
        Manifest::try_from(self.manifest).expect("Failed to build valid manifest from builder")
    }
}

impl Default for ManifestBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `RuleConfig`.
pub struct RuleBuilder {
    rule: RuleConfig,
}

impl RuleBuilder {
    pub fn new(cmd: &str) -> Self {
        Self {
            rule: RuleConfig {
                cmd: cmd.to_string(),
                ..RuleConfig::default()
            },
        }
    }

    pub fn src(mut self, path: &str) -> Self {
        self.rule.srcs.push(path.to_string());
        self
    }

    pub fn tree_src(mut self, path: &str) -> Self {
        self.rule.tree_srcs.push(path.to_string());
        self
    }

    pub fn out(mut self, path: &str) -> Self {
        self.rule.outs.push(path.to_string());
        self
    }

    pub fn tree_out(mut self, path: &str) -> Self {
        self.rule.tree_outs.push(path.to_string());
        self
    }

    pub fn env(mut self, key: &str, value: &str) -> Self {
        self.rule.env.insert(key.to_string(), value.to_string());
        self
    }

    pub fn message(mut self, message: &str) -> Self {
        self.rule.message = Some(message.to_string());
        self
    }

    pub fn runfile(mut self, link: &str, target: &str) -> Self {
        self.rule.runfiles.insert(link.to_string(), target.to_string());
        self
    }

    pub fn build(self) -> RuleConfig {
        self.rule
    }
}
