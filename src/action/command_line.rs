// src/action/command_line.rs

//! Building argv sequences for spawned processes.
//!
//! Rendering is a pure function of the declared arguments: no environment
//! variables are consulted and the shell path is a constant unless the
//! caller passes one explicitly.

use std::fmt;
use std::path::{Component, Path, PathBuf};

use thiserror::Error;

/// Shell used when a command line asks for shell interpretation.
pub const DEFAULT_SHELL: &str = "/bin/sh";

/// Ordered argument list plus whether it needs a shell to interpret it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CommandLine {
    argv: Vec<String>,
    use_shell: bool,
}

impl CommandLine {
    /// Build a command line from `argv`.
    ///
    /// With `use_shell = false` the rendered arguments are `argv` verbatim.
    /// With `use_shell = true` they become `[DEFAULT_SHELL, "-c", <argv>]`,
    /// where `<argv>` is every argument shell-quoted and space-joined.
    pub fn of(argv: Vec<String>, use_shell: bool) -> Self {
        Self { argv, use_shell }
    }

    /// `[shell, "-c", script]`, with `script` passed through untouched.
    ///
    /// This is the shape genrule commands take: the script is already shell
    /// syntax, so it must not be quoted again.
    pub fn shell_script(shell: impl Into<String>, script: impl Into<String>) -> Self {
        Self::of(vec![shell.into(), "-c".to_string(), script.into()], false)
    }

    /// The arguments as declared, before any shell wrapping.
    pub fn argv(&self) -> &[String] {
        &self.argv
    }

    pub fn uses_shell(&self) -> bool {
        self.use_shell
    }

    pub fn is_empty(&self) -> bool {
        self.argv.is_empty()
    }

    /// The argv handed to the executor.
    pub fn arguments(&self) -> Vec<String> {
        if self.use_shell {
            vec![
                DEFAULT_SHELL.to_string(),
                "-c".to_string(),
                shell_words::join(&self.argv),
            ]
        } else {
            self.argv.clone()
        }
    }
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&shell_words::join(self.arguments()))
    }
}

/// Errors from [`expand_template`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    #[error("unknown variable '{0}' (use '$$' for a literal '$')")]
    UnknownVariable(String),

    #[error("unterminated '$(' in command template")]
    Unterminated,

    #[error("'{variable}' requires exactly one {what}, but {count} were declared")]
    Arity {
        variable: &'static str,
        what: &'static str,
        count: usize,
    },
}

/// Paths available to a command template, as seen from the execution root.
#[derive(Debug, Clone, Copy)]
pub struct TemplateVars<'a> {
    pub srcs: &'a [String],
    pub outs: &'a [String],
}

/// Expand genrule make-variables in `template`.
///
/// | variable  | expands to                                   |
/// |-----------|----------------------------------------------|
/// | `$(SRCS)` | all inputs, quoted, space separated          |
/// | `$(OUTS)` | all outputs, quoted, space separated         |
/// | `$<`      | the single input                             |
/// | `$@`      | the single output                            |
/// | `$(@D)`   | the directory containing the outputs         |
/// | `$$`      | a literal `$`                                |
pub fn expand_template(template: &str, vars: &TemplateVars<'_>) -> Result<String, TemplateError> {
    let mut out = String::with_capacity(template.len());
    let mut chars = template.chars();

    while let Some(c) = chars.next() {
        if c != '$' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('$') => out.push('$'),
            Some('<') => out.push_str(&quote(single("$<", "input", vars.srcs)?)),
            Some('@') => out.push_str(&quote(single("$@", "output", vars.outs)?)),
            Some('(') => {
                let mut name = String::new();
                loop {
                    match chars.next() {
                        Some(')') => break,
                        Some(ch) => name.push(ch),
                        None => return Err(TemplateError::Unterminated),
                    }
                }
                match name.as_str() {
                    "SRCS" => out.push_str(&join_quoted(vars.srcs)),
                    "OUTS" => out.push_str(&join_quoted(vars.outs)),
                    "<" => out.push_str(&quote(single("$(<)", "input", vars.srcs)?)),
                    "@" => out.push_str(&quote(single("$(@)", "output", vars.outs)?)),
                    "@D" => out.push_str(&quote(&output_dir(vars.outs))),
                    _ => return Err(TemplateError::UnknownVariable(name)),
                }
            }
            Some(other) => return Err(TemplateError::UnknownVariable(other.to_string())),
            None => return Err(TemplateError::UnknownVariable(String::new())),
        }
    }

    Ok(out)
}

fn single<'a>(
    variable: &'static str,
    what: &'static str,
    values: &'a [String],
) -> Result<&'a str, TemplateError> {
    match values {
        [one] => Ok(one.as_str()),
        _ => Err(TemplateError::Arity {
            variable,
            what,
            count: values.len(),
        }),
    }
}

fn quote(s: &str) -> String {
    shell_words::quote(s).into_owned()
}

fn join_quoted(values: &[String]) -> String {
    shell_words::join(values)
}

/// Longest common parent directory of `outs`, or `.` when there is none.
fn output_dir(outs: &[String]) -> String {
    let mut common: Option<Vec<Component<'_>>> = None;
    for out in outs {
        let parent: Vec<Component<'_>> = Path::new(out)
            .parent()
            .map(|p| p.components().collect())
            .unwrap_or_default();
        common = Some(match common {
            None => parent,
            Some(prev) => prev
                .into_iter()
                .zip(parent)
                .take_while(|(a, b)| a == b)
                .map(|(a, _)| a)
                .collect(),
        });
    }

    let dir: PathBuf = common.unwrap_or_default().into_iter().collect();
    if dir.as_os_str().is_empty() {
        ".".to_string()
    } else {
        dir.to_string_lossy().into_owned()
    }
}
