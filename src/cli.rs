// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};

use crate::config::DEFAULT_MANIFEST;

/// Command-line arguments for `genspawn`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "genspawn",
    version,
    about = "Run genrule actions with input/output shape validation.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the build manifest (TOML).
    #[arg(long, value_name = "PATH", default_value = DEFAULT_MANIFEST)]
    pub manifest: String,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `GENSPAWN_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Parse + validate, print the actions, but don't execute any commands.
    #[arg(long)]
    pub dry_run: bool,

    /// Keep building independent rules after a failure.
    ///
    /// Overrides `[config].keep_going` when set.
    #[arg(long, short = 'k')]
    pub keep_going: bool,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
