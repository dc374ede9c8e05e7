// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

/// Command-line arguments for `simcheck`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "simcheck",
    version,
    about = "Run trigger-based acceptance tests against a simulation scenario.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the scenario file (TOML).
    #[arg(long, value_name = "PATH")]
    pub scenario_file: PathBuf,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `SIMCHECK_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Parse + validate, print tests and triggers, but don't run anything.
    #[arg(long)]
    pub dry_run: bool,

    /// Write the TOML report here instead of printing it to stdout.
    #[arg(long, value_name = "PATH")]
    pub report: Option<PathBuf>,

    /// Override `[config].iterations`.
    #[arg(long, value_name = "N", value_parser = clap::value_parser!(u32).range(1..))]
    pub iterations: Option<u32>,
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
