// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::config::default_config_path;

/// Command-line arguments for `toolstream`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "toolstream",
    version,
    about = "Run external tools and stream their output live.",
    long_about = None
)]
pub struct CliArgs {
    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `TOOLSTREAM_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL", global = true)]
    pub log_level: Option<LogLevel>,

    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Clone, Subcommand)]
pub enum CliCommand {
    /// Run one command and stream its output.
    Run(RunArgs),

    /// Run the steps of a pipeline file in dependency order.
    Pipeline(PipelineArgs),
}

#[derive(Debug, Clone, Args)]
pub struct RunArgs {
    /// Flush output every N messages.
    #[arg(long, value_name = "N", default_value_t = 1)]
    pub batch_size: usize,

    /// Pause between polls of the process, in milliseconds.
    #[arg(long, value_name = "MS", default_value_t = 0)]
    pub poll_interval_ms: u64,

    /// Disable coloured output.
    #[arg(long)]
    pub no_color: bool,

    /// Run the command from a temporary bash script.
    #[arg(long)]
    pub script: bool,

    /// Command prefix for `--script`, e.g. `--launcher wsl --launcher -e`.
    #[arg(long, value_name = "WORD", allow_hyphen_values = true)]
    pub launcher: Vec<String>,

    /// Working directory for the command.
    #[arg(long, value_name = "DIR")]
    pub cwd: Option<PathBuf>,

    /// The command to run; joined with spaces and handed to the shell.
    #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
    pub command: Vec<String>,
}

#[derive(Debug, Clone, Args)]
pub struct PipelineArgs {
    /// Path to the pipeline file (TOML).
    #[arg(long, value_name = "PATH", default_value_os_t = default_config_path())]
    pub config: PathBuf,

    /// Parse + validate, print the step order, but don't run anything.
    #[arg(long)]
    pub dry_run: bool,

    /// Disable coloured output (overrides `[config].color`).
    #[arg(long)]
    pub no_color: bool,
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
