// src/lib.rs

pub mod cli;
pub mod config;
pub mod coordinator;
pub mod errors;
pub mod exec;
pub mod logging;
pub mod paths;
pub mod pipeline;
pub mod process;
pub mod pump;
pub mod sink;
pub mod task;
pub mod types;

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Result;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::cli::{CliArgs, CliCommand, PipelineArgs, RunArgs};
use crate::config::{PipelineFile, load_and_validate};
use crate::coordinator::{StreamOptions, stream_until_shutdown};
use crate::exec::{RealStepLauncher, spawn_script, spawn_shell};
use crate::pipeline::{StepGraph, run_pipeline};
use crate::process::ProcessHandle;
use crate::sink::ConsoleSink;

pub use crate::coordinator::{SessionReport, display_process_output};
pub use crate::sink::{Sink, SinkError};
pub use crate::task::{TaskError, TaskHandle, spawn_task, spawn_thread};
pub use crate::types::{ExitState, Tag, TaggedMessage};

/// Exit code of `toolstream run` when the command was killed by a second Ctrl-C.
pub const INTERRUPTED_EXIT_CODE: i32 = 130;

/// High-level entry point used by `main.rs`.
///
/// Returns the exit code the binary should end with.
pub async fn run(args: CliArgs) -> Result<i32> {
    match args.command {
        CliCommand::Run(run_args) => run_command(run_args).await,
        CliCommand::Pipeline(pipeline_args) => run_pipeline_file(pipeline_args).await,
    }
}

/// `toolstream run -- <command...>`
async fn run_command(args: RunArgs) -> Result<i32> {
    let command = args.command.join(" ");
    let options = StreamOptions::default()
        .with_batch_size(args.batch_size)
        .with_poll_interval(Duration::from_millis(args.poll_interval_ms));

    let mut process: Box<dyn ProcessHandle> = if args.script {
        let script_dir = std::env::temp_dir().join("toolstream");
        Box::new(spawn_script(
            &command,
            &script_dir,
            &args.launcher,
            args.cwd.as_deref(),
        )?)
    } else {
        Box::new(spawn_shell(&command, args.cwd.as_deref())?)
    };

    // Ctrl-C reaches the child through the terminal's process group; staying
    // alive lets the remaining output be drained and shown. A second Ctrl-C
    // kills a child that ignored the first.
    let (interrupt_tx, mut interrupt_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_err() {
            return;
        }
        warn!("interrupt received; waiting for the command to exit (Ctrl-C again to kill it)");
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = interrupt_tx.send(true);
        }
    });

    let mut sink = ConsoleSink::stdout().with_color(!args.no_color);
    let Some(report) =
        stream_until_shutdown(process.as_mut(), &mut sink, &options, &mut interrupt_rx).await?
    else {
        return Ok(INTERRUPTED_EXIT_CODE);
    };

    for err in &report.stream_errors {
        warn!(error = %err, "output stream ended with an error");
    }

    Ok(if report.success() {
        0
    } else {
        report.exit.code.filter(|c| *c != 0).unwrap_or(1)
    })
}

/// `toolstream pipeline --config <PATH>`
async fn run_pipeline_file(args: PipelineArgs) -> Result<i32> {
    let pipeline = load_and_validate(&args.config)?;

    if args.dry_run {
        print_dry_run(&pipeline);
        return Ok(0);
    }

    let root_dir = config_root_dir(&args.config);
    let mut launcher = RealStepLauncher::new(
        root_dir,
        pipeline.config.script_dir.clone(),
        pipeline.config.launcher.clone(),
    );
    let mut sink =
        ConsoleSink::stdout().with_color(pipeline.config.color && !args.no_color);

    // Ctrl-C → stop the running step and start no further ones.
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            eprintln!("failed to listen for Ctrl+C: {e}");
            return;
        }
        let _ = shutdown_tx.send(true);
    });

    let report = run_pipeline(&pipeline, &mut launcher, &mut sink, shutdown_rx).await?;
    info!(success = report.success(), steps = report.steps.len(), "pipeline finished");

    Ok(if report.success() { 0 } else { 1 })
}

/// Directory relative paths in a pipeline file are resolved against.
///
/// - If the config path has a non-empty parent (e.g. "pipelines/Toolstream.toml"),
///   we use that directory.
/// - If it's just a bare filename like "Toolstream.toml" (parent = ""),
///   we fall back to the current working directory "."
fn config_root_dir(config_path: &Path) -> PathBuf {
    match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    }
}

/// Simple dry-run output: print steps in execution order with their commands.
fn print_dry_run(pipeline: &PipelineFile) {
    let graph = StepGraph::from_pipeline(pipeline);

    println!("toolstream dry-run");
    println!("  config.batch_size = {}", pipeline.config.batch_size);
    println!("  config.poll_interval_ms = {}", pipeline.config.poll_interval_ms);
    if !pipeline.config.launcher.is_empty() {
        println!("  config.launcher = {:?}", pipeline.config.launcher);
    }
    println!();

    println!("steps ({}):", pipeline.step.len());
    for name in graph.execution_order() {
        let Some(step) = pipeline.step.get(&name) else {
            continue;
        };
        println!("  - {name}");
        println!("      cmd: {}", step.cmd);
        if let Some(ref cwd) = step.cwd {
            println!("      cwd: {}", cwd.display());
        }
        if !step.after.is_empty() {
            println!("      after: {:?}", step.after);
        }
        if step.script {
            println!("      script: true");
        }
        if step.continue_on_failure {
            println!("      continue_on_failure: true");
        }
    }

    debug!("dry-run complete (no execution)");
}
