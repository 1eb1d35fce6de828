// src/pipeline/runner.rs

//! Sequential pipeline execution.
//!
//! Steps run one at a time in [`StepGraph::execution_order`]. Each step's
//! output is streamed through the coordinator, framed by status messages:
//!
//! - `System`: `"Running <step>..."` before the step starts, and notes about
//!   skipped or cancelled steps.
//! - `Success`: `"<step> completed successfully."`
//! - `Error`: `"<step> failed (...)."`
//!
//! A failed step halts the pipeline unless it sets `continue_on_failure`;
//! either way, steps that depend on it are skipped.

use std::collections::HashMap;

use tokio::sync::watch;
use tracing::{error, info, warn};

use crate::config::PipelineFile;
use crate::coordinator::stream_until_shutdown;
use crate::errors::Result;
use crate::exec::StepLauncher;
use crate::pipeline::StepGraph;
use crate::sink::Sink;
use crate::types::Tag;

/// How a single step ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    Succeeded,
    /// Non-zero exit (or `-1` for signals and spawn failures).
    Failed(i32),
    /// Not started: a dependency did not succeed, or the pipeline halted.
    Skipped,
    /// Killed because shutdown was requested while it ran.
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepReport {
    pub name: String,
    pub outcome: StepOutcome,
}

/// Per-step outcomes, in execution order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineReport {
    pub steps: Vec<StepReport>,
}

impl PipelineReport {
    pub fn success(&self) -> bool {
        self.steps
            .iter()
            .all(|s| s.outcome == StepOutcome::Succeeded)
    }

    pub fn outcome_of(&self, name: &str) -> Option<StepOutcome> {
        self.steps
            .iter()
            .find(|s| s.name == name)
            .map(|s| s.outcome)
    }
}

/// Run every step of `pipeline`, streaming output to `sink`.
///
/// `shutdown` flipping to `true` kills the running step and prevents any
/// further step from starting. Only sink failures are returned as errors;
/// step failures are reported in the [`PipelineReport`].
pub async fn run_pipeline(
    pipeline: &PipelineFile,
    launcher: &mut dyn StepLauncher,
    sink: &mut dyn Sink,
    mut shutdown: watch::Receiver<bool>,
) -> Result<PipelineReport> {
    let graph = StepGraph::from_pipeline(pipeline);
    let options = pipeline.config.stream_options();

    let mut outcomes: HashMap<String, StepOutcome> = HashMap::new();
    let mut report = PipelineReport::default();
    let mut halted = false;

    for name in graph.execution_order() {
        let Some(step) = pipeline.step.get(&name) else {
            continue;
        };

        if *shutdown.borrow() {
            record(&mut report, &mut outcomes, &name, StepOutcome::Skipped);
            continue;
        }

        let blocked_by = graph
            .dependencies_of(&name)
            .iter()
            .find(|dep| outcomes.get(dep.as_str()) != Some(&StepOutcome::Succeeded));
        if let Some(dep) = blocked_by {
            info!(step = %name, dependency = %dep, "skipping step; dependency did not succeed");
            sink.deliver(
                &format!("Skipping {name}: {dep} did not succeed.\n"),
                Tag::System,
            )?;
            record(&mut report, &mut outcomes, &name, StepOutcome::Skipped);
            continue;
        }

        if halted {
            record(&mut report, &mut outcomes, &name, StepOutcome::Skipped);
            continue;
        }

        sink.deliver(&format!("Running {name}...\n"), Tag::System)?;

        let mut process = match launcher.launch(&name, step) {
            Ok(process) => process,
            Err(err) => {
                error!(step = %name, error = %err, "failed to start step");
                sink.deliver(&format!("{name} failed to start: {err}\n"), Tag::Error)?;
                record(&mut report, &mut outcomes, &name, StepOutcome::Failed(-1));
                halted = !step.continue_on_failure;
                continue;
            }
        };

        let session =
            stream_until_shutdown(process.as_mut(), &mut *sink, &options, &mut shutdown).await?;

        let outcome = match session {
            Some(session) if session.success() => {
                sink.deliver(&format!("{name} completed successfully.\n"), Tag::Success)?;
                StepOutcome::Succeeded
            }
            Some(session) => {
                sink.deliver(&format!("{name} failed ({}).\n", session.exit), Tag::Error)?;
                halted = !step.continue_on_failure;
                StepOutcome::Failed(session.exit.code_or_default())
            }
            None => {
                warn!(step = %name, "step cancelled");
                sink.deliver(&format!("{name} cancelled.\n"), Tag::System)?;
                halted = true;
                StepOutcome::Cancelled
            }
        };

        info!(step = %name, outcome = ?outcome, "step finished");
        record(&mut report, &mut outcomes, &name, outcome);
    }

    Ok(report)
}

fn record(
    report: &mut PipelineReport,
    outcomes: &mut HashMap<String, StepOutcome>,
    name: &str,
    outcome: StepOutcome,
) {
    outcomes.insert(name.to_string(), outcome);
    report.steps.push(StepReport {
        name: name.to_string(),
        outcome,
    });
}
