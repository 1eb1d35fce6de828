// tests/pipeline_runner.rs
mod common;
use crate::common::{FailingSink, init_tracing, with_timeout};

use std::time::Duration;

use tokio::sync::watch;
use toolstream::config::PipelineFile;
use toolstream::pipeline::{StepOutcome, run_pipeline};
use toolstream::sink::MemorySink;
use toolstream::types::Tag;
use toolstream_test_utils::builders::{PipelineFileBuilder, StepConfigBuilder};
use toolstream_test_utils::fake_launcher::FakeLauncher;
use toolstream_test_utils::fake_process::ScriptedProcess;

fn chain() -> PipelineFile {
    PipelineFileBuilder::new()
        .with_step("a", StepConfigBuilder::new("tool-a").build())
        .with_step("b", StepConfigBuilder::new("tool-b").after("a").build())
        .with_step("c", StepConfigBuilder::new("tool-c").after("b").build())
        .build()
}

fn launched(launcher: &FakeLauncher) -> Vec<String> {
    launcher.launched().lock().unwrap().clone()
}

#[tokio::test]
async fn steps_run_in_dependency_order_with_status_messages() {
    init_tracing();

    let pipeline = chain();
    let mut launcher = FakeLauncher::new()
        .script("a", ScriptedProcess::new().stdout("a-out\n"))
        .script("b", ScriptedProcess::new().stdout("b-out\n"))
        .script("c", ScriptedProcess::new().stdout("c-out\n"));
    let sink = MemorySink::new();
    let mut out = sink.clone();
    let (_tx, rx) = watch::channel(false);

    let report = with_timeout(run_pipeline(&pipeline, &mut launcher, &mut out, rx))
        .await
        .unwrap();

    assert!(report.success());
    assert_eq!(launched(&launcher), vec!["a", "b", "c"]);

    assert_eq!(sink.text_for(Tag::Normal), "a-out\nb-out\nc-out\n");
    assert_eq!(
        sink.text_for(Tag::System),
        "Running a...\nRunning b...\nRunning c...\n"
    );
    assert_eq!(
        sink.text_for(Tag::Success),
        "a completed successfully.\nb completed successfully.\nc completed successfully.\n"
    );

    let first: Vec<Tag> = sink.deliveries().iter().take(3).map(|d| d.tag).collect();
    assert_eq!(first, vec![Tag::System, Tag::Normal, Tag::Success]);
}

#[tokio::test]
async fn failed_step_halts_the_pipeline() {
    init_tracing();

    let pipeline = PipelineFileBuilder::new()
        .with_step("a", StepConfigBuilder::new("tool-a").build())
        .with_step("b", StepConfigBuilder::new("tool-b").build())
        .build();
    let mut launcher = FakeLauncher::new().script(
        "a",
        ScriptedProcess::new().stderr("boom\n").exit_code(2),
    );
    let sink = MemorySink::new();
    let mut out = sink.clone();
    let (_tx, rx) = watch::channel(false);

    let report = with_timeout(run_pipeline(&pipeline, &mut launcher, &mut out, rx))
        .await
        .unwrap();

    assert!(!report.success());
    assert_eq!(report.outcome_of("a"), Some(StepOutcome::Failed(2)));
    assert_eq!(report.outcome_of("b"), Some(StepOutcome::Skipped));
    assert_eq!(launched(&launcher), vec!["a"]);

    let errors = sink.text_for(Tag::Error);
    assert!(errors.contains("boom\n"), "{errors:?}");
    assert!(errors.ends_with("a failed (exit code 2).\n"), "{errors:?}");
}

#[tokio::test]
async fn continue_on_failure_runs_independent_steps_but_skips_dependents() {
    init_tracing();

    let pipeline = PipelineFileBuilder::new()
        .with_step(
            "a",
            StepConfigBuilder::new("tool-a").continue_on_failure(true).build(),
        )
        .with_step("b", StepConfigBuilder::new("tool-b").after("a").build())
        .with_step("c", StepConfigBuilder::new("tool-c").build())
        .build();
    let mut launcher = FakeLauncher::new().script("a", ScriptedProcess::new().exit_code(1));
    let sink = MemorySink::new();
    let mut out = sink.clone();
    let (_tx, rx) = watch::channel(false);

    let report = with_timeout(run_pipeline(&pipeline, &mut launcher, &mut out, rx))
        .await
        .unwrap();

    assert_eq!(report.outcome_of("a"), Some(StepOutcome::Failed(1)));
    assert_eq!(report.outcome_of("b"), Some(StepOutcome::Skipped));
    assert_eq!(report.outcome_of("c"), Some(StepOutcome::Succeeded));
    assert_eq!(launched(&launcher), vec!["a", "c"]);

    assert!(
        sink.text_for(Tag::System)
            .contains("Skipping b: a did not succeed.\n")
    );
}

#[tokio::test]
async fn step_that_cannot_start_is_reported_as_failed() {
    init_tracing();

    let pipeline = chain();
    let mut launcher = FakeLauncher::new().refuse("a");
    let sink = MemorySink::new();
    let mut out = sink.clone();
    let (_tx, rx) = watch::channel(false);

    let report = with_timeout(run_pipeline(&pipeline, &mut launcher, &mut out, rx))
        .await
        .unwrap();

    assert_eq!(report.outcome_of("a"), Some(StepOutcome::Failed(-1)));
    assert_eq!(report.outcome_of("b"), Some(StepOutcome::Skipped));
    assert_eq!(report.outcome_of("c"), Some(StepOutcome::Skipped));
    assert!(launched(&launcher).is_empty());

    let errors = sink.text_for(Tag::Error);
    assert!(errors.starts_with("a failed to start:"), "{errors:?}");
    assert!(errors.contains("no such tool"), "{errors:?}");
}

#[tokio::test]
async fn shutdown_kills_the_running_step_and_skips_the_rest() {
    init_tracing();

    let pipeline = chain();
    let mut launcher = FakeLauncher::new().script(
        "a",
        ScriptedProcess::new().stdout("working\n").run_until_killed(),
    );
    let sink = MemorySink::new();
    let mut out = sink.clone();
    let (tx, rx) = watch::channel(false);

    let (report, ()) = with_timeout(async {
        tokio::join!(
            run_pipeline(&pipeline, &mut launcher, &mut out, rx),
            async {
                tokio::time::sleep(Duration::from_millis(200)).await;
                tx.send(true).unwrap();
            }
        )
    })
    .await;
    let report = report.unwrap();

    assert_eq!(report.outcome_of("a"), Some(StepOutcome::Cancelled));
    assert_eq!(report.outcome_of("b"), Some(StepOutcome::Skipped));
    assert_eq!(report.outcome_of("c"), Some(StepOutcome::Skipped));

    let control = launcher.control("a").unwrap();
    assert!(control.was_killed());
    assert_eq!(launched(&launcher), vec!["a"]);
    assert!(sink.text_for(Tag::System).ends_with("a cancelled.\n"));
}

#[tokio::test]
async fn shutdown_before_start_skips_everything() {
    init_tracing();

    let pipeline = chain();
    let mut launcher = FakeLauncher::new();
    let mut out = MemorySink::new();
    let (_tx, rx) = watch::channel(true);

    let report = with_timeout(run_pipeline(&pipeline, &mut launcher, &mut out, rx))
        .await
        .unwrap();

    assert!(report.steps.iter().all(|s| s.outcome == StepOutcome::Skipped));
    assert!(launched(&launcher).is_empty());
}

#[tokio::test]
async fn sink_failure_aborts_the_pipeline() {
    init_tracing();

    let pipeline = chain();
    let mut launcher = FakeLauncher::new();
    let mut sink = FailingSink::new(0);
    let (_tx, rx) = watch::channel(false);

    let result = with_timeout(run_pipeline(&pipeline, &mut launcher, &mut sink, rx)).await;

    assert!(result.is_err());
    assert!(launched(&launcher).is_empty());
}

#[tokio::test]
async fn halted_pipeline_still_notes_skipped_dependents() {
    init_tracing();

    let pipeline = PipelineFileBuilder::new()
        .with_step("a", StepConfigBuilder::new("tool-a").build())
        .with_step("b", StepConfigBuilder::new("tool-b").after("a").build())
        .with_step("c", StepConfigBuilder::new("tool-c").after("b").build())
        .with_step("d", StepConfigBuilder::new("tool-d").build())
        .build();
    let mut launcher = FakeLauncher::new().script("a", ScriptedProcess::new().exit_code(5));
    let sink = MemorySink::new();
    let mut out = sink.clone();
    let (_tx, rx) = watch::channel(false);

    let report = with_timeout(run_pipeline(&pipeline, &mut launcher, &mut out, rx))
        .await
        .unwrap();

    assert_eq!(report.outcome_of("a"), Some(StepOutcome::Failed(5)));
    assert_eq!(report.outcome_of("b"), Some(StepOutcome::Skipped));
    assert_eq!(report.outcome_of("c"), Some(StepOutcome::Skipped));
    assert_eq!(report.outcome_of("d"), Some(StepOutcome::Skipped));
    assert_eq!(launched(&launcher), vec!["a"]);

    // Dependents get a note; the independent step is skipped silently.
    assert_eq!(
        sink.text_for(Tag::System),
        "Running a...\nSkipping b: a did not succeed.\nSkipping c: b did not succeed.\n"
    );
}
