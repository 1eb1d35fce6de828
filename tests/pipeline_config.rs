// tests/pipeline_config.rs
mod common;
use crate::common::init_tracing;

use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use tempfile::NamedTempFile;
use toolstream::cli::{CliArgs, CliCommand};
use toolstream::config::{PipelineFile, default_config_path, load_and_validate, load_from_path};
use toolstream::errors::ToolstreamError;
use toolstream::pipeline::StepGraph;
use toolstream_test_utils::builders::{PipelineFileBuilder, StepConfigBuilder};

fn write_config(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

fn config_error(contents: &str) -> String {
    let file = write_config(contents);
    match load_and_validate(file.path()) {
        Err(ToolstreamError::ConfigError(msg)) => msg,
        other => panic!("expected ConfigError, got {other:?}"),
    }
}

#[test]
fn minimal_file_gets_defaults() {
    init_tracing();

    let file = write_config(
        r#"
[step.hello]
cmd = "echo hello"
"#,
    );
    let pipeline = load_and_validate(file.path()).unwrap();

    assert_eq!(pipeline.config.batch_size, 1);
    assert_eq!(pipeline.config.poll_interval_ms, 0);
    assert!(pipeline.config.color);
    assert!(pipeline.config.launcher.is_empty());
    assert_eq!(pipeline.config.script_dir, PathBuf::from(".toolstream"));

    let step = &pipeline.step["hello"];
    assert_eq!(step.cmd, "echo hello");
    assert!(step.cwd.is_none());
    assert!(!step.script);
    assert!(step.after.is_empty());
    assert!(!step.continue_on_failure);
}

#[test]
fn config_section_maps_to_stream_options() {
    init_tracing();

    let file = write_config(
        r#"
[config]
batch_size = 4
poll_interval_ms = 25
launcher = ["wsl", "-e"]

[step.count]
cmd = "dsk -file list_reads"
script = true
"#,
    );
    let pipeline = load_and_validate(file.path()).unwrap();
    let options = pipeline.config.stream_options();

    assert_eq!(options.batch_size, 4);
    assert_eq!(options.poll_interval, Duration::from_millis(25));
    assert_eq!(pipeline.config.launcher, vec!["wsl", "-e"]);
}

#[test]
fn empty_file_has_no_steps() {
    init_tracing();

    let msg = config_error("");
    assert!(msg.contains("at least one [step.<name>]"), "{msg}");
}

#[test]
fn zero_batch_size_is_rejected() {
    init_tracing();

    let msg = config_error(
        r#"
[config]
batch_size = 0

[step.a]
cmd = "true"
"#,
    );
    assert!(msg.contains("batch_size must be >= 1"), "{msg}");
}

#[test]
fn empty_launcher_word_is_rejected() {
    init_tracing();

    let msg = config_error(
        r#"
[config]
launcher = ["wsl", ""]

[step.a]
cmd = "true"
"#,
    );
    assert!(msg.contains("launcher"), "{msg}");
}

#[test]
fn blank_command_is_rejected() {
    init_tracing();

    let msg = config_error(
        r#"
[step.blank]
cmd = "   "
"#,
    );
    assert!(msg.contains("step 'blank' has an empty `cmd`"), "{msg}");
}

#[test]
fn self_dependency_is_rejected() {
    init_tracing();

    let msg = config_error(
        r#"
[step.loop]
cmd = "true"
after = ["loop"]
"#,
    );
    assert!(msg.contains("cannot depend on itself"), "{msg}");
}

#[test]
fn unknown_dependency_is_rejected() {
    init_tracing();

    let msg = config_error(
        r#"
[step.export]
cmd = "dsk2ascii"
after = ["count"]
"#,
    );
    assert!(
        msg.contains("step 'export' has unknown dependency 'count'"),
        "{msg}"
    );
}

#[test]
fn dependency_cycle_is_rejected() {
    init_tracing();

    let file = write_config(
        r#"
[step.a]
cmd = "true"
after = ["c"]

[step.b]
cmd = "true"
after = ["a"]

[step.c]
cmd = "true"
after = ["b"]
"#,
    );
    match load_and_validate(file.path()) {
        Err(ToolstreamError::DependencyCycle(msg)) => {
            assert!(msg.contains("cycle detected"), "{msg}")
        }
        other => panic!("expected DependencyCycle, got {other:?}"),
    }
}

#[test]
fn malformed_toml_is_a_toml_error() {
    init_tracing();

    let file = write_config("[step.a\ncmd = ");
    assert!(matches!(
        load_from_path(file.path()),
        Err(ToolstreamError::TomlError(_))
    ));
}

#[test]
fn missing_cmd_is_a_toml_error() {
    init_tracing();

    let file = write_config("[step.a]\nafter = []\n");
    assert!(matches!(
        load_and_validate(file.path()),
        Err(ToolstreamError::TomlError(_))
    ));
}

#[test]
fn missing_file_is_an_io_error() {
    init_tracing();

    let dir = tempfile::tempdir().unwrap();
    assert!(matches!(
        load_and_validate(dir.path().join("Toolstream.toml")),
        Err(ToolstreamError::IoError(_))
    ));
}

#[test]
fn raw_file_can_be_inspected_before_validation() {
    init_tracing();

    let raw = PipelineFileBuilder::new().with_batch_size(0).build_raw();
    assert!(raw.step.is_empty());
    assert!(PipelineFile::try_from(raw).is_err());
}

#[test]
fn demo_pipeline_is_valid() {
    init_tracing();

    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("demos/kmer-pipeline.toml");
    let pipeline = load_and_validate(&path).unwrap();

    let order = StepGraph::from_pipeline(&pipeline).execution_order();
    assert_eq!(order, vec!["list", "count", "export", "summary"]);
    assert!(pipeline.step["count"].script);
    assert!(pipeline.step["count"].cmd.contains("dsk -file list_reads"));
}

#[test]
fn execution_order_respects_dependencies_and_breaks_ties_by_name() {
    init_tracing();

    let pipeline = PipelineFileBuilder::new()
        .with_step("zeta", StepConfigBuilder::new("true").build())
        .with_step("beta", StepConfigBuilder::new("true").after("zeta").build())
        .with_step("alpha", StepConfigBuilder::new("true").build())
        .with_step(
            "gamma",
            StepConfigBuilder::new("true").after("alpha").after("beta").build(),
        )
        .build();

    let graph = StepGraph::from_pipeline(&pipeline);
    assert_eq!(
        graph.execution_order(),
        vec!["alpha", "zeta", "beta", "gamma"]
    );
    assert_eq!(graph.dependencies_of("gamma"), ["alpha", "beta"]);
    assert_eq!(graph.dependents_of("zeta"), ["beta"]);
    assert!(graph.dependents_of("gamma").is_empty());
    assert_eq!(
        graph.steps().collect::<Vec<_>>(),
        vec!["alpha", "beta", "gamma", "zeta"]
    );
}

#[test]
fn pipeline_subcommand_defaults_to_the_standard_config_path() {
    let args = CliArgs::try_parse_from(["toolstream", "pipeline"]).unwrap();
    match args.command {
        CliCommand::Pipeline(pipeline) => {
            assert_eq!(pipeline.config, default_config_path());
            assert!(!pipeline.dry_run);
        }
        other => panic!("expected pipeline subcommand, got {other:?}"),
    }
}
