// src/config/model.rs

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::coordinator::StreamOptions;

/// Pipeline file as read from TOML, before validation.
///
/// ```toml
/// [config]
/// batch_size = 1
/// launcher = ["wsl", "-e"]
///
/// [step.list]
/// cmd = "ls -1 data/* > list_reads"
///
/// [step.count]
/// cmd = "dsk -file list_reads -kmer-size 31"
/// after = ["list"]
/// ```
///
/// All sections are optional at the TOML level; validation requires at least
/// one step.
#[derive(Debug, Clone, Deserialize)]
pub struct RawPipelineFile {
    #[serde(default)]
    pub config: ConfigSection,

    /// Keys are step names.
    #[serde(default)]
    pub step: BTreeMap<String, StepConfig>,
}

/// A validated pipeline. Only constructible through `TryFrom<RawPipelineFile>`
/// (see `validate.rs`), so holders can rely on:
/// - at least one step,
/// - every `after` entry naming another existing step,
/// - no dependency cycles.
#[derive(Debug, Clone)]
pub struct PipelineFile {
    pub config: ConfigSection,
    pub step: BTreeMap<String, StepConfig>,
}

impl PipelineFile {
    pub(crate) fn new_unchecked(config: ConfigSection, step: BTreeMap<String, StepConfig>) -> Self {
        Self { config, step }
    }
}

/// `[config]` section: how output is streamed and how scripts are launched.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigSection {
    /// Pause between coordinator loop iterations, in milliseconds.
    #[serde(default)]
    pub poll_interval_ms: u64,

    /// Flush to the console every this many messages (>= 1).
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Colour output by tag.
    #[serde(default = "default_color")]
    pub color: bool,

    /// Command prefix for `script = true` steps, e.g. `["wsl", "-e"]`.
    #[serde(default)]
    pub launcher: Vec<String>,

    /// Where temporary scripts are written. Relative to the config file.
    #[serde(default = "default_script_dir")]
    pub script_dir: PathBuf,
}

fn default_batch_size() -> usize {
    1
}

fn default_color() -> bool {
    true
}

fn default_script_dir() -> PathBuf {
    PathBuf::from(".toolstream")
}

impl Default for ConfigSection {
    fn default() -> Self {
        Self {
            poll_interval_ms: 0,
            batch_size: default_batch_size(),
            color: default_color(),
            launcher: Vec::new(),
            script_dir: default_script_dir(),
        }
    }
}

impl ConfigSection {
    pub fn stream_options(&self) -> StreamOptions {
        StreamOptions::default()
            .with_batch_size(self.batch_size)
            .with_poll_interval(Duration::from_millis(self.poll_interval_ms))
    }
}

/// `[step.<name>]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct StepConfig {
    /// The command to execute.
    pub cmd: String,

    /// Working directory, relative to the config file unless absolute.
    #[serde(default)]
    pub cwd: Option<PathBuf>,

    /// Run `cmd` from a temporary bash script (through `[config].launcher`).
    #[serde(default)]
    pub script: bool,

    /// Steps that must succeed before this one runs.
    #[serde(default)]
    pub after: Vec<String>,

    /// Keep running independent steps when this one fails.
    #[serde(default)]
    pub continue_on_failure: bool,
}
