#![allow(dead_code)]

use std::collections::BTreeMap;
use std::path::PathBuf;

use toolstream::config::{ConfigSection, PipelineFile, RawPipelineFile, StepConfig};

/// Builder for `PipelineFile` to simplify test setup.
pub struct PipelineFileBuilder {
    config: RawPipelineFile,
}

impl PipelineFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawPipelineFile {
                config: ConfigSection::default(),
                step: BTreeMap::new(),
            },
        }
    }

    pub fn with_step(mut self, name: &str, step: StepConfig) -> Self {
        self.config.step.insert(name.to_string(), step);
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.config.config.batch_size = batch_size;
        self
    }

    pub fn with_launcher(mut self, words: &[&str]) -> Self {
        self.config.config.launcher = words.iter().map(|w| w.to_string()).collect();
        self
    }

    pub fn build_raw(self) -> RawPipelineFile {
        self.config
    }

    pub fn build(self) -> PipelineFile {
        PipelineFile::try_from(self.config).expect("Failed to build valid pipeline from builder")
    }
}

impl Default for PipelineFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `StepConfig`.
pub struct StepConfigBuilder {
    step: StepConfig,
}

impl StepConfigBuilder {
    pub fn new(cmd: &str) -> Self {
        Self {
            step: StepConfig {
                cmd: cmd.to_string(),
                cwd: None,
                script: false,
                after: vec![],
                continue_on_failure: false,
            },
        }
    }

    pub fn after(mut self, dep: &str) -> Self {
        self.step.after.push(dep.to_string());
        self
    }

    pub fn cwd(mut self, dir: &str) -> Self {
        self.step.cwd = Some(PathBuf::from(dir));
        self
    }

    pub fn script(mut self, val: bool) -> Self {
        self.step.script = val;
        self
    }

    pub fn continue_on_failure(mut self, val: bool) -> Self {
        self.step.continue_on_failure = val;
        self
    }

    pub fn build(self) -> StepConfig {
        self.step
    }
}
