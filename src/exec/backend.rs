// src/exec/backend.rs

//! Pluggable process launcher for pipeline steps.
//!
//! The pipeline runner asks a `StepLauncher` for a running process instead of
//! spawning one itself. Production code uses [`RealStepLauncher`]; tests can
//! hand out scripted fake processes instead.

use std::path::{Path, PathBuf};

use crate::config::StepConfig;
use crate::errors::Result;
use crate::process::ProcessHandle;

use super::command::spawn_shell;
use super::script::spawn_script;

/// Trait abstracting how a pipeline step becomes a running process.
pub trait StepLauncher: Send {
    fn launch(&mut self, name: &str, step: &StepConfig) -> Result<Box<dyn ProcessHandle>>;
}

/// Launcher that spawns real OS processes.
///
/// - Relative step `cwd`s are resolved against `root_dir`.
/// - `script = true` steps are written to a temporary script in `script_dir`
///   and run through `launcher` (e.g. `["wsl", "-e"]`) when one is set.
#[derive(Debug, Clone)]
pub struct RealStepLauncher {
    root_dir: PathBuf,
    script_dir: PathBuf,
    launcher: Vec<String>,
}

impl RealStepLauncher {
    pub fn new(root_dir: impl Into<PathBuf>, script_dir: impl Into<PathBuf>, launcher: Vec<String>) -> Self {
        Self {
            root_dir: root_dir.into(),
            script_dir: script_dir.into(),
            launcher,
        }
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root_dir.join(path)
        }
    }
}

impl StepLauncher for RealStepLauncher {
    fn launch(&mut self, _name: &str, step: &StepConfig) -> Result<Box<dyn ProcessHandle>> {
        let cwd = step.cwd.as_deref().map(|p| self.resolve(p));

        if step.script {
            let script_dir = self.resolve(&self.script_dir);
            let process = spawn_script(&step.cmd, &script_dir, &self.launcher, cwd.as_deref())?;
            Ok(Box::new(process))
        } else {
            let child = spawn_shell(&step.cmd, cwd.as_deref())?;
            Ok(Box::new(child))
        }
    }
}
