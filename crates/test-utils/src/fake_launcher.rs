use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use toolstream::config::StepConfig;
use toolstream::errors::{Result, ToolstreamError};
use toolstream::exec::StepLauncher;
use toolstream::process::ProcessHandle;

use crate::fake_process::{ExitControl, ScriptedProcess};

/// A fake launcher that:
/// - records which steps were launched, in order
/// - plays back a [`ScriptedProcess`] per step (default: silent, exit 0)
/// - can refuse to start selected steps.
pub struct FakeLauncher {
    scripts: HashMap<String, ScriptedProcess>,
    refuse: Vec<String>,
    launched: Arc<Mutex<Vec<String>>>,
    controls: Arc<Mutex<HashMap<String, ExitControl>>>,
}

impl FakeLauncher {
    pub fn new() -> Self {
        Self {
            scripts: HashMap::new(),
            refuse: Vec::new(),
            launched: Arc::new(Mutex::new(Vec::new())),
            controls: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn script(mut self, step: &str, script: ScriptedProcess) -> Self {
        self.scripts.insert(step.to_string(), script);
        self
    }

    pub fn refuse(mut self, step: &str) -> Self {
        self.refuse.push(step.to_string());
        self
    }

    /// Shared list of launched step names.
    pub fn launched(&self) -> Arc<Mutex<Vec<String>>> {
        Arc::clone(&self.launched)
    }

    /// Exit control of a launched step, if it was launched.
    pub fn control(&self, step: &str) -> Option<ExitControl> {
        self.controls.lock().unwrap().get(step).cloned()
    }
}

impl Default for FakeLauncher {
    fn default() -> Self {
        Self::new()
    }
}

impl StepLauncher for FakeLauncher {
    fn launch(&mut self, name: &str, step: &StepConfig) -> Result<Box<dyn ProcessHandle>> {
        if self.refuse.iter().any(|r| r == name) {
            return Err(ToolstreamError::Spawn {
                command: step.cmd.clone(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such tool"),
            });
        }

        self.launched.lock().unwrap().push(name.to_string());

        let script = self.scripts.get(name).cloned().unwrap_or_default();
        let (process, control) = script.spawn();
        self.controls
            .lock()
            .unwrap()
            .insert(name.to_string(), control);

        Ok(Box::new(process))
    }
}
