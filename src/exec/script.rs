// src/exec/script.rs

//! Running commands through temporary bash scripts.
//!
//! Multi-line tool invocations (e.g. `cd` followed by the tool itself) are
//! written to a throwaway script and run with `bash`, optionally behind a
//! launcher prefix such as `wsl -e`. The script file is removed when the
//! returned [`ScriptProcess`] is dropped.

use std::future::Future;
use std::io::{self, Write};
use std::path::Path;
use std::pin::Pin;

use tempfile::TempPath;
use tokio::process::{Child, Command};
use tracing::{debug, info};

use crate::errors::Result;
use crate::exec::command::spawn_piped;
use crate::paths::wsl_path;
use crate::process::{BoxedStream, ProcessHandle};
use crate::types::ExitState;

/// Write `command` into a new bash script inside `dir`.
///
/// `dir` is created if missing. Windows line endings are normalised so the
/// script also runs when the command text came from a Windows editor.
pub fn write_script(command: &str, dir: &Path) -> Result<TempPath> {
    std::fs::create_dir_all(dir)?;

    let mut file = tempfile::Builder::new()
        .prefix("toolstream-")
        .suffix(".sh")
        .tempfile_in(dir)?;

    let body = format!("#!/bin/bash\n{command}\n").replace("\r\n", "\n");
    file.write_all(body.as_bytes())?;
    file.flush()?;

    let path = file.into_temp_path();
    debug!(script = %path.display(), "wrote temporary script");
    Ok(path)
}

/// Build the command that runs `script`.
///
/// Without a launcher this is `bash <script>`. With one, the launcher words
/// come first and the script path is translated for WSL:
/// `wsl -e bash /mnt/c/...`.
pub fn script_command(script: &Path, launcher: &[String]) -> Command {
    match launcher.split_first() {
        None => {
            let mut c = Command::new("bash");
            c.arg(script);
            c
        }
        Some((program, rest)) => {
            let mut c = Command::new(program);
            c.args(rest).arg("bash").arg(wsl_path(script));
            c
        }
    }
}

/// Write `command` to a script in `dir` and start it.
pub fn spawn_script(
    command: &str,
    dir: &Path,
    launcher: &[String],
    cwd: Option<&Path>,
) -> Result<ScriptProcess> {
    let script = write_script(command, dir)?;

    let mut cmd = script_command(&script, launcher);
    if let Some(dir) = cwd {
        cmd.current_dir(dir);
    }

    info!(
        script = %script.display(),
        launcher = ?launcher,
        "spawning script"
    );
    let child = spawn_piped(&mut cmd, command)?;

    Ok(ScriptProcess { child, script })
}

/// A child process running a temporary script.
///
/// Dropping it deletes the script file (and kills the child if it is still
/// running).
#[derive(Debug)]
pub struct ScriptProcess {
    child: Child,
    script: TempPath,
}

impl ScriptProcess {
    pub fn script_path(&self) -> &Path {
        &self.script
    }
}

impl ProcessHandle for ScriptProcess {
    fn try_exit(&mut self) -> io::Result<Option<ExitState>> {
        self.child.try_exit()
    }

    fn wait(&mut self) -> Pin<Box<dyn Future<Output = io::Result<ExitState>> + Send + '_>> {
        ProcessHandle::wait(&mut self.child)
    }

    fn take_stdout(&mut self) -> Option<BoxedStream> {
        self.child.take_stdout()
    }

    fn take_stderr(&mut self) -> Option<BoxedStream> {
        self.child.take_stderr()
    }

    fn start_kill(&mut self) -> io::Result<()> {
        ProcessHandle::start_kill(&mut self.child)
    }
}
