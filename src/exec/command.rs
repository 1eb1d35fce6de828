// src/exec/command.rs

//! Spawning shell commands with piped output.

use std::path::Path;
use std::process::Stdio;

use tokio::process::{Child, Command};
use tracing::info;

use crate::errors::{Result, ToolstreamError};

/// Build a shell command appropriate for the platform.
pub fn shell_command(cmd: &str) -> Command {
    if cfg!(windows) {
        let mut c = Command::new("cmd");
        c.arg("/C").arg(cmd);
        c
    } else {
        let mut c = Command::new("sh");
        c.arg("-c").arg(cmd);
        c
    }
}

/// Spawn `cmd` through the platform shell with stdout/stderr piped.
///
/// The child is killed if its handle is dropped before it exits.
pub fn spawn_shell(cmd: &str, cwd: Option<&Path>) -> Result<Child> {
    let mut command = shell_command(cmd);
    if let Some(dir) = cwd {
        command.current_dir(dir);
    }

    info!(cmd = %cmd, cwd = ?cwd, "spawning shell command");
    spawn_piped(&mut command, cmd)
}

/// Spawn an already-configured command with piped output.
///
/// `display` is only used in the error when spawning fails.
pub(crate) fn spawn_piped(command: &mut Command, display: &str) -> Result<Child> {
    command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    command.spawn().map_err(|source| ToolstreamError::Spawn {
        command: display.to_string(),
        source,
    })
}
