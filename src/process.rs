// src/process.rs

//! Abstraction over a running child process.
//!
//! The output coordinator only needs to poll liveness, wait for exit and read
//! the two output streams. Keeping that behind [`ProcessHandle`] lets tests
//! drive the coordinator with scripted fake processes instead of real ones.

use std::future::Future;
use std::io;
use std::pin::Pin;

use tokio::io::AsyncRead;
use tokio::process::Child;

use crate::types::ExitState;

/// A readable output stream handed over by a process.
pub type BoxedStream = Pin<Box<dyn AsyncRead + Send>>;

/// Capabilities the coordinator needs from a running process.
///
/// Implementors own the process; the coordinator only borrows it.
pub trait ProcessHandle: Send {
    /// Non-blocking liveness check.
    ///
    /// - `Ok(None)`: still running.
    /// - `Ok(Some(state))`: exited.
    /// - `Err(_)`: state could not be determined.
    fn try_exit(&mut self) -> io::Result<Option<ExitState>>;

    /// Wait until the process has exited.
    fn wait(&mut self) -> Pin<Box<dyn Future<Output = io::Result<ExitState>> + Send + '_>>;

    /// Take the standard-output stream. Returns `None` once taken, or if the
    /// process was started without a pipe.
    fn take_stdout(&mut self) -> Option<BoxedStream>;

    /// Take the standard-error stream. Same contract as [`take_stdout`](Self::take_stdout).
    fn take_stderr(&mut self) -> Option<BoxedStream>;

    /// Ask the process to terminate without waiting for it.
    fn start_kill(&mut self) -> io::Result<()>;
}

impl ProcessHandle for Child {
    fn try_exit(&mut self) -> io::Result<Option<ExitState>> {
        Ok(self.try_wait()?.map(ExitState::from))
    }

    fn wait(&mut self) -> Pin<Box<dyn Future<Output = io::Result<ExitState>> + Send + '_>> {
        Box::pin(async move { Child::wait(self).await.map(ExitState::from) })
    }

    fn take_stdout(&mut self) -> Option<BoxedStream> {
        self.stdout.take().map(|s| Box::pin(s) as BoxedStream)
    }

    fn take_stderr(&mut self) -> Option<BoxedStream> {
        self.stderr.take().map(|s| Box::pin(s) as BoxedStream)
    }

    fn start_kill(&mut self) -> io::Result<()> {
        Child::start_kill(self)
    }
}
