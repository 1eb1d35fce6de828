// src/task.rs

//! Background work with an inspectable outcome.
//!
//! Every call to [`spawn_task`] or [`spawn_thread`] starts exactly one new
//! unit of execution (a Tokio task or a named OS thread respectively); there
//! is no pooling or queueing at this layer. The returned [`TaskHandle`]
//! resolves to either the work's value or the failure it produced.
//!
//! Failures are never dropped on the floor: an `Err` returned by the work, or
//! a panic inside it, is logged under the task's name *and* stored in the
//! handle, so whoever inspects the handle later sees the same error.
//!
//! Cancellation is not supported here. Work that must stop early should check
//! a flag of its own.

use std::any::Any;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};

use futures::FutureExt;
use thiserror::Error;
use tokio::sync::oneshot;
use tokio::sync::oneshot::error::TryRecvError;
use tracing::{debug, error};

/// Why a background task did not produce a value.
#[derive(Error, Debug)]
pub enum TaskError {
    /// The work returned an error.
    #[error("task failed: {0:#}")]
    Failed(anyhow::Error),

    /// The work panicked; the payload message is kept when it was a string.
    #[error("task panicked: {0}")]
    Panicked(String),

    /// The worker went away without reporting (e.g. runtime shutdown), or the
    /// outcome was already taken by an earlier [`TaskHandle::try_join`].
    #[error("task ended without reporting a result")]
    Lost,
}

pub type TaskOutcome<T> = std::result::Result<T, TaskError>;

/// Handle to the eventual outcome of a background task.
#[derive(Debug)]
pub struct TaskHandle<T> {
    name: String,
    rx: oneshot::Receiver<TaskOutcome<T>>,
}

impl<T> TaskHandle<T> {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Wait for the task to finish.
    pub async fn join(self) -> TaskOutcome<T> {
        self.rx.await.unwrap_or(Err(TaskError::Lost))
    }

    /// Blocking variant of [`join`](Self::join) for callers that are not
    /// running inside an async context (e.g. a GUI worker thread).
    ///
    /// Panics if called from within an async execution context.
    pub fn join_blocking(self) -> TaskOutcome<T> {
        self.rx.blocking_recv().unwrap_or(Err(TaskError::Lost))
    }

    /// Non-blocking check. Returns `None` while the task is still running.
    ///
    /// The outcome is handed out once; later calls report [`TaskError::Lost`].
    pub fn try_join(&mut self) -> Option<TaskOutcome<T>> {
        match self.rx.try_recv() {
            Ok(outcome) => Some(outcome),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Closed) => Some(Err(TaskError::Lost)),
        }
    }
}

/// Run `work` on a new Tokio task.
///
/// Must be called from within a Tokio runtime.
pub fn spawn_task<F, T>(name: impl Into<String>, work: F) -> TaskHandle<T>
where
    F: Future<Output = anyhow::Result<T>> + Send + 'static,
    T: Send + 'static,
{
    let name = name.into();
    let (tx, rx) = oneshot::channel();
    let task_name = name.clone();

    tokio::spawn(async move {
        let result = AssertUnwindSafe(work).catch_unwind().await;
        // The caller may have dropped the handle; the outcome is already logged.
        let _ = tx.send(settle(&task_name, result));
    });

    TaskHandle { name, rx }
}

/// Run blocking `work` on a new named OS thread.
pub fn spawn_thread<F, T>(name: impl Into<String>, work: F) -> TaskHandle<T>
where
    F: FnOnce() -> anyhow::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let name = name.into();
    let (tx, rx) = oneshot::channel();
    let task_name = name.clone();

    let spawned = std::thread::Builder::new()
        .name(name.clone())
        .spawn(move || {
            let result = panic::catch_unwind(AssertUnwindSafe(work));
            let _ = tx.send(settle(&task_name, result));
        });

    match spawned {
        Ok(_join) => TaskHandle { name, rx },
        Err(err) => {
            error!(task = %name, error = %err, "failed to spawn background thread");
            let (tx, rx) = oneshot::channel();
            let _ = tx.send(Err(TaskError::Failed(
                anyhow::Error::from(err).context(format!("spawning thread '{name}'")),
            )));
            TaskHandle { name, rx }
        }
    }
}

fn settle<T>(
    name: &str,
    result: std::thread::Result<anyhow::Result<T>>,
) -> TaskOutcome<T> {
    match result {
        Ok(Ok(value)) => {
            debug!(task = %name, "background task finished");
            Ok(value)
        }
        Ok(Err(err)) => {
            error!(task = %name, error = %format!("{err:#}"), "background task failed");
            Err(TaskError::Failed(err))
        }
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            error!(task = %name, panic = %message, "background task panicked");
            Err(TaskError::Panicked(message))
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
