// src/coordinator.rs

//! Output coordinator: run one "show this process's output live" session.
//!
//! The coordinator starts one pump per output stream (stdout tagged
//! [`Tag::Normal`], stderr tagged [`Tag::Error`]), consumes the shared queue
//! while the process is alive, and flushes to a [`Sink`] every
//! `batch_size` messages. Once the process has exited, everything still queued
//! is drained into the buffer and delivered in one final flush, tagged
//! [`Tag::Error`] when the run failed and [`Tag::Normal`] otherwise.
//!
//! Ordering: messages of one stream arrive in the order they were read;
//! interleaving between stdout and stderr depends on scheduling.
//!
//! Tag policy for in-loop flushes:
//! - `batch_size == 1`: each flush carries the message's own tag.
//! - `batch_size > 1`: the whole batch is flushed as [`Tag::Normal`].
//!
//! A session never kills or otherwise manages the process; it only polls it
//! and reads its exit state. A failed process is not an error here. Sink
//! errors are returned to the caller. [`stream_until_shutdown`] is the one
//! place that ends a process early, when its caller asks for it.

use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::time::{Instant, sleep, timeout, timeout_at};
use tracing::{debug, info, warn};

use crate::errors::Result;
use crate::process::ProcessHandle;
use crate::pump::{PumpStats, spawn_pump};
use crate::sink::{ConsoleSink, Sink};
use crate::task::TaskHandle;
use crate::types::{ExitState, Tag, TaggedMessage};

/// Knobs for a streaming session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamOptions {
    /// Pause after every loop iteration. Zero means no artificial delay.
    pub poll_interval: Duration,
    /// Flush every this many messages. Values below 1 are treated as 1.
    pub batch_size: usize,
    /// How long one dequeue attempt waits before re-checking the process.
    pub dequeue_timeout: Duration,
    /// Upper bound on waiting for the pumps to hit end-of-stream after exit.
    /// `Duration::MAX` waits for them without a deadline.
    pub drain_timeout: Duration,
}

impl Default for StreamOptions {
    fn default() -> Self {
        Self {
            poll_interval: Duration::ZERO,
            batch_size: 1,
            dequeue_timeout: Duration::from_millis(100),
            drain_timeout: Duration::from_secs(5),
        }
    }
}

impl StreamOptions {
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn effective_batch_size(&self) -> usize {
        self.batch_size.max(1)
    }
}

/// What one session observed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionReport {
    pub exit: ExitState,
    /// Messages taken off the queue, in-loop and during the final drain.
    pub messages: usize,
    /// Calls made to the sink, including the final flush.
    pub deliveries: usize,
    /// Pumps that stopped on a read error, as `"<pump>: <error>"`.
    pub stream_errors: Vec<String>,
}

impl SessionReport {
    pub fn success(&self) -> bool {
        self.exit.success()
    }
}

/// Accumulated text since the last flush.
#[derive(Debug, Default)]
struct OutputBuffer {
    text: String,
    count: usize,
    last_tag: Tag,
}

impl OutputBuffer {
    fn push(&mut self, message: TaggedMessage) {
        self.text.push_str(&message.text);
        self.count += 1;
        self.last_tag = message.tag;
    }

    fn take(&mut self) -> String {
        self.count = 0;
        std::mem::take(&mut self.text)
    }

    fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// Stream `process`'s output to `sink`, or to stdout when no sink is given.
///
/// The console fallback prefixes error text with its tag when
/// `batch_size == 1`, since colour is not assumed.
pub async fn display_process_output<P>(
    process: &mut P,
    sink: Option<&mut dyn Sink>,
    options: &StreamOptions,
) -> Result<SessionReport>
where
    P: ProcessHandle + ?Sized,
{
    match sink {
        Some(sink) => stream_output(process, sink, options).await,
        None => {
            let mut console =
                ConsoleSink::stdout().with_tag_prefix(options.effective_batch_size() == 1);
            stream_output(process, &mut console, options).await
        }
    }
}

/// Stream `process`'s output to `sink` until the process exits and all
/// queued output has been delivered.
pub async fn stream_output<P>(
    process: &mut P,
    sink: &mut dyn Sink,
    options: &StreamOptions,
) -> Result<SessionReport>
where
    P: ProcessHandle + ?Sized,
{
    let (tx, mut rx) = mpsc::unbounded_channel::<TaggedMessage>();
    let mut pumps: Vec<TaskHandle<PumpStats>> = Vec::with_capacity(2);

    match process.take_stdout() {
        Some(stream) => pumps.push(spawn_pump("stdout-pump", stream, tx.clone(), Tag::Normal)),
        None => warn!("process has no stdout pipe; stdout will not be shown"),
    }
    match process.take_stderr() {
        Some(stream) => pumps.push(spawn_pump("stderr-pump", stream, tx.clone(), Tag::Error)),
        None => warn!("process has no stderr pipe; stderr will not be shown"),
    }
    // Only the pumps hold senders, so the queue closes once both have finished.
    drop(tx);

    let batch_size = options.effective_batch_size();
    let mut buffer = OutputBuffer::default();
    let mut messages = 0usize;
    let mut deliveries = 0usize;

    let exit = loop {
        match process.try_exit() {
            Ok(Some(state)) => break state,
            Ok(None) => {}
            Err(err) => {
                warn!(error = %err, "could not poll process state; waiting for exit instead");
                break process.wait().await?;
            }
        }

        match timeout(options.dequeue_timeout, rx.recv()).await {
            Ok(Some(message)) => {
                messages += 1;
                buffer.push(message);

                if buffer.count % batch_size == 0 {
                    let tag = if batch_size > 1 {
                        Tag::Normal
                    } else {
                        buffer.last_tag
                    };
                    let text = buffer.take();
                    sink.deliver(&text, tag)?;
                    deliveries += 1;
                }
            }
            Ok(None) => {
                // Both streams are closed; nothing else can arrive.
                debug!("all output streams closed; waiting for process exit");
                break process.wait().await?;
            }
            Err(_elapsed) => {}
        }

        if !options.poll_interval.is_zero() {
            sleep(options.poll_interval).await;
        }
    };

    let (drained, queue_closed) = drain_queue(&mut rx, &mut buffer, options.drain_timeout).await;
    messages += drained;

    let mut stream_errors = Vec::new();
    for mut pump in pumps {
        let name = pump.name().to_string();
        let outcome = if queue_closed {
            Some(pump.join().await)
        } else {
            pump.try_join()
        };
        if let Some(Err(err)) = outcome {
            stream_errors.push(format!("{name}: {err}"));
        }
    }

    let final_tag = if exit.success() { Tag::Normal } else { Tag::Error };
    if !buffer.is_empty() || !exit.success() {
        let text = buffer.take();
        sink.deliver(&text, final_tag)?;
        deliveries += 1;
    }

    info!(
        exit = %exit,
        success = exit.success(),
        messages,
        deliveries,
        "process output session finished"
    );

    Ok(SessionReport {
        exit,
        messages,
        deliveries,
        stream_errors,
    })
}

/// [`stream_output`], abandoned as soon as `shutdown` becomes `true`.
///
/// On shutdown the process is killed and reaped, and `Ok(None)` is returned;
/// output not yet delivered at that point is dropped.
pub async fn stream_until_shutdown<P>(
    process: &mut P,
    sink: &mut dyn Sink,
    options: &StreamOptions,
    shutdown: &mut watch::Receiver<bool>,
) -> Result<Option<SessionReport>>
where
    P: ProcessHandle + ?Sized,
{
    let session = tokio::select! {
        res = stream_output(&mut *process, sink, options) => Some(res?),
        _ = shutdown_requested(shutdown) => None,
    };
    if session.is_some() {
        return Ok(session);
    }

    warn!("shutdown requested; killing process");
    if let Err(err) = process.start_kill() {
        warn!(error = %err, "failed to kill process");
    }
    if let Err(err) = process.wait().await {
        warn!(error = %err, "failed to reap process");
    }
    Ok(None)
}

/// Resolves once `shutdown` is `true`. Never resolves if the sender is gone.
async fn shutdown_requested(shutdown: &mut watch::Receiver<bool>) {
    if shutdown.wait_for(|requested| *requested).await.is_err() {
        std::future::pending::<()>().await;
    }
}

/// Move everything left in the queue into `buffer`.
///
/// Waits for the pumps to reach end-of-stream (the queue closes) for at most
/// `limit`, then takes whatever is immediately available. Returns the number
/// of drained messages and whether the queue closed.
async fn drain_queue(
    rx: &mut mpsc::UnboundedReceiver<TaggedMessage>,
    buffer: &mut OutputBuffer,
    limit: Duration,
) -> (usize, bool) {
    let mut drained = 0usize;

    // A limit too large to express as an instant means no deadline at all.
    let Some(deadline) = Instant::now().checked_add(limit) else {
        while let Some(message) = rx.recv().await {
            buffer.push(message);
            drained += 1;
        }
        return (drained, true);
    };

    loop {
        match timeout_at(deadline, rx.recv()).await {
            Ok(Some(message)) => {
                buffer.push(message);
                drained += 1;
            }
            Ok(None) => return (drained, true),
            Err(_elapsed) => {
                warn!(
                    timeout_ms = limit.as_millis() as u64,
                    "output streams still open after process exit; delivering what is queued"
                );
                while let Ok(message) = rx.try_recv() {
                    buffer.push(message);
                    drained += 1;
                }
                return (drained, false);
            }
        }
    }
}
