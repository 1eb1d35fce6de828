//! Scriptable stand-ins for child processes.

use std::future::Future;
use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::task::{Context, Poll};
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWriteExt, DuplexStream, ReadBuf};
use tokio::sync::watch;

use toolstream::process::{BoxedStream, ProcessHandle};
use toolstream::types::ExitState;

const PIPE_CAPACITY: usize = 64 * 1024;

/// A fake process whose streams and exit are driven by the test.
pub struct FakeProcess {
    stdout: Option<BoxedStream>,
    stderr: Option<BoxedStream>,
    exit: ExitControl,
    exit_rx: watch::Receiver<Option<ExitState>>,
    failing_polls: usize,
}

/// Test-side control over when (and how) a [`FakeProcess`] exits.
#[derive(Clone)]
pub struct ExitControl {
    tx: Arc<watch::Sender<Option<ExitState>>>,
    killed: Arc<AtomicBool>,
}

impl ExitControl {
    pub fn exit(&self, code: i32) {
        self.tx.send_replace(Some(ExitState::from_code(code)));
    }

    pub fn has_exited(&self) -> bool {
        self.tx.borrow().is_some()
    }

    pub fn was_killed(&self) -> bool {
        self.killed.load(Ordering::SeqCst)
    }
}

impl FakeProcess {
    /// A process with the given streams (either may be absent).
    pub fn with_streams(
        stdout: Option<BoxedStream>,
        stderr: Option<BoxedStream>,
    ) -> (Self, ExitControl) {
        let (tx, exit_rx) = watch::channel(None);
        let exit = ExitControl {
            tx: Arc::new(tx),
            killed: Arc::new(AtomicBool::new(false)),
        };
        let process = Self {
            stdout,
            stderr,
            exit: exit.clone(),
            exit_rx,
            failing_polls: 0,
        };
        (process, exit)
    }

    /// A process with in-memory pipes; the test writes through [`FakeOutput`].
    pub fn piped() -> (Self, FakeOutput, ExitControl) {
        let (out_w, out_r) = tokio::io::duplex(PIPE_CAPACITY);
        let (err_w, err_r) = tokio::io::duplex(PIPE_CAPACITY);
        let (process, exit) =
            Self::with_streams(
                Some(Box::pin(out_r) as BoxedStream),
                Some(Box::pin(err_r) as BoxedStream),
            );
        let output = FakeOutput {
            stdout: Some(out_w),
            stderr: Some(err_w),
        };
        (process, output, exit)
    }

    /// Make the next `n` calls to `try_exit` fail.
    pub fn fail_polls(mut self, n: usize) -> Self {
        self.failing_polls = n;
        self
    }
}

impl ProcessHandle for FakeProcess {
    fn try_exit(&mut self) -> io::Result<Option<ExitState>> {
        if self.failing_polls > 0 {
            self.failing_polls -= 1;
            return Err(io::Error::other("poll failed"));
        }
        Ok(*self.exit_rx.borrow())
    }

    fn wait(&mut self) -> Pin<Box<dyn Future<Output = io::Result<ExitState>> + Send + '_>> {
        Box::pin(async move {
            let state = *self
                .exit_rx
                .wait_for(|state| state.is_some())
                .await
                .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "exit control dropped"))?;
            Ok(state.unwrap_or(ExitState::signalled()))
        })
    }

    fn take_stdout(&mut self) -> Option<BoxedStream> {
        self.stdout.take()
    }

    fn take_stderr(&mut self) -> Option<BoxedStream> {
        self.stderr.take()
    }

    fn start_kill(&mut self) -> io::Result<()> {
        self.exit.killed.store(true, Ordering::SeqCst);
        self.exit.tx.send_if_modified(|state| {
            if state.is_none() {
                *state = Some(ExitState::signalled());
                true
            } else {
                false
            }
        });
        Ok(())
    }
}

/// Write side of a [`FakeProcess::piped`] process.
pub struct FakeOutput {
    stdout: Option<DuplexStream>,
    stderr: Option<DuplexStream>,
}

impl FakeOutput {
    pub async fn stdout(&mut self, text: &str) -> io::Result<()> {
        write_to(&mut self.stdout, text).await
    }

    pub async fn stderr(&mut self, text: &str) -> io::Result<()> {
        write_to(&mut self.stderr, text).await
    }

    /// Close both streams (end-of-data for the pumps).
    pub fn close(&mut self) {
        self.stdout = None;
        self.stderr = None;
    }
}

async fn write_to(pipe: &mut Option<DuplexStream>, text: &str) -> io::Result<()> {
    match pipe {
        Some(pipe) => pipe.write_all(text.as_bytes()).await,
        None => Err(io::Error::new(io::ErrorKind::BrokenPipe, "stream closed")),
    }
}

/// One action of a [`ScriptedProcess`].
#[derive(Debug, Clone)]
pub enum Chunk {
    Stdout(String),
    Stderr(String),
    Pause(Duration),
}

/// Builder for a fake process that plays back a fixed script:
/// write every chunk, close both streams, wait `exit_delay`, then exit.
#[derive(Debug, Clone)]
pub struct ScriptedProcess {
    chunks: Vec<Chunk>,
    exit_code: Option<i32>,
    exit_delay: Duration,
}

impl Default for ScriptedProcess {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedProcess {
    pub fn new() -> Self {
        Self {
            chunks: Vec::new(),
            exit_code: Some(0),
            exit_delay: Duration::ZERO,
        }
    }

    pub fn stdout(mut self, text: &str) -> Self {
        self.chunks.push(Chunk::Stdout(text.to_string()));
        self
    }

    pub fn stderr(mut self, text: &str) -> Self {
        self.chunks.push(Chunk::Stderr(text.to_string()));
        self
    }

    pub fn pause(mut self, duration: Duration) -> Self {
        self.chunks.push(Chunk::Pause(duration));
        self
    }

    pub fn exit_code(mut self, code: i32) -> Self {
        self.exit_code = Some(code);
        self
    }

    /// Keep running after the script until killed.
    pub fn run_until_killed(mut self) -> Self {
        self.exit_code = None;
        self
    }

    /// Delay between closing the streams and exiting.
    pub fn exit_delay(mut self, delay: Duration) -> Self {
        self.exit_delay = delay;
        self
    }

    /// Start playing the script on a Tokio task.
    pub fn spawn(self) -> (FakeProcess, ExitControl) {
        let (process, mut output, exit) = FakeProcess::piped();
        let control = exit.clone();

        tokio::spawn(async move {
            for chunk in self.chunks {
                let res = match chunk {
                    Chunk::Stdout(text) => output.stdout(&text).await,
                    Chunk::Stderr(text) => output.stderr(&text).await,
                    Chunk::Pause(d) => {
                        tokio::time::sleep(d).await;
                        Ok(())
                    }
                };
                if res.is_err() {
                    break;
                }
            }
            output.close();

            if let Some(code) = self.exit_code {
                tokio::time::sleep(self.exit_delay).await;
                control.exit(code);
            }
        });

        (process, exit)
    }
}

/// A stream that yields `data` and then fails every further read.
pub struct FailingStream {
    data: Vec<u8>,
    pos: usize,
    message: String,
}

impl FailingStream {
    pub fn new(data: &str, message: &str) -> Self {
        Self {
            data: data.as_bytes().to_vec(),
            pos: 0,
            message: message.to_string(),
        }
    }
}

impl AsyncRead for FailingStream {
    fn poll_read(
        mut self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = &mut *self;
        if this.pos < this.data.len() {
            let n = buf.remaining().min(this.data.len() - this.pos);
            buf.put_slice(&this.data[this.pos..this.pos + n]);
            this.pos += n;
            Poll::Ready(Ok(()))
        } else {
            Poll::Ready(Err(io::Error::other(this.message.clone())))
        }
    }
}
