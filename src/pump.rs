// src/pump.rs

//! Stream pump: move one process output stream into the shared queue.

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, trace};

use crate::task::{TaskHandle, spawn_task};
use crate::types::{Tag, TaggedMessage};

/// Sending half of the shared output queue.
pub type MessageSender = mpsc::UnboundedSender<TaggedMessage>;

/// What a pump moved before its stream ended.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PumpStats {
    pub messages: usize,
    pub bytes: usize,
}

/// Read `stream` line by line and enqueue each line as `(tag, line)`.
///
/// Lines keep their trailing `\n`; a final fragment without a newline is
/// enqueued as-is. Invalid UTF-8 is replaced rather than rejected, since tool
/// output is for display.
///
/// Returns when the stream reports end-of-data (the stream is dropped, i.e.
/// closed, on return) or when nobody is consuming the queue anymore. Read
/// errors end the pump and are returned to the caller.
pub async fn pump_stream<R>(stream: R, queue: MessageSender, tag: Tag) -> Result<PumpStats>
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(stream);
    let mut buf = Vec::new();
    let mut stats = PumpStats::default();

    loop {
        buf.clear();
        let n = reader
            .read_until(b'\n', &mut buf)
            .await
            .with_context(|| format!("reading {tag} stream"))?;
        if n == 0 {
            break;
        }

        let text = String::from_utf8_lossy(&buf).into_owned();
        trace!(%tag, bytes = n, "pumped chunk");

        if queue.send(TaggedMessage::new(tag, text)).is_err() {
            debug!(%tag, "output queue closed; stopping pump");
            break;
        }

        stats.messages += 1;
        stats.bytes += n;
    }

    debug!(
        %tag,
        messages = stats.messages,
        bytes = stats.bytes,
        "stream pump finished"
    );
    Ok(stats)
}

/// Start [`pump_stream`] in the background.
pub fn spawn_pump<R>(
    label: impl Into<String>,
    stream: R,
    queue: MessageSender,
    tag: Tag,
) -> TaskHandle<PumpStats>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    spawn_task(label, pump_stream(stream, queue, tag))
}
