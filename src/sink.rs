// src/sink.rs

//! Output sinks: where flushed output ends up.
//!
//! The coordinator only knows the [`Sink`] trait. Concrete sinks:
//! - [`ConsoleSink`]: any `Write` (stdout by default), optionally coloured.
//! - [`MemorySink`]: collects deliveries in memory; cheap to clone and share.
//! - [`ChannelSink`]: forwards deliveries to another task, e.g. a UI event
//!   loop that must not be blocked by the streaming session.
//!
//! How a tag is displayed (colour, prefix) is decided by the sink, never by
//! the coordinator.

use std::io::{self, Write};
use std::sync::{Arc, Mutex, PoisonError};

use owo_colors::{OwoColorize, Style};
use thiserror::Error;
use tokio::sync::mpsc;

use crate::types::Tag;

#[derive(Error, Debug)]
pub enum SinkError {
    #[error("write failed: {0}")]
    Io(#[from] io::Error),

    #[error("receiver closed")]
    Closed,

    /// For sinks outside this crate that refuse a delivery for their own
    /// reasons (e.g. a closed window).
    #[error("{0}")]
    Rejected(String),
}

/// Something that makes flushed output visible to a user or a log.
pub trait Sink: Send {
    fn deliver(&mut self, text: &str, tag: Tag) -> Result<(), SinkError>;
}

impl<S: Sink + ?Sized> Sink for &mut S {
    fn deliver(&mut self, text: &str, tag: Tag) -> Result<(), SinkError> {
        (**self).deliver(text, tag)
    }
}

impl<S: Sink + ?Sized> Sink for Box<S> {
    fn deliver(&mut self, text: &str, tag: Tag) -> Result<(), SinkError> {
        (**self).deliver(text, tag)
    }
}

/// One flush as received by a sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub tag: Tag,
    pub text: String,
}

/// Writes output to a terminal-like writer.
pub struct ConsoleSink {
    out: Box<dyn Write + Send>,
    color: bool,
    tag_prefix: bool,
}

impl ConsoleSink {
    /// Plain, uncoloured sink on stdout.
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }

    pub fn new(writer: impl Write + Send + 'static) -> Self {
        Self {
            out: Box::new(writer),
            color: false,
            tag_prefix: false,
        }
    }

    /// Colour text by tag using ANSI escapes.
    pub fn with_color(mut self, color: bool) -> Self {
        self.color = color;
        self
    }

    /// Prefix non-normal text with `"<tag>: "`.
    pub fn with_tag_prefix(mut self, tag_prefix: bool) -> Self {
        self.tag_prefix = tag_prefix;
        self
    }
}

fn style_for(tag: Tag) -> Style {
    match tag {
        Tag::Normal => Style::new(),
        Tag::Error => Style::new().red(),
        Tag::Success => Style::new().green(),
        Tag::System => Style::new().cyan(),
    }
}

impl Sink for ConsoleSink {
    fn deliver(&mut self, text: &str, tag: Tag) -> Result<(), SinkError> {
        if text.is_empty() {
            return Ok(());
        }

        let text = if self.tag_prefix && tag != Tag::Normal {
            format!("{}: {}", tag.label(), text)
        } else {
            text.to_string()
        };

        if self.color {
            write!(self.out, "{}", text.style(style_for(tag)))?;
        } else {
            self.out.write_all(text.as_bytes())?;
        }
        self.out.flush()?;
        Ok(())
    }
}

/// Collects deliveries in memory.
///
/// Clones share the same storage, so a test (or a caller) can keep one clone
/// and hand the other to the coordinator.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    deliveries: Arc<Mutex<Vec<Delivery>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything delivered so far, in delivery order.
    pub fn deliveries(&self) -> Vec<Delivery> {
        self.deliveries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// All delivered text concatenated.
    pub fn text(&self) -> String {
        self.deliveries().into_iter().map(|d| d.text).collect()
    }

    /// Text of deliveries carrying `tag`, concatenated.
    pub fn text_for(&self, tag: Tag) -> String {
        self.deliveries()
            .into_iter()
            .filter(|d| d.tag == tag)
            .map(|d| d.text)
            .collect()
    }
}

impl Sink for MemorySink {
    fn deliver(&mut self, text: &str, tag: Tag) -> Result<(), SinkError> {
        self.deliveries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Delivery {
                tag,
                text: text.to_string(),
            });
        Ok(())
    }
}

/// Forwards deliveries over an unbounded channel.
///
/// The receiving side typically lives on a UI event loop; delivering never
/// blocks the streaming session.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<Delivery>,
}

impl ChannelSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Delivery>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl Sink for ChannelSink {
    fn deliver(&mut self, text: &str, tag: Tag) -> Result<(), SinkError> {
        self.tx
            .send(Delivery {
                tag,
                text: text.to_string(),
            })
            .map_err(|_| SinkError::Closed)
    }
}
