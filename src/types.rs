// src/types.rs

use std::fmt;

/// Classification of a piece of output: where it came from, or how severe it is.
///
/// - `Normal`: regular standard-output text.
/// - `Error`: standard-error text, or the final flush of a failed run.
/// - `Success`: status messages announcing that a step finished cleanly.
/// - `System`: status messages produced by toolstream itself (banners, notes).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Tag {
    #[default]
    Normal,
    Error,
    Success,
    System,
}

impl Tag {
    /// Stable lowercase label, used for console prefixes and logging.
    pub fn label(self) -> &'static str {
        match self {
            Tag::Normal => "normal",
            Tag::Error => "error",
            Tag::Success => "success",
            Tag::System => "system",
        }
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One fragment of output together with its tag.
///
/// Fragments are not necessarily whole lines; concatenating the fragments of
/// one stream in order reproduces that stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaggedMessage {
    pub tag: Tag,
    pub text: String,
}

impl TaggedMessage {
    pub fn new(tag: Tag, text: impl Into<String>) -> Self {
        Self {
            tag,
            text: text.into(),
        }
    }
}

/// How a child process ended.
///
/// `code` is `None` when the process was terminated by a signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitState {
    pub code: Option<i32>,
}

impl ExitState {
    pub fn from_code(code: i32) -> Self {
        Self { code: Some(code) }
    }

    pub fn signalled() -> Self {
        Self { code: None }
    }

    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// Exit code for reporting; signal terminations map to `-1`.
    pub fn code_or_default(&self) -> i32 {
        self.code.unwrap_or(-1)
    }
}

impl From<std::process::ExitStatus> for ExitState {
    fn from(status: std::process::ExitStatus) -> Self {
        Self {
            code: status.code(),
        }
    }
}

impl fmt::Display for ExitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code {
            Some(code) => write!(f, "exit code {code}"),
            None => f.write_str("terminated by signal"),
        }
    }
}
