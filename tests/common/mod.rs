#![allow(dead_code)]

pub use toolstream_test_utils::{init_tracing, with_timeout};

use toolstream::sink::{Sink, SinkError};
use toolstream::types::Tag;

/// A sink whose display is broken: accepts `ok_deliveries` flushes, then
/// rejects everything.
pub struct FailingSink {
    pub ok_deliveries: usize,
    pub seen: usize,
}

impl FailingSink {
    pub fn new(ok_deliveries: usize) -> Self {
        Self {
            ok_deliveries,
            seen: 0,
        }
    }
}

impl Sink for FailingSink {
    fn deliver(&mut self, _text: &str, _tag: Tag) -> Result<(), SinkError> {
        if self.seen >= self.ok_deliveries {
            return Err(SinkError::Rejected("display unavailable".to_string()));
        }
        self.seen += 1;
        Ok(())
    }
}
