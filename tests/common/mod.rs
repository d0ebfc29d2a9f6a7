//! Shared utilities for the integration tests.

use std::collections::VecDeque;
use std::convert::Infallible;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};

use bytes::Bytes;
use http_body::{Body, Frame};
use reqlog::LogSink;
use serde_json::{Map, Value};
use tracing::Level;

/// One record written through a [`Capture`] sink.
#[derive(Clone, Debug)]
pub struct Entry {
    pub level: Level,
    pub record: Map<String, Value>,
    pub message: String,
}

/// A [`LogSink`] that keeps every record in memory.
#[derive(Clone, Default)]
pub struct Capture(Arc<Mutex<Vec<Entry>>>);

impl LogSink for Capture {
    fn log(&self, level: Level, record: &Map<String, Value>, message: &str) {
        self.0.lock().unwrap().push(Entry {
            level,
            record: record.clone(),
            message: message.to_owned(),
        });
    }
}

#[allow(dead_code)]
impl Capture {
    pub fn entries(&self) -> Vec<Entry> {
        self.0.lock().unwrap().clone()
    }

    pub fn messages(&self) -> Vec<String> {
        self.entries().into_iter().map(|e| e.message).collect()
    }

    pub fn count(&self, message: &str) -> usize {
        self.entries().iter().filter(|e| e.message == message).count()
    }

    /// The first record with `message`.
    pub fn record(&self, message: &str) -> Map<String, Value> {
        self.entries()
            .into_iter()
            .find(|e| e.message == message)
            .map(|e| e.record)
            .unwrap_or_else(|| panic!("no `{message}` record in {:?}", self.messages()))
    }
}

/// A streamed body: one frame per chunk, with no size hint and no early
/// end-of-stream signal.
#[derive(Debug)]
pub struct Chunks(VecDeque<Bytes>);

#[allow(dead_code)]
impl Chunks {
    pub fn new<I>(chunks: I) -> Self
    where
        I: IntoIterator<Item = &'static str>,
    {
        Self(chunks.into_iter().map(|c| Bytes::from_static(c.as_bytes())).collect())
    }
}

impl Body for Chunks {
    type Data = Bytes;
    type Error = Infallible;

    fn poll_frame(
        mut self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Bytes>, Infallible>>> {
        Poll::Ready(self.0.pop_front().map(|chunk| Ok(Frame::data(chunk))))
    }
}
