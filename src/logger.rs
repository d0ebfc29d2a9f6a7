//! Structured request logger.
//!
//! # Model
//!
//! A [`Logger`] is a cheap handle (one `Arc`) carrying:
//!
//! - **bound fields**: included in every record it writes,
//! - **serializers**: hooks that turn the `req` / `res` snapshots of a
//!   [`Record`] into JSON,
//! - a **span**: entered while writing, so `tracing` subscribers see the
//!   record inside the request's context,
//! - a **sink**: where finished records go.
//!
//! Deriving a logger never mutates the parent:
//!
//! ```text
//! base ──with_serializers──▶ middleware logger ──child({req_id})──▶ per-request logger
//! ```
//!
//! Cloning a logger does not derive anything: clones share the same fields,
//! serializers and sink.

use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::{Level, Span};

use crate::request::RequestSnapshot;
use crate::response::ResponseSnapshot;

/// Serialization hook for the `req` field.
pub type ReqSerializer = Arc<dyn Fn(&RequestSnapshot) -> Value + Send + Sync>;

/// Serialization hook for the `res` field.
pub type ResSerializer = Arc<dyn Fn(&ResponseSnapshot) -> Value + Send + Sync>;

/// The `req` / `res` serialization hooks registered on a logger.
///
/// An empty slot falls back to the snapshot's standard serialization.
#[derive(Clone, Default)]
pub struct Serializers {
    pub req: Option<ReqSerializer>,
    pub res: Option<ResSerializer>,
}

impl fmt::Debug for Serializers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Serializers")
            .field("req", &self.req.is_some())
            .field("res", &self.res.is_some())
            .finish()
    }
}

/// Destination of rendered log records.
pub trait LogSink: Send + Sync + 'static {
    fn log(&self, level: Level, record: &Map<String, Value>, message: &str);
}

/// Writes each record as one `tracing` event.
///
/// The record is rendered as JSON into the `record` field; the event's
/// message is the log message.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn log(&self, level: Level, record: &Map<String, Value>, message: &str) {
        let record = Value::Object(record.clone());
        match level {
            Level::ERROR => tracing::error!(target: "reqlog", record = %record, "{message}"),
            Level::WARN  => tracing::warn!(target: "reqlog", record = %record, "{message}"),
            Level::INFO  => tracing::info!(target: "reqlog", record = %record, "{message}"),
            Level::DEBUG => tracing::debug!(target: "reqlog", record = %record, "{message}"),
            _            => tracing::trace!(target: "reqlog", record = %record, "{message}"),
        }
    }
}

/// The payload of a single log call.
#[derive(Default)]
pub struct Record<'a> {
    req: Option<&'a RequestSnapshot>,
    res: Option<&'a ResponseSnapshot>,
    fields: Map<String, Value>,
}

impl<'a> Record<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn req(mut self, req: &'a RequestSnapshot) -> Self {
        self.req = Some(req);
        self
    }

    pub fn res(mut self, res: &'a ResponseSnapshot) -> Self {
        self.res = Some(res);
        self
    }

    pub fn field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    /// Shallow merge; keys already present are overwritten.
    pub fn extend(mut self, fields: Map<String, Value>) -> Self {
        self.fields.extend(fields);
        self
    }
}

/// A structured logger. See the [module docs](self).
#[derive(Clone)]
pub struct Logger {
    inner: Arc<Inner>,
}

struct Inner {
    sink: Arc<dyn LogSink>,
    fields: Map<String, Value>,
    serializers: Serializers,
    span: Span,
}

impl Logger {
    pub fn new(sink: impl LogSink) -> Self {
        Self {
            inner: Arc::new(Inner {
                sink: Arc::new(sink),
                fields: Map::new(),
                serializers: Serializers::default(),
                span: Span::none(),
            }),
        }
    }

    /// A logger writing through [`TracingSink`].
    pub fn tracing() -> Self {
        Self::new(TracingSink)
    }

    /// Derives a logger with `fields` added to the bound set.
    pub fn child(&self, fields: Map<String, Value>) -> Self {
        let mut bound = self.inner.fields.clone();
        bound.extend(fields);
        self.derive(bound, self.inner.serializers.clone(), self.inner.span.clone())
    }

    /// Derives a logger with the given hooks registered. Empty slots keep
    /// the parent's hook.
    pub fn with_serializers(&self, serializers: Serializers) -> Self {
        let parent = &self.inner.serializers;
        let merged = Serializers {
            req: serializers.req.or_else(|| parent.req.clone()),
            res: serializers.res.or_else(|| parent.res.clone()),
        };
        self.derive(self.inner.fields.clone(), merged, self.inner.span.clone())
    }

    pub(crate) fn scoped(&self, fields: Map<String, Value>, span: Span) -> Self {
        let mut bound = self.inner.fields.clone();
        bound.extend(fields);
        self.derive(bound, self.inner.serializers.clone(), span)
    }

    fn derive(&self, fields: Map<String, Value>, serializers: Serializers, span: Span) -> Self {
        Self {
            inner: Arc::new(Inner {
                sink: Arc::clone(&self.inner.sink),
                fields,
                serializers,
                span,
            }),
        }
    }

    pub fn fields(&self) -> &Map<String, Value> { &self.inner.fields }
    pub fn serializers(&self) -> &Serializers { &self.inner.serializers }
    pub fn span(&self) -> &Span { &self.inner.span }

    /// Renders `record` against the bound fields and serializers, then hands
    /// it to the sink.
    pub fn log(&self, level: Level, record: Record<'_>, message: &str) {
        let rendered = self.render(record);
        let _entered = self.inner.span.enter();
        self.inner.sink.log(level, &rendered, message);
    }

    pub fn trace(&self, record: Record<'_>, message: &str) { self.log(Level::TRACE, record, message) }
    pub fn debug(&self, record: Record<'_>, message: &str) { self.log(Level::DEBUG, record, message) }
    pub fn info(&self, record: Record<'_>, message: &str)  { self.log(Level::INFO, record, message) }
    pub fn warn(&self, record: Record<'_>, message: &str)  { self.log(Level::WARN, record, message) }
    pub fn error(&self, record: Record<'_>, message: &str) { self.log(Level::ERROR, record, message) }

    /// Bound fields first, then `req` and `res`, then the record's own fields.
    pub fn render(&self, record: Record<'_>) -> Map<String, Value> {
        let serializers = &self.inner.serializers;
        let mut out = self.inner.fields.clone();

        if let Some(req) = record.req {
            let value = match &serializers.req {
                Some(serialize) => serialize(req),
                None => req.to_value(),
            };
            out.insert("req".to_owned(), value);
        }
        if let Some(res) = record.res {
            let value = match &serializers.res {
                Some(serialize) => serialize(res),
                None => res.to_value(),
            };
            out.insert("res".to_owned(), value);
        }

        out.extend(record.fields);
        out
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("fields", &self.inner.fields)
            .field("serializers", &self.inner.serializers)
            .finish_non_exhaustive()
    }
}
