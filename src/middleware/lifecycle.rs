//! Per-request lifecycle events.
//!
//! ```text
//! created ──start()──▶ started
//!    │                    │
//!    ├────────────────────┼──finish()──▶ finished
//!    └────────────────────┴──drop──────▶ closed
//! ```
//!
//! `start` is optional (gated by `request_start` / `verbose`). An
//! [`Exchange`] dropped before `finish` logs `request socket closed`: the
//! client went away, the inner service failed, or the body was abandoned.

use std::sync::Arc;

use serde_json::Value;
use tracing::Level;

use crate::logger::{Logger, Record};
use crate::options::Config;
use crate::request::RequestSnapshot;
use crate::response::ResponseSnapshot;
use crate::timer::Timer;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Phase {
    Created,
    Started,
    Finished,
    Closed,
}

/// All state of one request/response exchange. Owned by exactly one place at
/// a time: the response future, then the response body.
pub(crate) struct Exchange {
    config: Arc<Config>,
    logger: Logger,
    timer: Timer,
    req: RequestSnapshot,
    res: ResponseSnapshot,
    phase: Phase,
}

impl Exchange {
    pub(crate) fn new(config: Arc<Config>, logger: Logger, timer: Timer, req: RequestSnapshot, id: &str) -> Self {
        let res = ResponseSnapshot::pending(config.header.as_str(), id);
        Self { config, logger, timer, req, res, phase: Phase::Created }
    }

    pub(crate) fn start(&mut self) {
        let config = &self.config;
        if self.phase != Phase::Created || !(config.request_start || config.verbose) {
            return;
        }

        let mut record = Record::new().req(&self.req);
        if config.verbose {
            record = record.res(&self.res);
        }
        self.logger.log(config.level, record, "request start");
        self.phase = Phase::Started;
    }

    /// Replaces the pending response snapshot with the real one.
    pub(crate) fn respond(&mut self, res: ResponseSnapshot) {
        self.res = res;
    }

    pub(crate) fn finish(&mut self) {
        if self.is_terminal() {
            return;
        }

        let config = &self.config;
        let mut record = Record::new()
            .res(&self.res)
            .field("duration", duration(&self.timer));
        if !config.request_start || config.verbose {
            record = record.req(&self.req);
        }
        if let Some(finish_data) = &config.finish_data {
            if let Some(extra) = finish_data(&self.req, &self.res) {
                record = record.extend(extra);
            }
        }
        self.logger.log(config.level, record, "request finish");
        self.phase = Phase::Finished;
    }

    pub(crate) fn close(&mut self) {
        if self.is_terminal() {
            return;
        }

        let record = Record::new()
            .req(&self.req)
            .res(&self.res)
            .field("duration", duration(&self.timer));
        self.logger.log(Level::WARN, record, "request socket closed");
        self.phase = Phase::Closed;
    }

    fn is_terminal(&self) -> bool {
        matches!(self.phase, Phase::Finished | Phase::Closed)
    }
}

impl Drop for Exchange {
    fn drop(&mut self) {
        self.close();
    }
}

fn duration(timer: &Timer) -> Value {
    Value::from(timer.elapsed_ms())
}
