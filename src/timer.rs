//! Request duration measurement.
//!
//! Backed by [`Instant`], which is monotonic: wall-clock adjustments (NTP
//! slews, manual changes) never make a request look shorter or negative.

use std::time::Instant;

/// A start mark captured when the request enters the middleware.
#[derive(Clone, Copy, Debug)]
pub struct Timer {
    start: Instant,
}

impl Timer {
    pub fn start() -> Self {
        Self { start: Instant::now() }
    }

    /// Milliseconds since [`Timer::start`], with sub-millisecond precision.
    pub fn elapsed_ms(&self) -> f64 {
        self.start.elapsed().as_secs_f64() * 1e3
    }
}
