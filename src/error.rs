//! Unified error type.

use std::fmt;

/// The error type returned by reqlog's fallible operations.
///
/// Per-request work never fails: a malformed request simply produces a log
/// record with fewer fields. This type surfaces construction-time mistakes
/// and the server's infrastructure failures (binding a port, accepting a
/// connection).
#[derive(Debug)]
pub enum Error {
    /// The middleware was built without a logger.
    MissingLogger,
    /// The configured correlation header is not a legal HTTP header name.
    InvalidHeaderName(String),
    /// Socket-level failure in [`Server`](crate::Server).
    Io(std::io::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingLogger => f.write_str("`logger` is required"),
            Self::InvalidHeaderName(name) => write!(f, "invalid header name `{name}`"),
            Self::Io(e) => write!(f, "io: {e}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}
