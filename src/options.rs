//! Middleware configuration.
//!
//! ```rust
//! use reqlog::Options;
//! use tracing::Level;
//!
//! let options = Options::default()
//!     .header_name("X-Correlation-Id")
//!     .level(Level::DEBUG)
//!     .request_start(true)
//!     .obscure_headers(["Authorization", "Cookie"])
//!     .obscure_body(["password", "token"]);
//! ```
//!
//! `Options` is plain data. It is validated and frozen when the middleware is
//! built; nothing can change it per request.

use std::fmt;
use std::sync::Arc;

use http::HeaderName;
use serde_json::{Map, Value};
use tracing::Level;

use crate::error::Error;
use crate::id::{self, IdGenerator};
use crate::request::RequestSnapshot;
use crate::response::ResponseSnapshot;

/// Computes extra fields for the `request finish` record.
pub type FinishData =
    Arc<dyn Fn(&RequestSnapshot, &ResponseSnapshot) -> Option<Map<String, Value>> + Send + Sync>;

/// Builder for the middleware's behaviour. See the [module docs](self).
#[derive(Clone)]
pub struct Options {
    pub(crate) header_name: String,
    pub(crate) property_name: String,
    pub(crate) log_name: String,
    pub(crate) level: Level,
    pub(crate) request_start: bool,
    pub(crate) verbose: bool,
    pub(crate) obscure_headers: Vec<String>,
    pub(crate) obscure_body: Vec<String>,
    pub(crate) finish_data: Option<FinishData>,
    pub(crate) id_generator: IdGenerator,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            header_name: "X-Request-Id".to_owned(),
            property_name: "reqId".to_owned(),
            log_name: "req_id".to_owned(),
            level: Level::INFO,
            request_start: false,
            verbose: false,
            obscure_headers: Vec::new(),
            obscure_body: vec!["password".to_owned()],
            finish_data: None,
            id_generator: Arc::new(id::uuid_v4),
        }
    }
}

impl Options {
    /// Header carrying the correlation id in both directions.
    /// Default `X-Request-Id`, matched case-insensitively.
    pub fn header_name(mut self, name: impl Into<String>) -> Self {
        self.header_name = name.into();
        self
    }

    /// Key under which the id is stored in request and response
    /// [`Properties`](crate::Properties). Default `reqId`.
    pub fn property_name(mut self, name: impl Into<String>) -> Self {
        self.property_name = name.into();
        self
    }

    /// Record field holding the id. Default `req_id`.
    pub fn log_name(mut self, name: impl Into<String>) -> Self {
        self.log_name = name.into();
        self
    }

    /// Level of the `request start` and `request finish` events. Default `INFO`.
    pub fn level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    /// Log `request start` as soon as the request arrives.
    pub fn request_start(mut self, enabled: bool) -> Self {
        self.request_start = enabled;
        self
    }

    /// Log `request start`, and include both `req` and `res` in start and
    /// finish records.
    pub fn verbose(mut self, enabled: bool) -> Self {
        self.verbose = enabled;
        self
    }

    /// Headers whose values are replaced in logged requests. Default none.
    pub fn obscure_headers<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.obscure_headers = names.into_iter().map(Into::into).collect();
        self
    }

    /// Top-level body fields whose values are replaced in logged requests.
    /// Default `["password"]`; an empty list disables body redaction.
    pub fn obscure_body<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.obscure_body = names.into_iter().map(Into::into).collect();
        self
    }

    /// Merges the returned fields into every `request finish` record.
    pub fn additional_request_finish_data<F>(mut self, f: F) -> Self
    where
        F: Fn(&RequestSnapshot, &ResponseSnapshot) -> Option<Map<String, Value>> + Send + Sync + 'static,
    {
        self.finish_data = Some(Arc::new(f));
        self
    }

    /// Replaces the UUID v4 generator used for requests without an id.
    pub fn id_generator<F>(mut self, f: F) -> Self
    where
        F: Fn() -> String + Send + Sync + 'static,
    {
        self.id_generator = Arc::new(f);
        self
    }
}

impl fmt::Debug for Options {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Options")
            .field("header_name", &self.header_name)
            .field("property_name", &self.property_name)
            .field("log_name", &self.log_name)
            .field("level", &self.level)
            .field("request_start", &self.request_start)
            .field("verbose", &self.verbose)
            .field("obscure_headers", &self.obscure_headers)
            .field("obscure_body", &self.obscure_body)
            .field("additional_request_finish_data", &self.finish_data.is_some())
            .finish_non_exhaustive()
    }
}

/// Validated, immutable form of [`Options`] shared by every request.
pub(crate) struct Config {
    pub(crate) header: HeaderName,
    pub(crate) property_name: String,
    pub(crate) log_name: String,
    pub(crate) level: Level,
    pub(crate) request_start: bool,
    pub(crate) verbose: bool,
    pub(crate) finish_data: Option<FinishData>,
    pub(crate) id_generator: IdGenerator,
}

impl Config {
    /// Splits `options` into the per-request config and the redaction lists
    /// (lower-cased headers, body fields).
    pub(crate) fn parse(options: Options) -> Result<(Self, Vec<String>, Vec<String>), Error> {
        let header = HeaderName::from_bytes(options.header_name.to_ascii_lowercase().as_bytes())
            .map_err(|_| Error::InvalidHeaderName(options.header_name.clone()))?;
        Ok(Self::split(options, header))
    }

    /// Like [`parse`](Config::parse), with the header name already validated.
    pub(crate) fn split(options: Options, header: HeaderName) -> (Self, Vec<String>, Vec<String>) {
        let obscure_headers = options.obscure_headers.iter()
            .map(|name| name.to_ascii_lowercase())
            .collect();

        let config = Self {
            header,
            property_name: options.property_name,
            log_name: options.log_name,
            level: options.level,
            request_start: options.request_start,
            verbose: options.verbose,
            finish_data: options.finish_data,
            id_generator: options.id_generator,
        };
        (config, obscure_headers, options.obscure_body)
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("header", &self.header)
            .field("property_name", &self.property_name)
            .field("log_name", &self.log_name)
            .field("level", &self.level)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let (config, headers, body) = Config::parse(Options::default()).unwrap();

        assert_eq!(config.header, "x-request-id");
        assert_eq!(config.property_name, "reqId");
        assert_eq!(config.log_name, "req_id");
        assert_eq!(config.level, Level::INFO);
        assert!(!config.request_start);
        assert!(!config.verbose);
        assert!(config.finish_data.is_none());
        assert!(headers.is_empty());
        assert_eq!(body, ["password"]);
    }

    #[test]
    fn header_names_are_lower_cased() {
        let options = Options::default()
            .header_name("X-Correlation-ID")
            .obscure_headers(["Authorization", "COOKIE"]);

        let (config, headers, _) = Config::parse(options).unwrap();

        assert_eq!(config.header.as_str(), "x-correlation-id");
        assert_eq!(headers, ["authorization", "cookie"]);
    }

    #[test]
    fn rejects_illegal_header_name() {
        let err = Config::parse(Options::default().header_name("bad header")).err().unwrap();

        assert!(matches!(err, Error::InvalidHeaderName(name) if name == "bad header"));
    }

    #[test]
    fn custom_generator_is_kept() {
        let (config, _, _) = Config::parse(Options::default().id_generator(|| "fixed".into())).unwrap();

        assert_eq!((config.id_generator)(), "fixed");
    }
}
