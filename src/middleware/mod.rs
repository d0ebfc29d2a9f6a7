//! The request-logging middleware.
//!
//! # Per request
//!
//! ```text
//! request ─▶ resolve id ─▶ per-request logger ─▶ [request start] ─▶ inner service
//!                                                                        │
//!   response ◀─ stamp id (header, properties, logger) ◀──────────────────┘
//!      │
//!      └─ body streamed ─▶ request finish      (or dropped early ─▶ request socket closed)
//! ```
//!
//! Configuration and the base logger are captured once when [`RequestLog`]
//! is built and shared read-only by every request. Everything else (the id,
//! the timer, the per-request logger) belongs to a single request.
//!
//! # Reaching the logger from a handler
//!
//! The per-request [`Logger`] is inserted into the request's extensions
//! (and the response's). Records written through it carry the id under the
//! configured log field:
//!
//! ```rust,ignore
//! async fn handler(req: http::Request<Incoming>) -> Result<http::Response<Full<Bytes>>, Infallible> {
//!     if let Some(log) = req.extensions().get::<reqlog::Logger>() {
//!         log.info(reqlog::Record::new().field("user", 42), "loaded user");
//!     }
//!     // ...
//! }
//! ```
//!
//! The inner service future also runs inside the logger's `tracing` span,
//! so plain `tracing::info!` calls are correlated too.

mod body;
mod lifecycle;

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use http::header::CONTENT_LENGTH;
use http::{HeaderMap, HeaderName, Method};
use http_body::Body;
use hyper::service::Service;
use serde_json::{Map, Value};
use tracing::Instrument;

use crate::error::Error;
use crate::id;
use crate::logger::{Logger, ResSerializer, Serializers};
use crate::options::{Config, Options};
use crate::redact::Redactor;
use crate::request::RequestSnapshot;
use crate::response::ResponseSnapshot;
use crate::timer::Timer;

pub use body::LoggedBody;

use lifecycle::Exchange;

/// A heap-allocated, type-erased response future.
pub type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send + 'static>>;

// ── RequestLog ───────────────────────────────────────────────────────────────

/// Middleware factory: configuration plus the logger every request derives
/// from.
///
/// ```rust,no_run
/// use reqlog::{Logger, Options, RequestLog};
///
/// // defaults
/// let log = RequestLog::new(Logger::tracing());
///
/// // configured
/// let log = RequestLog::with_options(
///     Options::default().request_start(true).obscure_headers(["authorization"]),
///     Logger::tracing(),
/// ).expect("valid options");
/// ```
#[derive(Clone, Debug)]
pub struct RequestLog {
    config: Arc<Config>,
    logger: Logger,
}

impl RequestLog {
    /// Builds the middleware with default [`Options`].
    pub fn new(logger: Logger) -> Self {
        let (config, obscure_headers, obscure_body) =
            Config::split(Options::default(), HeaderName::from_static("x-request-id"));
        Self::assemble(config, obscure_headers, obscure_body, logger)
    }

    /// Builds the middleware from `options`.
    ///
    /// Fails if the configured header name is not a legal HTTP header name.
    pub fn with_options(options: Options, logger: Logger) -> Result<Self, Error> {
        let (config, obscure_headers, obscure_body) = Config::parse(options)?;
        Ok(Self::assemble(config, obscure_headers, obscure_body, logger))
    }

    pub fn builder() -> RequestLogBuilder {
        RequestLogBuilder { options: Options::default(), logger: None }
    }

    /// Registers the redacting `req` serializer (delegating to any `req`
    /// serializer already on `base`) and a `res` serializer (the one on
    /// `base`, else the standard one).
    fn assemble(config: Config, obscure_headers: Vec<String>, obscure_body: Vec<String>, base: Logger) -> Self {
        let parent = base.serializers().clone();
        let redactor = Redactor::new(parent.req, obscure_headers, obscure_body);
        let res: ResSerializer = match parent.res {
            Some(res) => res,
            None => Arc::new(ResponseSnapshot::to_value),
        };

        let logger = base.with_serializers(Serializers {
            req: Some(redactor.into_serializer()),
            res: Some(res),
        });

        Self { config: Arc::new(config), logger }
    }

    /// The logger every per-request logger is derived from.
    pub fn logger(&self) -> &Logger {
        &self.logger
    }

    /// Wraps `inner` so every request through it is logged.
    pub fn layer<S>(&self, inner: S) -> RequestLogService<S> {
        RequestLogService {
            inner,
            config: Arc::clone(&self.config),
            logger: self.logger.clone(),
        }
    }
}

/// Fallible construction of [`RequestLog`] when the logger is only known at
/// runtime. [`build`](RequestLogBuilder::build) refuses to proceed without one.
pub struct RequestLogBuilder {
    options: Options,
    logger: Option<Logger>,
}

impl RequestLogBuilder {
    pub fn options(mut self, options: Options) -> Self {
        self.options = options;
        self
    }

    pub fn logger(mut self, logger: Logger) -> Self {
        self.logger = Some(logger);
        self
    }

    pub fn build(self) -> Result<RequestLog, Error> {
        let logger = self.logger.ok_or(Error::MissingLogger)?;
        RequestLog::with_options(self.options, logger)
    }
}

// ── RequestLogService ────────────────────────────────────────────────────────

/// A hyper [`Service`] that logs every request it forwards to `S`.
///
/// Obtain via [`RequestLog::layer`].
#[derive(Clone, Debug)]
pub struct RequestLogService<S> {
    inner: S,
    config: Arc<Config>,
    logger: Logger,
}

impl<S, ReqBody, ResBody> Service<http::Request<ReqBody>> for RequestLogService<S>
where
    S: Service<http::Request<ReqBody>, Response = http::Response<ResBody>>,
    S::Future: Send + 'static,
    S::Error: Send + 'static,
    ResBody: Body + Send + 'static,
{
    type Response = http::Response<LoggedBody<ResBody>>;
    type Error = S::Error;
    type Future = BoxFuture<Result<Self::Response, Self::Error>>;

    fn call(&self, mut req: http::Request<ReqBody>) -> Self::Future {
        let timer = Timer::start();
        let config = Arc::clone(&self.config);

        let id = id::resolve(&mut req, &config.property_name, &config.header, &config.id_generator);

        let mut bound = Map::new();
        bound.insert(config.log_name.clone(), Value::String(id.clone()));
        let span = tracing::info_span!("request", id = %id);
        let logger = self.logger.scoped(bound, span.clone());
        req.extensions_mut().insert(logger.clone());

        let head_only = req.method() == Method::HEAD;
        let mut exchange = Exchange::new(
            Arc::clone(&config),
            logger.clone(),
            timer,
            RequestSnapshot::capture(&req),
            &id,
        );
        exchange.start();

        let response = self.inner.call(req).instrument(span);

        Box::pin(async move {
            let mut res = match response.await {
                Ok(res) => res,
                // Dropping `exchange` logs the close.
                Err(e) => return Err(e),
            };

            id::stamp(&mut res, &config.property_name, &config.header, &id);
            res.extensions_mut().insert(logger);
            exchange.respond(ResponseSnapshot::capture(&res));

            let declared = content_length(res.headers());
            Ok(res.map(|body| LoggedBody::new(body, exchange, head_only, declared)))
        })
    }
}

fn content_length(headers: &HeaderMap) -> Option<u64> {
    headers.get(CONTENT_LENGTH)?.to_str().ok()?.trim().parse().ok()
}
