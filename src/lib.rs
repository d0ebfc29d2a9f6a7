//! # reqlog
//!
//! Request-correlation logging for hyper services.
//!
//! Every request that passes through the middleware gets one correlation id
//! and one request-scoped logger, and produces structured lifecycle records:
//!
//! | Message | When | Level |
//! |---|---|---|
//! | `request start` | on arrival (only with `request_start` / `verbose`) | configured |
//! | `request finish` | the response body was fully handed to the connection | configured |
//! | `request socket closed` | the exchange ended without finishing | `WARN` |
//!
//! ## The id
//!
//! Taken from the request's [`Properties`] if an upstream layer already set
//! one, else from the `X-Request-Id` header, else generated (UUID v4). The
//! same value ends up on the request, the response, the response's
//! `X-Request-Id` header and every record (as `req_id`).
//!
//! ## Redaction
//!
//! Logged requests go through a redacting serializer: configured headers
//! (none by default) and top-level body fields (`password` by default) are
//! replaced with `"FILTERED"`. The request itself is never modified.
//!
//! ## What reqlog does not do
//!
//! - **Transport and formatting**: records go to a [`LogSink`]; the default
//!   one writes `tracing` events, and your subscriber decides the rest.
//! - **Routing and body parsing**: wrap your own service; put a decoded body
//!   in a [`ParsedBody`] extension if you want it logged.
//! - **Distributed tracing**: one opaque token per request, nothing more.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use std::convert::Infallible;
//!
//! use bytes::Bytes;
//! use http_body_util::Full;
//! use hyper::body::Incoming;
//! use hyper::service::service_fn;
//! use reqlog::{Logger, Options, RequestLog, Server};
//!
//! #[tokio::main]
//! async fn main() {
//!     let log = RequestLog::with_options(
//!         Options::default().obscure_headers(["authorization"]),
//!         Logger::tracing(),
//!     )
//!     .unwrap();
//!
//!     let app = log.layer(service_fn(hello));
//!
//!     Server::bind("0.0.0.0:3000").serve(app).await.unwrap();
//! }
//!
//! async fn hello(_req: http::Request<Incoming>) -> Result<http::Response<Full<Bytes>>, Infallible> {
//!     Ok(http::Response::new(Full::new(Bytes::from_static(b"hello"))))
//! }
//! ```

mod error;
mod id;
mod logger;
mod options;
mod redact;
mod request;
mod response;
mod server;
mod timer;

pub mod middleware;

pub use error::Error;
pub use id::{IdGenerator, Properties, RequestId, uuid_v4};
pub use logger::{LogSink, Logger, Record, ReqSerializer, ResSerializer, Serializers, TracingSink};
pub use middleware::{LoggedBody, RequestLog, RequestLogBuilder, RequestLogService};
pub use options::{FinishData, Options};
pub use redact::PLACEHOLDER;
pub use request::{OriginalUrl, ParsedBody, RemoteAddr, RequestSnapshot};
pub use response::ResponseSnapshot;
pub use server::Server;
pub use timer::Timer;
