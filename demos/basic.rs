//! Minimal reqlog example: a JSON echo service with request logging.
//!
//! Run with:
//!   RUST_LOG=info cargo run --example basic
//!
//! Try:
//!   curl -i http://localhost:3000/users/42
//!   curl -i -H 'x-request-id: my-trace' http://localhost:3000/users/42
//!   curl -i -H 'authorization: Bearer secret' http://localhost:3000/slow
//!     (Ctrl-C the curl before it completes to see `request socket closed`)

use std::convert::Infallible;
use std::time::Duration;

use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::service::service_fn;
use reqlog::{Logger, Options, Record, RequestId, RequestLog, Server};
use serde_json::{Map, json};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let options = Options::default()
        .request_start(true)
        .obscure_headers(["authorization", "cookie"])
        .additional_request_finish_data(|_req, res| {
            let mut extra = Map::new();
            extra.insert("status".into(), json!(res.status_code()));
            Some(extra)
        });

    let log = RequestLog::with_options(options, Logger::tracing()).expect("valid options");
    let app = log.layer(service_fn(handle));

    Server::bind("0.0.0.0:3000")
        .serve(app)
        .await
        .expect("server error");
}

async fn handle(req: http::Request<Incoming>) -> Result<http::Response<Full<Bytes>>, Infallible> {
    // The per-request logger: every record carries `req_id`.
    if let Some(log) = req.extensions().get::<Logger>() {
        log.debug(Record::new().field("path", req.uri().path()), "handling");
    }

    if req.uri().path() == "/slow" {
        tokio::time::sleep(Duration::from_secs(5)).await;
    }

    let id = req.extensions().get::<RequestId>().map(ToString::to_string).unwrap_or_default();
    let body = json!({ "path": req.uri().path(), "request_id": id }).to_string();

    Ok(http::Response::builder()
        .header("content-type", "application/json")
        .body(Full::new(Bytes::from(body)))
        .expect("static response parts"))
}
