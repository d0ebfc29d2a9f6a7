//! Loggable view of an incoming request.
//!
//! The middleware never logs the live [`http::Request`]: it moves into the
//! inner service and may be consumed there. Instead a [`RequestSnapshot`] is
//! captured up front and every lifecycle event serializes that.
//!
//! Data the `http` types do not carry themselves is read from request
//! extensions, when an upstream layer put it there:
//!
//! | Extension | Record field |
//! |---|---|
//! | [`OriginalUrl`] | `url` (instead of the current path and query) |
//! | [`ParsedBody`] | `body` |
//! | [`RemoteAddr`] | `remoteAddress`, `remotePort` |
//!
//! A missing extension leaves the field out of the record.

use std::collections::BTreeMap;
use std::net::SocketAddr;

use http::HeaderMap;
use serde::Serialize;
use serde_json::Value;

use crate::id::RequestId;

/// The request URL before any internal rewrite.
#[derive(Clone, Debug)]
pub struct OriginalUrl(pub String);

/// A request body already decoded by an upstream body parser.
#[derive(Clone, Debug)]
pub struct ParsedBody(pub Value);

/// Address of the peer on the other end of the connection.
///
/// [`Server`](crate::Server) inserts this into every request it accepts.
#[derive(Clone, Copy, Debug)]
pub struct RemoteAddr(pub SocketAddr);

/// Everything the request log records say about one request.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestSnapshot {
    method: String,
    url: String,
    headers: BTreeMap<String, String>,
    query: BTreeMap<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    remote_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    remote_port: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    body: Option<Value>,
    #[serde(skip)]
    id: Option<String>,
}

impl RequestSnapshot {
    /// Copies the loggable parts of `req`. The request is left untouched.
    pub fn capture<B>(req: &http::Request<B>) -> Self {
        let extensions = req.extensions();

        let url = match extensions.get::<OriginalUrl>() {
            Some(OriginalUrl(url)) => url.clone(),
            None => req
                .uri()
                .path_and_query()
                .map_or_else(|| req.uri().path().to_owned(), |pq| pq.as_str().to_owned()),
        };

        let remote = extensions.get::<RemoteAddr>().map(|RemoteAddr(addr)| *addr);

        Self {
            method: req.method().as_str().to_owned(),
            url,
            headers: header_map(req.headers()),
            query: req.uri().query().map(query_map).unwrap_or_default(),
            remote_address: remote.map(|addr| addr.ip().to_string()),
            remote_port: remote.map(|addr| addr.port()),
            body: extensions.get::<ParsedBody>().map(|ParsedBody(body)| body.clone()),
            id: extensions.get::<RequestId>().map(|id| id.as_str().to_owned()),
        }
    }

    pub fn method(&self) -> &str { &self.method }
    pub fn url(&self) -> &str { &self.url }
    pub fn headers(&self) -> &BTreeMap<String, String> { &self.headers }
    pub fn query(&self) -> &BTreeMap<String, Value> { &self.query }
    pub fn body(&self) -> Option<&Value> { self.body.as_ref() }
    pub fn remote_address(&self) -> Option<&str> { self.remote_address.as_deref() }
    pub fn remote_port(&self) -> Option<u16> { self.remote_port }

    /// The correlation identifier, if it was resolved before the capture.
    pub fn id(&self) -> Option<&str> { self.id.as_deref() }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// The standard, unredacted request record.
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

/// Flattens a [`HeaderMap`] into `name -> value`.
///
/// Names come out lower-case (that is how `http` stores them). Repeated
/// headers are joined with `", "`; non-UTF-8 bytes are replaced.
pub(crate) fn header_map(headers: &HeaderMap) -> BTreeMap<String, String> {
    let mut map: BTreeMap<String, String> = BTreeMap::new();
    for (name, value) in headers {
        let value = String::from_utf8_lossy(value.as_bytes());
        map.entry(name.as_str().to_owned())
            .and_modify(|joined| {
                joined.push_str(", ");
                joined.push_str(&value);
            })
            .or_insert_with(|| value.into_owned());
    }
    map
}

/// Decodes a query string. A key that appears more than once maps to an array.
fn query_map(query: &str) -> BTreeMap<String, Value> {
    let mut map: BTreeMap<String, Value> = BTreeMap::new();
    for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
        let value = Value::String(value.into_owned());
        match map.get_mut(key.as_ref()) {
            Some(Value::Array(values)) => values.push(value),
            Some(existing) => {
                let first = existing.take();
                *existing = Value::Array(vec![first, value]);
            }
            None => {
                map.insert(key.into_owned(), value);
            }
        }
    }
    map
}
