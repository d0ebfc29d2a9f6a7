//! Loggable view of an outgoing response.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

use crate::request::header_map;

/// Status and headers of a response, as the request log records them.
///
/// Before the inner service has produced a response (the `verbose` start
/// event, or a request abandoned mid-flight) the snapshot is *pending*: no
/// status yet, and only the headers the middleware itself has decided on.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseSnapshot {
    #[serde(skip_serializing_if = "Option::is_none")]
    status_code: Option<u16>,
    headers: BTreeMap<String, String>,
}

impl ResponseSnapshot {
    pub fn capture<B>(res: &http::Response<B>) -> Self {
        Self {
            status_code: Some(res.status().as_u16()),
            headers: header_map(res.headers()),
        }
    }

    pub(crate) fn pending(header: &str, id: &str) -> Self {
        Self {
            status_code: None,
            headers: BTreeMap::from([(header.to_owned(), id.to_owned())]),
        }
    }

    pub fn status_code(&self) -> Option<u16> { self.status_code }
    pub fn headers(&self) -> &BTreeMap<String, String> { &self.headers }

    /// The standard response record.
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn captures_status_and_headers() {
        let res = http::Response::builder()
            .status(201)
            .header("Location", "/users/42")
            .body(())
            .unwrap();

        let value = ResponseSnapshot::capture(&res).to_value();

        assert_eq!(value, json!({ "statusCode": 201, "headers": { "location": "/users/42" } }));
    }

    #[test]
    fn pending_snapshot_has_no_status() {
        let value = ResponseSnapshot::pending("x-request-id", "abc").to_value();

        assert_eq!(value, json!({ "headers": { "x-request-id": "abc" } }));
    }
}
