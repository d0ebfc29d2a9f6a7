//! The redacting request serializer.
//!
//! Builds the `req` record (through the parent serializer when one was
//! registered on the base logger, the standard one otherwise) and then
//! replaces configured header and body fields with [`PLACEHOLDER`].
//!
//! Only top-level keys of `headers` and `body` are considered. Header names
//! match case-insensitively; body field names match exactly. A record without
//! a `headers` or `body` object is returned as is.

use std::sync::Arc;

use serde_json::{Map, Value};

use crate::logger::ReqSerializer;
use crate::request::RequestSnapshot;

/// Replacement value for redacted fields.
pub const PLACEHOLDER: &str = "FILTERED";

pub(crate) struct Redactor {
    parent: Option<ReqSerializer>,
    headers: Vec<String>,
    body: Vec<String>,
}

impl Redactor {
    /// `headers` must already be lower-case.
    pub(crate) fn new(parent: Option<ReqSerializer>, headers: Vec<String>, body: Vec<String>) -> Self {
        Self { parent, headers, body }
    }

    pub(crate) fn serialize(&self, req: &RequestSnapshot) -> Value {
        let mut record = match &self.parent {
            Some(parent) => parent(req),
            None => req.to_value(),
        };

        if let Value::Object(fields) = &mut record {
            self.obscure_fields(fields);
        }
        record
    }

    fn obscure_fields(&self, fields: &mut Map<String, Value>) {
        if !self.headers.is_empty() {
            if let Some(Value::Object(headers)) = fields.get_mut("headers") {
                *headers = obscure(headers, |name| {
                    self.headers.iter().any(|hidden| hidden.eq_ignore_ascii_case(name))
                });
            }
        }

        if !self.body.is_empty() {
            if let Some(Value::Object(body)) = fields.get_mut("body") {
                *body = obscure(body, |name| self.body.iter().any(|hidden| hidden == name));
            }
        }
    }

    pub(crate) fn into_serializer(self) -> ReqSerializer {
        Arc::new(move |req: &RequestSnapshot| self.serialize(req))
    }
}

fn obscure(fields: &Map<String, Value>, hidden: impl Fn(&str) -> bool) -> Map<String, Value> {
    fields.iter()
        .map(|(name, value)| {
            let value = if hidden(name) { Value::from(PLACEHOLDER) } else { value.clone() };
            (name.clone(), value)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::request::ParsedBody;

    fn snapshot(body: Option<Value>) -> RequestSnapshot {
        let mut req = http::Request::post("/login")
            .header("Authorization", "secret")
            .header("accept", "*/*")
            .body(())
            .unwrap();
        if let Some(body) = body {
            req.extensions_mut().insert(ParsedBody(body));
        }
        RequestSnapshot::capture(&req)
    }

    fn default_redactor() -> Redactor {
        Redactor::new(None, Vec::new(), vec!["password".into()])
    }

    #[test]
    fn redacts_configured_headers() {
        let redactor = Redactor::new(None, vec!["authorization".into()], Vec::new());
        let snap = snapshot(None);

        let record = redactor.serialize(&snap);

        assert_eq!(record["headers"]["authorization"], json!(PLACEHOLDER));
        assert_eq!(record["headers"]["accept"], json!("*/*"));
        assert_eq!(redactor.serialize(&snap), record);
        assert_eq!(snap.header("authorization"), Some("secret"));
    }

    #[test]
    fn headers_pass_through_when_not_configured() {
        let record = default_redactor().serialize(&snapshot(None));

        assert_eq!(record["headers"]["authorization"], json!("secret"));
    }

    #[test]
    fn redacts_password_by_default() {
        let record = default_redactor()
            .serialize(&snapshot(Some(json!({ "password": "x", "username": "y" }))));

        assert_eq!(record["body"], json!({ "password": "FILTERED", "username": "y" }));
    }

    #[test]
    fn body_redaction_is_shallow_and_exact() {
        let body = json!({ "user": { "password": "x" }, "Password": "y" });

        let record = default_redactor().serialize(&snapshot(Some(body.clone())));

        assert_eq!(record["body"], body);
    }

    #[test]
    fn missing_body_stays_missing() {
        let record = default_redactor().serialize(&snapshot(None));

        assert!(record.get("body").is_none());
    }

    #[test]
    fn parent_serializer_output_is_redacted() {
        let parent: ReqSerializer = Arc::new(|req: &RequestSnapshot| {
            json!({ "path": req.url(), "headers": { "Authorization": "secret", "x-trace": "t" } })
        });
        let redactor = Redactor::new(Some(parent), vec!["authorization".into()], Vec::new());

        let record = redactor.serialize(&snapshot(None));

        assert_eq!(
            record,
            json!({ "path": "/login", "headers": { "Authorization": "FILTERED", "x-trace": "t" } }),
        );
    }
}
