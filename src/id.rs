//! Correlation identifier resolution.
//!
//! Resolution order, first match wins:
//!
//! 1. a value already stored in the request's [`Properties`] under the
//!    configured property name (an upstream layer assigned it),
//! 2. the inbound correlation header,
//! 3. a freshly generated identifier (UUID v4 unless overridden).
//!
//! Empty values are skipped at every step. An inbound header that is not
//! valid UTF-8 is skipped too, with a warning.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use http::{Extensions, HeaderName, HeaderValue};
use tracing::warn;

/// Produces a new identifier for requests that arrive without one.
pub type IdGenerator = Arc<dyn Fn() -> String + Send + Sync>;

/// The default generator: a random UUID in hyphenated form.
pub fn uuid_v4() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// String-keyed custom properties attached to a request or response.
///
/// Lives in the message's extensions. The middleware stores the resolved
/// identifier here under the configured property name (`reqId` by default),
/// and reads it back first when resolving.
#[derive(Clone, Debug, Default)]
pub struct Properties(HashMap<String, String>);

impl Properties {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style [`insert`](Properties::insert).
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }
}

/// The resolved correlation identifier, as a typed extension.
///
/// Present on both the request (for downstream handlers) and the response.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RequestId(String);

impl RequestId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Determines the identifier for `req` and stashes it on the request.
pub(crate) fn resolve<B>(
    req: &mut http::Request<B>,
    property: &str,
    header: &HeaderName,
    generate: &IdGenerator,
) -> String {
    let preset = req.extensions()
        .get::<Properties>()
        .and_then(|props| props.get(property))
        .filter(|id| !id.is_empty());

    let inbound = || {
        let value = req.headers().get(header)?;
        match value.to_str() {
            Ok(id) if !id.is_empty() => Some(id),
            Ok(_) => None,
            Err(_) => {
                warn!(header = %header, "inbound request id is not valid UTF-8, generating one");
                None
            }
        }
    };

    let id = match preset.or_else(inbound) {
        Some(id) => id.to_owned(),
        None => generate(),
    };

    stash(req.extensions_mut(), property, &id);
    id
}

/// Mirrors the identifier onto the response: properties, typed extension and
/// the outbound correlation header.
pub(crate) fn stamp<B>(res: &mut http::Response<B>, property: &str, header: &HeaderName, id: &str) {
    stash(res.extensions_mut(), property, id);

    match HeaderValue::from_str(id) {
        Ok(value) => {
            res.headers_mut().insert(header.clone(), value);
        }
        Err(_) => warn!(header = %header, "request id is not a valid header value, not echoed"),
    }
}

fn stash(extensions: &mut Extensions, property: &str, id: &str) {
    extensions.insert(RequestId(id.to_owned()));

    if let Some(props) = extensions.get_mut::<Properties>() {
        props.insert(property, id);
        return;
    }
    extensions.insert(Properties::new().with(property, id));
}
