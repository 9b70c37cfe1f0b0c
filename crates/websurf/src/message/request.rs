//! The outbound HTTP request as seen by surf rules.

use http::header::{HeaderName, HeaderValue};
use http::{HeaderMap, Method};

/// An outbound request.
///
/// The header map is always present; a request built without headers
/// carries an empty, mutable map. Rules mutate the request in place
/// before it is handed to the dispatcher.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Request {
    pub method: Method,
    pub url: String,
    pub headers: HeaderMap,
    pub body: Option<String>,
}

impl Request {
    pub fn new(method: Method, url: impl Into<String>) -> Request {
        Request {
            method,
            url: url.into(),
            headers: HeaderMap::new(),
            body: None,
        }
    }

    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Request {
        self.headers.append(name, value);
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Request {
        self.body = Some(body.into());
        self
    }

    /// Case-insensitive single-header lookup, `None` when absent or not
    /// valid UTF-8.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }
}
