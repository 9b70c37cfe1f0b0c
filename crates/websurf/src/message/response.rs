//! The inbound HTTP response, its payload representations, and the lazy
//! document cache used by markup actions.

use crate::document::Document;
use crate::message::Request;
use http::{HeaderMap, StatusCode};
use serde_json::Value;

/// The unmodified result handed back by a dispatcher: wire status, wire
/// headers, body text. Kept on the [`Response`] for raw rendering and for
/// lazy document parsing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Option<String>,
}

/// An inbound response flowing through response-side rules.
///
/// The payload can be carried in up to three representations; exactly one
/// is authoritative at render time, in this order of precedence:
///
/// 1. `json_body` — a structured JSON payload
/// 2. `dom_body` — a parsed document, materialized lazily on first markup
///    access and shared by every markup action in the same pipeline run
/// 3. the raw text of `upstream`
///
/// `status` and `headers` are fresh mutable copies; mutating them never
/// affects the wrapped upstream result.
#[derive(Debug, Default)]
pub struct Response {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub json_body: Option<Value>,
    pub dom_body: Option<Document>,
    pub upstream: Option<RawResponse>,
    pub original_request: Option<Request>,
}

impl Response {
    /// Wrap a dispatcher result, copying status and headers into fresh
    /// mutable fields.
    pub fn from_upstream(upstream: RawResponse) -> Response {
        Response {
            status: upstream.status,
            headers: upstream.headers.clone(),
            json_body: None,
            dom_body: None,
            upstream: Some(upstream),
            original_request: None,
        }
    }

    /// A bodyless response with the given status, mostly useful in tests
    /// and simple dispatcher doubles.
    pub fn with_status(status: StatusCode) -> Response {
        Response {
            status,
            ..Response::default()
        }
    }

    /// Case-insensitive single-header lookup, `None` when absent or not
    /// valid UTF-8.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }

    /// The parsed document, parsing and caching it on first access.
    ///
    /// Returns `None` when the upstream result has no body text to parse;
    /// that absence is a no-op for callers, never an error. All markup
    /// actions in one pipeline run share the tree cached here, so their
    /// mutations accumulate.
    pub fn materialize_dom(&mut self) -> Option<&Document> {
        if self.dom_body.is_none() {
            let text = self.upstream.as_ref().and_then(|raw| raw.body.as_deref())?;
            let base_url = self
                .original_request
                .as_ref()
                .map(|request| request.url.as_str())
                .unwrap_or_default();
            self.dom_body = Some(Document::parse(text, base_url));
        }
        self.dom_body.as_ref()
    }

    /// Render the wire-ready response: the authoritative payload
    /// representation paired with the stored status code and headers.
    ///
    /// A parsed document is serialized back to text with HTML entities
    /// unescaped; with no payload representation at all the body is empty.
    pub fn render(&self) -> http::Response<String> {
        let body = if let Some(json) = &self.json_body {
            json.to_string()
        } else if let Some(dom) = &self.dom_body {
            html_escape::decode_html_entities(&dom.render()).into_owned()
        } else {
            self.upstream
                .as_ref()
                .and_then(|raw| raw.body.clone())
                .unwrap_or_default()
        };

        let mut rendered = http::Response::new(body);
        *rendered.status_mut() = self.status;
        *rendered.headers_mut() = self.headers.clone();
        rendered
    }
}
