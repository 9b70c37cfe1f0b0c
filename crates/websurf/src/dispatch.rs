//! Dispatcher contract and the reqwest-backed implementation.
//!
//! The dispatcher is the engine's only external interaction: it takes the
//! (possibly rewritten) request and performs the actual exchange. Failures
//! are fatal to the `surf` call and propagate to the caller unchanged;
//! timeouts, retries, and TLS policy all live behind this trait, not in
//! the engine.

use crate::error::DispatchError;
use crate::message::{RawResponse, Request, Response};
use tracing::{info, trace};

/// Performs the actual network exchange for the engine.
///
/// Implementations must hand back a [`Response`] whose `status` and
/// `headers` are fresh mutable copies (the engine mutates them without
/// affecting the wrapped upstream result) and should leave the payload
/// representations unset unless they have reason to pre-populate them.
#[cfg_attr(test, mockall::automock)]
pub trait Dispatcher: Send + Sync {
    fn dispatch(&self, request: &Request) -> Result<Response, DispatchError>;
}

/// Any matching closure is a dispatcher, which keeps test doubles and
/// one-off adapters cheap.
impl<F> Dispatcher for F
where
    F: Fn(&Request) -> Result<Response, DispatchError> + Send + Sync,
{
    fn dispatch(&self, request: &Request) -> Result<Response, DispatchError> {
        self(request)
    }
}

/// The provided transport: a blocking `reqwest` client.
pub struct ReqwestDispatcher {
    client: reqwest::blocking::Client,
}

impl ReqwestDispatcher {
    pub fn new() -> ReqwestDispatcher {
        ReqwestDispatcher {
            client: reqwest::blocking::Client::new(),
        }
    }

    /// Use a preconfigured client (pooling, timeouts, proxies).
    pub fn with_client(client: reqwest::blocking::Client) -> ReqwestDispatcher {
        ReqwestDispatcher { client }
    }
}

impl Default for ReqwestDispatcher {
    fn default() -> Self {
        ReqwestDispatcher::new()
    }
}

impl Dispatcher for ReqwestDispatcher {
    fn dispatch(&self, request: &Request) -> Result<Response, DispatchError> {
        info!("forwarding {} request to {}", request.method, request.url);

        let mut outbound = self
            .client
            .request(request.method.clone(), &request.url)
            .headers(request.headers.clone());
        if let Some(body) = &request.body {
            outbound = outbound.body(body.clone());
        }

        let result = outbound.send().map_err(DispatchError::new)?;
        let status = result.status();
        let headers = result.headers().clone();
        let text = result.text().map_err(DispatchError::new)?;

        info!("got response {}", status);
        trace!("response body is {}", text);

        Ok(Response::from_upstream(RawResponse {
            status,
            headers,
            body: if text.is_empty() { None } else { Some(text) },
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::{Method, StatusCode};

    #[test]
    fn test_closure_dispatcher() {
        let dispatcher = |request: &Request| {
            assert_eq!(request.method, Method::GET);
            Ok(Response::with_status(StatusCode::NO_CONTENT))
        };

        let response = dispatcher
            .dispatch(&Request::new(Method::GET, "http://localhost/"))
            .unwrap();
        assert_eq!(response.status, StatusCode::NO_CONTENT);
    }

    #[test]
    fn test_mock_dispatcher_propagates_error() {
        let mut mock = MockDispatcher::new();
        mock.expect_dispatch()
            .returning(|_| Err(DispatchError::from(anyhow::anyhow!("connection reset"))));

        let result = mock.dispatch(&Request::new(Method::GET, "http://localhost/"));
        assert!(result.unwrap_err().to_string().contains("connection reset"));
    }
}
