//! Error types for configuration and dispatch.
//!
//! Configuration errors fail fast: they are detected inside the builder
//! call that received the bad value and surfaced by `build()`, so an
//! invalid chain can never produce a running engine. Dispatch errors are
//! fatal to a single `surf` call and propagate to the caller unchanged.
//! Per-action failures during response mutation are deliberately *not*
//! errors; they are logged and the pipeline continues.

/// A configuration value rejected at rule-building time.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{call} requires a non-empty {what}")]
    EmptyArgument {
        call: &'static str,
        what: &'static str,
    },
    #[error("invalid header name {name:?} passed to {call}")]
    InvalidHeaderName { call: &'static str, name: String },
    #[error("invalid header value {value:?} passed to {call}")]
    InvalidHeaderValue { call: &'static str, value: String },
    #[error("invalid URL pattern {pattern:?}: {source}")]
    InvalidUrlPattern {
        pattern: String,
        #[source]
        source: Box<regex::Error>,
    },
    #[error("{code} is not a valid HTTP status code")]
    InvalidStatusCode { code: u16 },
}

/// A transport failure reported by a [`Dispatcher`](crate::Dispatcher).
///
/// The engine never catches these; they abort the `surf` call.
#[derive(Debug, thiserror::Error)]
#[error("dispatch failed: {inner}")]
pub struct DispatchError {
    inner: anyhow::Error,
}

impl DispatchError {
    /// Wrap an arbitrary transport error.
    pub fn new<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        DispatchError {
            inner: anyhow::Error::new(error),
        }
    }

    /// The wrapped transport error.
    pub fn inner(&self) -> &anyhow::Error {
        &self.inner
    }
}

impl From<anyhow::Error> for DispatchError {
    fn from(inner: anyhow::Error) -> Self {
        DispatchError { inner }
    }
}
