//! The fluent rule builder: an accumulate/flush state machine.
//!
//! A [`Configurator`] lets one chain of calls describe many rules without
//! explicit terminators. It keeps a single in-progress rule as accumulator
//! state:
//!
//! - **Condition calls** (`get`, `has_status`, `request_has_header`, ...)
//!   first *flush*: if the accumulator already holds at least one action,
//!   it is finalized into a [`SurfRule`], appended to the output set, and
//!   the accumulator resets. The new condition then AND-narrows the
//!   relevant (request or response) condition.
//! - **Action calls** (`set_request_header`, `change_html_element`, ...)
//!   never flush; they extend the relevant pending action by sequential
//!   composition, preserving call order.
//! - [`rule_name`](Configurator::rule_name) flushes pending state, then
//!   stores the name for the rule produced by the *next* flush.
//! - [`build`](Configurator::build) performs one final flush (a no-op when
//!   nothing is pending) and returns the engine.
//!
//! A condition narrowed without any following action is discarded at the
//! next flush boundary; an action-less rule is never emitted. Both
//! conditions default to constant-true, so a chain that only names
//! response-side conditions still produces a rule that survives
//! request-phase matching.
//!
//! Argument validation happens eagerly inside the call that receives the
//! value; the first offending call poisons the builder and
//! [`build`](Configurator::build) returns its error, so an invalid chain
//! can never produce an engine (the same error-carrying shape as
//! `http::request::Builder`).

use crate::dispatch::Dispatcher;
use crate::document::Element;
use crate::error::ConfigError;
use crate::message::{Request, Response};
use crate::rule::{actions, conditions};
use crate::rule::{
    RequestPredicate, RequestTransform, ResponsePredicate, ResponseTransform, SurfRule,
};
use crate::surfer::WebSurfer;
use http::header::{HeaderName, HeaderValue};
use http::Method;
use regex::Regex;
use std::str::FromStr;
use tracing::debug;

const DEFAULT_RULE_NAME: &str = "unnamed";

/// Fluent builder producing a [`WebSurfer`] from chained condition and
/// action calls. Obtained from [`WebSurfer::configure`].
pub struct Configurator<D> {
    dispatcher: D,
    rules: Vec<SurfRule>,
    error: Option<ConfigError>,
    rule_name: Option<String>,
    request_condition: RequestPredicate,
    request_action: Option<RequestTransform>,
    response_condition: ResponsePredicate,
    response_action: Option<ResponseTransform>,
}

impl<D: Dispatcher> Configurator<D> {
    pub(crate) fn new(dispatcher: D) -> Configurator<D> {
        Configurator {
            dispatcher,
            rules: Vec::new(),
            error: None,
            rule_name: None,
            request_condition: conditions::constant_true_request(),
            request_action: None,
            response_condition: conditions::constant_true_response(),
            response_action: None,
        }
    }

    // ===== Request conditions =====

    /// Match GET requests whose URL contains `url_pattern` (regex).
    pub fn get(mut self, url_pattern: &str) -> Self {
        self.flush();
        if let Some(pattern) = self.url_pattern("get", url_pattern) {
            self.narrow_request(conditions::method_is(Method::GET));
            self.narrow_request(conditions::url_matches(pattern));
        }
        self
    }

    /// Match POST requests whose URL contains `url_pattern` (regex).
    pub fn post(mut self, url_pattern: &str) -> Self {
        self.flush();
        if let Some(pattern) = self.url_pattern("post", url_pattern) {
            self.narrow_request(conditions::method_is(Method::POST));
            self.narrow_request(conditions::url_matches(pattern));
        }
        self
    }

    /// Match PUT requests whose URL contains `url_pattern` (regex).
    pub fn put(mut self, url_pattern: &str) -> Self {
        self.flush();
        if let Some(pattern) = self.url_pattern("put", url_pattern) {
            self.narrow_request(conditions::method_is(Method::PUT));
            self.narrow_request(conditions::url_matches(pattern));
        }
        self
    }

    /// Match DELETE requests whose URL contains `url_pattern` (regex).
    pub fn delete(mut self, url_pattern: &str) -> Self {
        self.flush();
        if let Some(pattern) = self.url_pattern("delete", url_pattern) {
            self.narrow_request(conditions::method_is(Method::DELETE));
            self.narrow_request(conditions::url_matches(pattern));
        }
        self
    }

    /// Match requests with the given method, regardless of URL.
    pub fn method(mut self, method: Method) -> Self {
        self.flush();
        self.narrow_request(conditions::method_is(method));
        self
    }

    /// Match requests whose URL contains `url_pattern` (regex).
    pub fn url_matches(mut self, url_pattern: &str) -> Self {
        self.flush();
        if let Some(pattern) = self.url_pattern("url_matches", url_pattern) {
            self.narrow_request(conditions::url_matches(pattern));
        }
        self
    }

    pub fn request_has_header(mut self, name: &str) -> Self {
        self.flush();
        if let Some(name) = self.header_name("request_has_header", name) {
            self.narrow_request(conditions::request_has_header(name));
        }
        self
    }

    pub fn request_has_no_header(mut self, name: &str) -> Self {
        self.flush();
        if let Some(name) = self.header_name("request_has_no_header", name) {
            self.narrow_request(conditions::request_has_no_header(name));
        }
        self
    }

    /// Match requests where any value of the header contains `value`,
    /// case-insensitively.
    pub fn request_has_header_with_value(mut self, name: &str, value: &str) -> Self {
        self.flush();
        if let Some(name) = self.header_name("request_has_header_with_value", name) {
            self.narrow_request(conditions::request_has_header_with_value(name, value));
        }
        self
    }

    /// Match every request, discarding any request-side narrowing in the
    /// current segment.
    pub fn any_request(mut self) -> Self {
        self.flush();
        self.request_condition = conditions::constant_true_request();
        self
    }

    // ===== Request actions =====

    /// Set a request header, replacing existing values.
    pub fn set_request_header(mut self, name: &str, value: &str) -> Self {
        let name = self.header_name("set_request_header", name);
        let value = self.header_value("set_request_header", value);
        if let (Some(name), Some(value)) = (name, value) {
            self.extend_request_action(actions::set_request_header(name, value));
        }
        self
    }

    pub fn remove_request_header(mut self, name: &str) -> Self {
        if let Some(name) = self.header_name("remove_request_header", name) {
            self.extend_request_action(actions::remove_request_header(name));
        }
        self
    }

    /// Rewrite the request URL to a fixed value.
    pub fn change_url(mut self, new_url: &str) -> Self {
        self.extend_request_action(actions::change_url(new_url.to_string()));
        self
    }

    /// Rewrite the request URL from a value computed against the live
    /// request (which already carries earlier actions' mutations).
    pub fn change_url_with<F>(mut self, evaluator: F) -> Self
    where
        F: Fn(&Request) -> String + Send + Sync + 'static,
    {
        self.extend_request_action(actions::change_url_with(evaluator));
        self
    }

    /// Arbitrary in-place request mutation.
    pub fn transform_request<F>(mut self, transform: F) -> Self
    where
        F: Fn(&mut Request) + Send + Sync + 'static,
    {
        self.extend_request_action(Box::new(transform));
        self
    }

    /// Arbitrary fallible request mutation; a failure skips this one
    /// action with a warning.
    pub fn try_transform_request<F>(mut self, transform: F) -> Self
    where
        F: Fn(&mut Request) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.extend_request_action(actions::try_transform_request(transform));
        self
    }

    // ===== Response conditions =====

    /// Match every response, discarding any response-side narrowing in the
    /// current segment.
    pub fn any_response(mut self) -> Self {
        self.flush();
        self.response_condition = conditions::constant_true_response();
        self
    }

    pub fn response_has_header(mut self, name: &str) -> Self {
        self.flush();
        if let Some(name) = self.header_name("response_has_header", name) {
            self.narrow_response(conditions::response_has_header(name));
        }
        self
    }

    pub fn response_has_no_header(mut self, name: &str) -> Self {
        self.flush();
        if let Some(name) = self.header_name("response_has_no_header", name) {
            self.narrow_response(conditions::response_has_no_header(name));
        }
        self
    }

    /// Match responses where any value of the header contains `value`,
    /// case-insensitively.
    pub fn response_has_header_with_value(mut self, name: &str, value: &str) -> Self {
        self.flush();
        if let Some(name) = self.header_name("response_has_header_with_value", name) {
            self.narrow_response(conditions::response_has_header_with_value(name, value));
        }
        self
    }

    /// Match responses with the given status code.
    pub fn has_status(mut self, status: u16) -> Self {
        self.flush();
        match http::StatusCode::from_u16(status) {
            Ok(status) => self.narrow_response(conditions::has_status(status)),
            Err(_) => self.record_error(ConfigError::InvalidStatusCode { code: status }),
        }
        self
    }

    // ===== Response actions =====

    /// Set a response header, replacing existing values.
    pub fn set_response_header(mut self, name: &str, value: &str) -> Self {
        let name = self.header_name("set_response_header", name);
        let value = self.header_value("set_response_header", value);
        if let (Some(name), Some(value)) = (name, value) {
            self.extend_response_action(actions::set_response_header(name, value));
        }
        self
    }

    /// Set a response header from a value computed against the live
    /// response.
    pub fn set_response_header_with<F>(mut self, name: &str, evaluator: F) -> Self
    where
        F: Fn(&Response) -> String + Send + Sync + 'static,
    {
        if let Some(name) = self.header_name("set_response_header_with", name) {
            self.extend_response_action(actions::set_response_header_with(name, evaluator));
        }
        self
    }

    pub fn remove_response_header(mut self, name: &str) -> Self {
        if let Some(name) = self.header_name("remove_response_header", name) {
            self.extend_response_action(actions::remove_response_header(name));
        }
        self
    }

    /// Arbitrary in-place response mutation.
    pub fn transform_response<F>(mut self, transform: F) -> Self
    where
        F: Fn(&mut Response) + Send + Sync + 'static,
    {
        self.extend_response_action(Box::new(transform));
        self
    }

    /// Arbitrary fallible response mutation; a failure skips this one
    /// action with a warning.
    pub fn try_transform_response<F>(mut self, transform: F) -> Self
    where
        F: Fn(&mut Response) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.extend_response_action(actions::try_transform_response(transform));
        self
    }

    /// Mutate the first element with the given tag name passing `filter`.
    /// Operates on the lazily parsed document shared by all markup actions
    /// of the pipeline run.
    pub fn change_html_element<F, A>(mut self, tag: &str, filter: F, action: A) -> Self
    where
        F: Fn(&Element) -> bool + Send + Sync + 'static,
        A: Fn(&Element) + Send + Sync + 'static,
    {
        if let Some(tag) = self.tag_name("change_html_element", tag) {
            self.extend_response_action(actions::change_html_element(
                tag,
                Box::new(filter),
                Box::new(action),
            ));
        }
        self
    }

    /// Mutate every element with the given tag name passing `filter`.
    pub fn change_all_html_elements<F, A>(mut self, tag: &str, filter: F, action: A) -> Self
    where
        F: Fn(&Element) -> bool + Send + Sync + 'static,
        A: Fn(&Element) + Send + Sync + 'static,
    {
        if let Some(tag) = self.tag_name("change_all_html_elements", tag) {
            self.extend_response_action(actions::change_all_html_elements(
                tag,
                Box::new(filter),
                Box::new(action),
            ));
        }
        self
    }

    /// Append a new element with the supplier's inner HTML to the document
    /// body. A supplier failure skips the action with a warning.
    pub fn append_html_element_to_body<S>(mut self, tag: &str, supplier: S) -> Self
    where
        S: Fn() -> anyhow::Result<String> + Send + Sync + 'static,
    {
        if let Some(tag) = self.tag_name("append_html_element_to_body", tag) {
            self.extend_response_action(actions::append_html_element_to_body(
                tag,
                Box::new(supplier),
            ));
        }
        self
    }

    // ===== Rule boundaries =====

    /// Flush any pending rule, then name the rule produced by the next
    /// flush.
    pub fn rule_name(mut self, name: &str) -> Self {
        self.flush();
        self.rule_name = Some(name.to_string());
        self
    }

    /// Final flush, then hand the accumulated rule set to the engine.
    ///
    /// Returns the first configuration error recorded anywhere in the
    /// chain; no engine is produced from a chain that saw one.
    pub fn build(mut self) -> Result<WebSurfer<D>, ConfigError> {
        self.flush();
        if let Some(error) = self.error.take() {
            return Err(error);
        }
        Ok(WebSurfer::new(self.dispatcher, self.rules))
    }

    // ===== Accumulator internals =====

    /// Finalize the in-progress rule if it holds at least one action, and
    /// reset the accumulator. A segment without actions is discarded
    /// wholesale: narrowed conditions do not leak into the next rule.
    fn flush(&mut self) {
        if self.request_action.is_none() && self.response_action.is_none() {
            return;
        }
        let rule = SurfRule {
            name: self
                .rule_name
                .take()
                .unwrap_or_else(|| DEFAULT_RULE_NAME.to_string()),
            request_condition: std::mem::replace(
                &mut self.request_condition,
                conditions::constant_true_request(),
            ),
            request_action: self.request_action.take(),
            response_condition: std::mem::replace(
                &mut self.response_condition,
                conditions::constant_true_response(),
            ),
            response_action: self.response_action.take(),
        };
        debug!("rule {:?} finalized", rule.name());
        self.rules.push(rule);
    }

    fn narrow_request(&mut self, predicate: RequestPredicate) {
        let current = std::mem::replace(
            &mut self.request_condition,
            conditions::constant_true_request(),
        );
        self.request_condition = conditions::and_request(current, predicate);
    }

    fn narrow_response(&mut self, predicate: ResponsePredicate) {
        let current = std::mem::replace(
            &mut self.response_condition,
            conditions::constant_true_response(),
        );
        self.response_condition = conditions::and_response(current, predicate);
    }

    fn extend_request_action(&mut self, action: RequestTransform) {
        self.request_action = Some(match self.request_action.take() {
            Some(existing) => actions::then_request(existing, action),
            None => action,
        });
    }

    fn extend_response_action(&mut self, action: ResponseTransform) {
        self.response_action = Some(match self.response_action.take() {
            Some(existing) => actions::then_response(existing, action),
            None => action,
        });
    }

    // ===== Validation =====

    fn record_error(&mut self, error: ConfigError) {
        if self.error.is_none() {
            self.error = Some(error);
        }
    }

    fn header_name(&mut self, call: &'static str, name: &str) -> Option<HeaderName> {
        match HeaderName::from_str(name) {
            Ok(name) => Some(name),
            Err(_) => {
                self.record_error(ConfigError::InvalidHeaderName {
                    call,
                    name: name.to_string(),
                });
                None
            }
        }
    }

    fn header_value(&mut self, call: &'static str, value: &str) -> Option<HeaderValue> {
        match HeaderValue::from_str(value) {
            Ok(value) => Some(value),
            Err(_) => {
                self.record_error(ConfigError::InvalidHeaderValue {
                    call,
                    value: value.to_string(),
                });
                None
            }
        }
    }

    fn url_pattern(&mut self, call: &'static str, pattern: &str) -> Option<Regex> {
        if pattern.is_empty() {
            self.record_error(ConfigError::EmptyArgument {
                call,
                what: "URL pattern",
            });
            return None;
        }
        match Regex::new(pattern) {
            Ok(pattern) => Some(pattern),
            Err(source) => {
                self.record_error(ConfigError::InvalidUrlPattern {
                    pattern: pattern.to_string(),
                    source: Box::new(source),
                });
                None
            }
        }
    }

    fn tag_name(&mut self, call: &'static str, tag: &str) -> Option<String> {
        let tag = tag.trim().to_ascii_lowercase();
        if tag.is_empty() {
            self.record_error(ConfigError::EmptyArgument {
                call,
                what: "tag name",
            });
            return None;
        }
        Some(tag)
    }
}
