//! The evaluation engine: two-phase matching and transformation.
//!
//! `surf` runs the full pipeline for one request:
//!
//! 1. filter the rule set by request condition, preserving order
//! 2. apply the matched rules' request actions to the one shared request
//! 3. dispatch
//! 4. filter the *request-matched* rules by response condition — a rule
//!    whose request condition failed can never fire a response action
//! 5. apply the matched rules' response actions
//!
//! Given the same rule set, request, and dispatcher behavior the applied
//! actions and their order are fully determined.

use crate::builder::Configurator;
use crate::dispatch::Dispatcher;
use crate::error::DispatchError;
use crate::message::{Request, Response};
use crate::rule::SurfRule;
use tracing::{debug, info};

/// The configured engine: an immutable rule set plus a dispatcher.
///
/// Holds no other state across calls, so one engine can serve concurrent
/// `surf` calls from multiple threads as long as the dispatcher is
/// reentrant.
pub struct WebSurfer<D> {
    dispatcher: D,
    rules: Vec<SurfRule>,
}

impl<D: Dispatcher> WebSurfer<D> {
    /// Start a rule-building chain around the given dispatcher.
    pub fn configure(dispatcher: D) -> Configurator<D> {
        Configurator::new(dispatcher)
    }

    pub(crate) fn new(dispatcher: D, rules: Vec<SurfRule>) -> WebSurfer<D> {
        WebSurfer { dispatcher, rules }
    }

    /// The finalized rule set, in evaluation order.
    pub fn rules(&self) -> &[SurfRule] {
        &self.rules
    }

    /// Run one request through the pipeline.
    ///
    /// Dispatcher failures are not caught here; they propagate unchanged.
    pub fn surf(&self, mut request: Request) -> Result<Response, DispatchError> {
        let request_matched: Vec<&SurfRule> = self
            .rules
            .iter()
            .filter(|rule| {
                let passed = rule.matches_request(&request);
                debug!("request testing rule {:?}... passed: {}", rule.name(), passed);
                passed
            })
            .collect();

        for rule in &request_matched {
            if let Some(action) = &rule.request_action {
                info!("rule {:?}: applying request transformations", rule.name());
                action(&mut request);
            }
        }

        let mut response = self.dispatcher.dispatch(&request)?;

        // response-side evaluators and lazy parsing need the request the
        // exchange was actually made with
        if response.original_request.is_none() {
            response.original_request = Some(request);
        }

        let response_matched: Vec<&SurfRule> = request_matched
            .into_iter()
            .filter(|rule| {
                let passed = rule.matches_response(&response);
                debug!("response testing rule {:?}... passed: {}", rule.name(), passed);
                passed
            })
            .collect();

        for rule in response_matched {
            if let Some(action) = &rule.response_action {
                info!("rule {:?}: applying response transformations", rule.name());
                action(&mut response);
            }
        }

        Ok(response)
    }
}
