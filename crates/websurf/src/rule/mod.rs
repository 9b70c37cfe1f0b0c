//! Rule entity and the condition/action combinators.
//!
//! A [`SurfRule`] pairs match conditions with mutating actions for the
//! request and/or response phase. Conditions are pure boolean tests;
//! actions mutate the message in place. Conditions compose only by
//! logical AND (repeated narrowing), actions only by sequential
//! application in call order.
//!
//! ## Module Structure
//!
//! - `conditions`: predicate factories and AND-composition
//! - `actions`: transform factories, THEN-composition, and the markup
//!   actions with their lazy document materialization

pub(crate) mod actions;
pub(crate) mod conditions;

use crate::message::{Request, Response};
use std::fmt;

/// A pure boolean test over an outbound request.
pub type RequestPredicate = Box<dyn Fn(&Request) -> bool + Send + Sync>;
/// An in-place mutation of an outbound request.
pub type RequestTransform = Box<dyn Fn(&mut Request) + Send + Sync>;
/// A pure boolean test over an inbound response.
pub type ResponsePredicate = Box<dyn Fn(&Response) -> bool + Send + Sync>;
/// An in-place mutation of an inbound response.
pub type ResponseTransform = Box<dyn Fn(&mut Response) + Send + Sync>;

/// A named pairing of match conditions and mutating actions.
///
/// Rules are created by the builder at flush time and immutable
/// thereafter. Both conditions default to constant-true, so a rule built
/// from only response-side calls still survives request-phase matching
/// (and vice versa). A rule always carries at least one action; the
/// builder never emits one without.
pub struct SurfRule {
    pub(crate) name: String,
    pub(crate) request_condition: RequestPredicate,
    pub(crate) request_action: Option<RequestTransform>,
    pub(crate) response_condition: ResponsePredicate,
    pub(crate) response_action: Option<ResponseTransform>,
}

impl SurfRule {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn has_request_action(&self) -> bool {
        self.request_action.is_some()
    }

    pub fn has_response_action(&self) -> bool {
        self.response_action.is_some()
    }

    pub(crate) fn matches_request(&self, request: &Request) -> bool {
        (self.request_condition)(request)
    }

    pub(crate) fn matches_response(&self, response: &Response) -> bool {
        (self.response_condition)(response)
    }
}

impl fmt::Debug for SurfRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SurfRule")
            .field("name", &self.name)
            .field("request_action", &self.request_action.is_some())
            .field("response_action", &self.response_action.is_some())
            .finish()
    }
}
