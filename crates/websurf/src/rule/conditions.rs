//! Predicate factories and AND-composition.
//!
//! Each factory captures its parameters in a closure; absence of expected
//! data (a missing header, an empty value list) is modeled as a non-match,
//! never as an error.

use super::{RequestPredicate, ResponsePredicate};
use http::header::HeaderName;
use http::{HeaderMap, Method, StatusCode};
use regex::Regex;

pub(crate) fn constant_true_request() -> RequestPredicate {
    Box::new(|_| true)
}

pub(crate) fn constant_true_response() -> ResponsePredicate {
    Box::new(|_| true)
}

/// Narrow `first` with `second`: both must hold.
pub(crate) fn and_request(first: RequestPredicate, second: RequestPredicate) -> RequestPredicate {
    Box::new(move |request| first(request) && second(request))
}

pub(crate) fn and_response(
    first: ResponsePredicate,
    second: ResponsePredicate,
) -> ResponsePredicate {
    Box::new(move |response| first(response) && second(response))
}

pub(crate) fn method_is(method: Method) -> RequestPredicate {
    Box::new(move |request| request.method == method)
}

/// Contains-semantics URL match: the pattern may hit anywhere in the URL.
pub(crate) fn url_matches(pattern: Regex) -> RequestPredicate {
    Box::new(move |request| pattern.is_match(&request.url))
}

pub(crate) fn request_has_header(name: HeaderName) -> RequestPredicate {
    Box::new(move |request| request.headers.contains_key(&name))
}

pub(crate) fn request_has_no_header(name: HeaderName) -> RequestPredicate {
    Box::new(move |request| !request.headers.contains_key(&name))
}

pub(crate) fn request_has_header_with_value(name: HeaderName, value: &str) -> RequestPredicate {
    let needle = value.to_uppercase();
    Box::new(move |request| any_value_contains(&request.headers, &name, &needle))
}

pub(crate) fn response_has_header(name: HeaderName) -> ResponsePredicate {
    Box::new(move |response| response.headers.contains_key(&name))
}

pub(crate) fn response_has_no_header(name: HeaderName) -> ResponsePredicate {
    Box::new(move |response| !response.headers.contains_key(&name))
}

pub(crate) fn response_has_header_with_value(name: HeaderName, value: &str) -> ResponsePredicate {
    let needle = value.to_uppercase();
    Box::new(move |response| any_value_contains(&response.headers, &name, &needle))
}

pub(crate) fn has_status(status: StatusCode) -> ResponsePredicate {
    Box::new(move |response| response.status == status)
}

/// Case-insensitive substring containment over all of a header's values.
/// A header with no values never matches.
fn any_value_contains(headers: &HeaderMap, name: &HeaderName, needle_upper: &str) -> bool {
    headers.get_all(name).iter().any(|value| {
        value
            .to_str()
            .map(|text| text.to_uppercase().contains(needle_upper))
            .unwrap_or(false)
    })
}
