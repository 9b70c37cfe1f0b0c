//! Transform factories, THEN-composition, and the markup actions.
//!
//! Actions mutate the message in place and run in registration order with
//! no isolation: a later action observes every earlier mutation. A
//! failure inside a single action (a content supplier, a computed header
//! value) is logged and that action is skipped; it never aborts the rest
//! of the pipeline.

use super::{RequestTransform, ResponseTransform};
use crate::document::Element;
use crate::message::{Request, Response};
use http::header::{HeaderName, HeaderValue};
use std::str::FromStr;
use tracing::{debug, warn};

pub(crate) type ElementFilter = Box<dyn Fn(&Element) -> bool + Send + Sync>;
pub(crate) type ElementAction = Box<dyn Fn(&Element) + Send + Sync>;
pub(crate) type HtmlSupplier = Box<dyn Fn() -> anyhow::Result<String> + Send + Sync>;

/// Run `first`, then `second`, in that order.
pub(crate) fn then_request(first: RequestTransform, second: RequestTransform) -> RequestTransform {
    Box::new(move |request| {
        first(request);
        second(request);
    })
}

pub(crate) fn then_response(
    first: ResponseTransform,
    second: ResponseTransform,
) -> ResponseTransform {
    Box::new(move |response| {
        first(response);
        second(response);
    })
}

pub(crate) fn set_request_header(name: HeaderName, value: HeaderValue) -> RequestTransform {
    Box::new(move |request| {
        request.headers.insert(name.clone(), value.clone());
    })
}

pub(crate) fn remove_request_header(name: HeaderName) -> RequestTransform {
    Box::new(move |request| {
        request.headers.remove(&name);
    })
}

pub(crate) fn change_url(new_url: String) -> RequestTransform {
    Box::new(move |request| {
        request.url = new_url.clone();
    })
}

pub(crate) fn change_url_with<F>(evaluator: F) -> RequestTransform
where
    F: Fn(&Request) -> String + Send + Sync + 'static,
{
    Box::new(move |request| {
        request.url = evaluator(request);
    })
}

pub(crate) fn set_response_header(name: HeaderName, value: HeaderValue) -> ResponseTransform {
    Box::new(move |response| {
        response.headers.insert(name.clone(), value.clone());
    })
}

/// Set a header from a value computed against the live response. An
/// uncomputable value (not a valid header value) skips this action with a
/// warning.
pub(crate) fn set_response_header_with<F>(name: HeaderName, evaluator: F) -> ResponseTransform
where
    F: Fn(&Response) -> String + Send + Sync + 'static,
{
    Box::new(move |response| {
        let value = evaluator(response);
        match HeaderValue::from_str(&value) {
            Ok(value) => {
                response.headers.insert(name.clone(), value);
            }
            Err(_) => warn!("computed value {:?} for header {} is not valid, skipping", value, name),
        }
    })
}

pub(crate) fn remove_response_header(name: HeaderName) -> ResponseTransform {
    Box::new(move |response| {
        response.headers.remove(&name);
    })
}

pub(crate) fn try_transform_request<F>(transform: F) -> RequestTransform
where
    F: Fn(&mut Request) -> anyhow::Result<()> + Send + Sync + 'static,
{
    Box::new(move |request| {
        if let Err(error) = transform(request) {
            warn!("request transformation failed, skipping: {:#}", error);
        }
    })
}

pub(crate) fn try_transform_response<F>(transform: F) -> ResponseTransform
where
    F: Fn(&mut Response) -> anyhow::Result<()> + Send + Sync + 'static,
{
    Box::new(move |response| {
        if let Err(error) = transform(response) {
            warn!("response transformation failed, skipping: {:#}", error);
        }
    })
}

/// Mutate the first element with the given tag name that passes `filter`.
///
/// More than one passing element mutates only the first (document order)
/// and warns; none at all is a silent no-op.
pub(crate) fn change_html_element(
    tag: String,
    filter: ElementFilter,
    action: ElementAction,
) -> ResponseTransform {
    Box::new(move |response| {
        let Some(dom) = materialized(response) else {
            return;
        };
        let found: Vec<Element> = dom.select(&tag).into_iter().filter(|el| filter(el)).collect();
        match found.as_slice() {
            [] => debug!("no {} elements match the filter", tag),
            [element] => action(element),
            [element, ..] => {
                warn!(
                    "found {} matching {} elements, changing only the first",
                    found.len(),
                    tag
                );
                action(element);
            }
        }
    })
}

/// Mutate every element with the given tag name that passes `filter`.
pub(crate) fn change_all_html_elements(
    tag: String,
    filter: ElementFilter,
    action: ElementAction,
) -> ResponseTransform {
    Box::new(move |response| {
        let Some(dom) = materialized(response) else {
            return;
        };
        for element in dom.select(&tag).into_iter().filter(|el| filter(el)) {
            action(&element);
        }
    })
}

/// Append a new element with the supplied inner HTML to the document body.
///
/// A supplier failure skips this one action with a warning; the rest of
/// the chain continues.
pub(crate) fn append_html_element_to_body(tag: String, supplier: HtmlSupplier) -> ResponseTransform {
    Box::new(move |response| {
        let Some(dom) = materialized(response) else {
            return;
        };
        let Some(body) = dom.body() else {
            warn!("document has no body element to append {} to", tag);
            return;
        };
        let content = match supplier() {
            Ok(content) => content,
            Err(error) => {
                warn!("an error occurred when appending {} element: {:#}", tag, error);
                return;
            }
        };
        match Element::from_html(&tag, &content) {
            Some(element) => body.append_child(&element),
            None => warn!("could not build a {} element from the supplied content", tag),
        }
    })
}

/// Shared entry point of every markup action: the cached document, parsed
/// on first access. A response without raw text skips the action with a
/// warning.
fn materialized(response: &mut Response) -> Option<&crate::document::Document> {
    let dom = response.materialize_dom();
    if dom.is_none() {
        warn!("tried to alter the response document but the response has no body");
    }
    dom
}
