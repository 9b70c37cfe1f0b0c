//! End-to-end pipeline scenarios against closure-backed dispatchers.

use http::header::HeaderValue;
use http::{HeaderMap, Method, StatusCode};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use websurf::{DispatchError, RawResponse, Request, Response, WebSurfer};

fn ok_dispatcher(_: &Request) -> Result<Response, DispatchError> {
    Ok(Response::with_status(StatusCode::OK))
}

fn html_dispatcher(body: &'static str) -> impl Fn(&Request) -> Result<Response, DispatchError> {
    move |_| {
        Ok(Response::from_upstream(RawResponse {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            body: Some(body.to_string()),
        }))
    }
}

#[test]
fn tags_get_user_requests_only() {
    // echo the request headers back so the assertion can see them
    let dispatcher = |request: &Request| {
        let mut response = Response::with_status(StatusCode::OK);
        response.original_request = Some(request.clone());
        Ok(response)
    };

    let surfer = WebSurfer::configure(dispatcher)
        .get("/user")
        .set_request_header("x-tag", "yes")
        .build()
        .unwrap();

    let tagged = surfer
        .surf(Request::new(Method::GET, "http://svc/user/1"))
        .unwrap();
    assert_eq!(
        tagged.original_request.as_ref().unwrap().header("x-tag"),
        Some("yes")
    );

    let untagged = surfer
        .surf(Request::new(Method::POST, "http://svc/user/1"))
        .unwrap();
    assert_eq!(untagged.original_request.as_ref().unwrap().header("x-tag"), None);

    let wrong_path = surfer
        .surf(Request::new(Method::GET, "http://svc/account/1"))
        .unwrap();
    assert_eq!(wrong_path.original_request.as_ref().unwrap().header("x-tag"), None);
}

#[test]
fn response_rule_requires_status_and_header_together() {
    let build = |status: StatusCode, flagged: bool| {
        let dispatcher = move |_: &Request| {
            let mut response = Response::with_status(status);
            if flagged {
                response
                    .headers
                    .insert("x-flag", HeaderValue::from_static("on"));
            }
            Ok(response)
        };
        WebSurfer::configure(dispatcher)
            .has_status(200)
            .response_has_header("x-flag")
            .set_response_header("x-fired", "1")
            .build()
            .unwrap()
    };

    let fired = build(StatusCode::OK, true)
        .surf(Request::new(Method::GET, "http://svc/"))
        .unwrap();
    assert_eq!(fired.header("x-fired"), Some("1"));

    let forbidden = build(StatusCode::FORBIDDEN, true)
        .surf(Request::new(Method::GET, "http://svc/"))
        .unwrap();
    assert_eq!(forbidden.header("x-fired"), None);

    let unflagged = build(StatusCode::OK, false)
        .surf(Request::new(Method::GET, "http://svc/"))
        .unwrap();
    assert_eq!(unflagged.header("x-fired"), None);
}

#[test]
fn response_only_rule_fires_for_every_request() {
    let surfer = WebSurfer::configure(ok_dispatcher)
        .any_response()
        .set_response_header("x-always", "1")
        .build()
        .unwrap();

    for method in [Method::GET, Method::POST, Method::DELETE] {
        let response = surfer
            .surf(Request::new(method, "http://svc/anything"))
            .unwrap();
        assert_eq!(response.header("x-always"), Some("1"));
    }
}

#[test]
fn actions_on_one_chain_run_in_registration_order() {
    let order = Arc::new(Mutex::new(Vec::new()));

    let first = Arc::clone(&order);
    let second = Arc::clone(&order);
    let surfer = WebSurfer::configure(ok_dispatcher)
        .any_response()
        .transform_response(move |_| first.lock().unwrap().push("a"))
        .transform_response(move |_| second.lock().unwrap().push("b"))
        .build()
        .unwrap();

    surfer.surf(Request::new(Method::GET, "http://svc/")).unwrap();
    surfer.surf(Request::new(Method::GET, "http://svc/")).unwrap();

    assert_eq!(*order.lock().unwrap(), ["a", "b", "a", "b"]);
}

#[test]
fn change_all_elements_rewrites_every_paragraph() {
    let surfer = WebSurfer::configure(html_dispatcher(
        "<html><body><p>one</p><p>two</p><p>three</p></body></html>",
    ))
    .any_response()
    .change_all_html_elements("p", |_| true, |p| p.set_text("x"))
    .build()
    .unwrap();

    let response = surfer.surf(Request::new(Method::GET, "http://svc/")).unwrap();
    let body = response.render().into_body();
    assert_eq!(body.matches("<p>x</p>").count(), 3);
}

#[test]
fn markup_rule_on_bodyless_response_is_harmless() {
    let surfer = WebSurfer::configure(ok_dispatcher)
        .any_response()
        .change_all_html_elements("p", |_| true, |p| p.set_text("x"))
        .build()
        .unwrap();

    let response = surfer.surf(Request::new(Method::GET, "http://svc/")).unwrap();
    assert_eq!(response.render().into_body(), "");
}

#[test]
fn markup_actions_share_one_document() {
    let surfer = WebSurfer::configure(html_dispatcher(
        "<html><body><p>one</p></body></html>",
    ))
    .any_response()
    .change_all_html_elements("p", |_| true, |p| p.set_text("rewritten"))
    .append_html_element_to_body("aside", || Ok("<b>added</b>".to_string()))
    .change_all_html_elements("aside", |_| true, |el| el.set_attribute("data-pass", "2"))
    .build()
    .unwrap();

    let response = surfer.surf(Request::new(Method::GET, "http://svc/")).unwrap();
    let body = response.render().into_body();
    // all three actions saw the same tree: the rewrite, the append, and
    // the attribute set on the appended element
    assert!(body.contains("<p>rewritten</p>"));
    assert!(body.contains("data-pass=\"2\""));
    assert!(body.contains("<b>added</b>"));
}

#[test]
fn failing_supplier_skips_only_its_own_action() {
    let surfer = WebSurfer::configure(html_dispatcher(
        "<html><body><p>one</p></body></html>",
    ))
    .any_response()
    .append_html_element_to_body("aside", || anyhow::bail!("supplier broke"))
    .set_response_header("x-after", "ran")
    .build()
    .unwrap();

    let response = surfer.surf(Request::new(Method::GET, "http://svc/")).unwrap();
    assert_eq!(response.header("x-after"), Some("ran"));
    assert!(!response.render().into_body().contains("aside"));
}

#[test]
fn untouched_document_renders_like_the_raw_text() {
    let page = "<html><head></head><body><p>a</p><div id=\"x\">b</div></body></html>";
    let surfer = WebSurfer::configure(html_dispatcher(page))
        .any_response()
        // filter never passes, so the tree is materialized but unchanged
        .change_html_element("p", |_| false, |p| p.set_text("never"))
        .build()
        .unwrap();

    let response = surfer.surf(Request::new(Method::GET, "http://svc/")).unwrap();
    let collapse = |s: &str| s.split_whitespace().collect::<String>();
    assert_eq!(collapse(&response.render().into_body()), collapse(page));
}

#[test]
fn json_body_takes_precedence_at_render_time() {
    let surfer = WebSurfer::configure(html_dispatcher(
        "<html><body><p>ignored</p></body></html>",
    ))
    .any_response()
    .transform_response(|response| {
        response.json_body = Some(serde_json::json!({"rewritten": true}));
    })
    .build()
    .unwrap();

    let response = surfer.surf(Request::new(Method::GET, "http://svc/")).unwrap();
    assert_eq!(response.render().into_body(), r#"{"rewritten":true}"#);
}

#[test]
fn request_rewrites_reach_the_dispatcher_in_order() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let record = Arc::clone(&seen);
    let dispatcher = move |request: &Request| {
        record.lock().unwrap().push(request.url.clone());
        Ok(Response::with_status(StatusCode::OK))
    };

    let surfer = WebSurfer::configure(dispatcher)
        .url_matches("/old/")
        .change_url_with(|request| request.url.replace("/old/", "/new/"))
        .build()
        .unwrap();

    surfer
        .surf(Request::new(Method::GET, "http://svc/old/thing"))
        .unwrap();
    surfer
        .surf(Request::new(Method::GET, "http://svc/other"))
        .unwrap();

    assert_eq!(
        *seen.lock().unwrap(),
        ["http://svc/new/thing", "http://svc/other"]
    );
}

#[test]
fn dispatcher_failure_aborts_the_call() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let dispatcher = move |_: &Request| {
        counter.fetch_add(1, Ordering::SeqCst);
        Err(DispatchError::from(anyhow::anyhow!("boom")))
    };

    let surfer = WebSurfer::configure(dispatcher)
        .any_response()
        .set_response_header("x-never", "1")
        .build()
        .unwrap();

    let result = surfer.surf(Request::new(Method::GET, "http://svc/"));
    assert!(result.is_err());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn rules_evaluate_in_insertion_order_without_name_dedup() {
    let surfer = WebSurfer::configure(ok_dispatcher)
        .rule_name("same")
        .any_response()
        .set_response_header("x-order", "first")
        .rule_name("same")
        .any_response()
        .set_response_header("x-order", "second")
        .build()
        .unwrap();

    assert_eq!(surfer.rules().len(), 2);
    assert_eq!(surfer.rules()[0].name(), "same");
    assert_eq!(surfer.rules()[1].name(), "same");

    // both rules fire; the later insertion wins the header
    let response = surfer.surf(Request::new(Method::GET, "http://svc/")).unwrap();
    assert_eq!(response.header("x-order"), Some("second"));
}
