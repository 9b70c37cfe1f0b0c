//! Websurf: a declarative rule engine for rewriting HTTP traffic.
//!
//! Callers describe an ordered set of rules in one fluent chain; the
//! engine evaluates every rule against each outbound request, applies the
//! matching request-side actions, dispatches the (possibly rewritten)
//! request, then applies response-side actions for the rules whose request
//! condition also matched. See [`builder`] for the chain-splitting
//! semantics and [`surfer`] for the evaluation pipeline.
//!
//! ```no_run
//! use websurf::{ReqwestDispatcher, Request, WebSurfer};
//! use http::Method;
//!
//! # fn main() -> anyhow::Result<()> {
//! let surfer = WebSurfer::configure(ReqwestDispatcher::new())
//!     .rule_name("tag-users")
//!     .get("/user")
//!     .set_request_header("x-tag", "yes")
//!     .any_response()
//!     .change_all_html_elements("p", |_| true, |p| p.set_attribute("data-seen", "1"))
//!     .build()?;
//!
//! let response = surfer.surf(Request::new(Method::GET, "http://localhost/user/1"))?;
//! println!("{}", response.render().body());
//! # Ok(())
//! # }
//! ```

pub mod builder;
pub mod dispatch;
pub mod document;
pub mod error;
pub mod message;
pub mod rule;
pub mod surfer;

pub use builder::Configurator;
pub use dispatch::{Dispatcher, ReqwestDispatcher};
pub use document::{Document, Element};
pub use error::{ConfigError, DispatchError};
pub use message::{RawResponse, Request, Response};
pub use rule::SurfRule;
pub use surfer::WebSurfer;
