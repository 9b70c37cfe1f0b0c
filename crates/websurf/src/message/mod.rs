//! Request and response value types flowing through the engine.
//!
//! - `request`: the outbound message rules match and mutate before dispatch
//! - `response`: the inbound message plus its payload representations and
//!   the lazy document cache used by markup actions

mod request;
mod response;

pub use request::Request;
pub use response::{RawResponse, Response};
