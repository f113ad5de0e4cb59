//! Request builders for the marketplace REST API.
//!
//! Every builder returns a bearer-mode [`ApiRequest`](crate::http::ApiRequest) relative to the
//! API base; pass it to [`Gateway::send`](crate::gateway::Gateway::send) or
//! [`Gateway::fetch_json`](crate::gateway::Gateway::fetch_json).

pub mod courses;
pub mod id;
pub mod student;

pub use id::*;
