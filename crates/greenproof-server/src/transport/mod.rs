//! Transport layer for the audit service.

pub mod http;

pub use http::{router, router_with_body_limit, HttpTransport, ServerState};
