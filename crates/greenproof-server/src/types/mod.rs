//! Service-level types: errors and response bodies.

pub mod error;
pub mod response;

pub use error::*;
pub use response::*;
