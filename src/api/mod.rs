//! API module
//!
//! HTTP handlers for session lifecycle, tab inputs, and queries.

pub mod inputs;
pub mod query;
pub mod session;
pub mod utils;
