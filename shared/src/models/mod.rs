//! Data models
//!
//! Shared between the dispatch service and its clients (via API).
//! Identifiers are UUID strings; timestamps are milliseconds since epoch.

pub mod order;
pub mod payment;
pub mod role;

// Re-exports
pub use order::*;
pub use payment::*;
pub use role::*;
