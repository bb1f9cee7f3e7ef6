//! Code-fix aggregation for Quay.
//!
//! Flattens the engine's nested fix suggestions for clients and turns an
//! applied fix into per-document text edits.

pub mod diff;
pub mod flatten;

mod service;

pub use diff::{text_edits, translate};
pub use flatten::{flatten, flatten_all};
pub use service::FixService;
