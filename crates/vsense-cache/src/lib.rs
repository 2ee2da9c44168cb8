//! Read-view cache for video records.
//!
//! Callers may never rely on the cache for correctness: absence changes
//! latency, not outcome.

pub mod keys;
pub mod service;

pub use service::{get_json, set_json, Cache, RedisCache};
