//! Request governance: per-client admission control in front of expensive
//! handlers.
//!
//! # Responsibility
//! - `rate_limiter`: token buckets keyed by `<scope>:<client>`.
//! - `governor`: handler wrapper that short-circuits throttled calls.

pub mod governor;
pub mod rate_limiter;

pub use governor::{admission_key, client_identity, RequestGovernor};
pub use rate_limiter::{Clock, ManualClock, RateBucket, RateLimiter, SystemClock};
