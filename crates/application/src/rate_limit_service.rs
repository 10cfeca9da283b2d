//! Rate limiting ports and application service.
//!
//! Sliding-window log limiter: each key keeps the timestamps of accepted
//! hits inside the trailing window. A hit is accepted while fewer than
//! `max_attempts` timestamps remain; rejected hits are not recorded.

mod config;
mod ports;
mod service;

#[cfg(test)]
mod tests;

pub use config::{MAX_WINDOW_SECONDS, RateLimitRule};
pub use ports::{AttemptInfo, RateLimitRepository};
pub use service::{RateLimitDecision, RateLimitService};
