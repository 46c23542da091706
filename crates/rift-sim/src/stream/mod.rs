//! Throughput-limited content streams.

mod bit_rate;
mod rate_limited;

pub use bit_rate::BitRate;
pub use rate_limited::{RateLimitedStream, MIN_BIT_RATE};
