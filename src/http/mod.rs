//! HTTP module
//!
//! REST record source built on a single-attempt HTTP client.
//!
//! # Features
//!
//! - **Rate Limiting**: Token bucket rate limiter using governor
//! - **Status Classification**: 429 and 5xx are retryable, other 4xx are fatal
//! - **Token Pagination**: Vendor pagination folded into opaque tokens

mod client;
mod rate_limit;
mod rest;

pub use client::{HttpClient, HttpClientConfig, HttpClientConfigBuilder, JsonResponse};
pub use rate_limit::{RateLimiter, RateLimiterConfig};
pub use rest::RestPaginator;

#[cfg(test)]
mod tests;
