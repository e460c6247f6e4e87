//! # api-adapters
//!
//! JSON-over-HTTP surface of the matchmaker. The request/response types,
//! the error mapping and the metrics registry are framework-agnostic; the
//! axum router lives behind the `web-axum` feature.

pub mod dto;
pub mod error;
pub mod metrics;

#[cfg(feature = "web-axum")]
pub mod web;

pub use error::ApiError;
pub use metrics::HttpMetrics;
