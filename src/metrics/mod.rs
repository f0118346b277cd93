//! Prometheus metrics module
//!
//! # Feature
//! This module requires the `metrics` feature to be enabled.

mod recorder;
mod registry;

pub use recorder::PrometheusMetrics;
pub use registry::METRICS;
