//! Bridge - a host-aware URL redirect service
//!
//! Requests are resolved against an in-memory route table: a key scoped to
//! the request's host wins over a global key, and anything unmatched goes to
//! the configured default destination. Routes live in a pluggable store
//! (memory, a JSON file, a directory of shards or a remote object) and can
//! be changed at runtime through a small JSON API.
//!
//! # Features
//! - **server**: HTTP server mode (default)
//! - **metrics**: Prometheus metrics export
//! - **full**: All features enabled
//!
//! # Architecture
//! - `storage`: Route stores and the backend factory
//! - `services`: Route table, mutation guard and redirect rendering
//! - `api`: HTTP services and middleware
//! - `config`: Configuration management
//! - `runtime`: Application lifecycle and execution modes
//! - `system`: Logging setup

pub mod api;
pub mod cli;
pub mod config;
pub mod errors;
#[cfg(feature = "metrics")]
pub mod metrics;
pub mod metrics_core;
pub mod runtime;
pub mod services;
pub mod storage;
pub mod system;
pub mod utils;
