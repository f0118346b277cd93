//! HTTP surface
//!
//! Thin actix-web handlers over [`crate::services::RouteService`].

pub mod middleware;
pub mod response;
pub mod services;

pub use response::{ApiResponse, ErrorCode};
