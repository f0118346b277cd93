//! Service layer
//!
//! Route resolution, mutation pacing and redirect rendering, shared by the
//! HTTP handlers.

mod guard;
pub mod preview;
mod renderer;
mod route_service;
mod route_table;

pub use guard::MutationGuard;
pub use renderer::{Enrichment, RedirectRenderer, RenderedRedirect};
pub use route_service::{RedirectRequest, RouteMutation, RouteService};
pub use route_table::{Resolution, ResolutionSource, RouteTable};
