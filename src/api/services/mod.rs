use actix_web::web;

pub mod health;
#[cfg(feature = "metrics")]
pub mod metrics;
pub mod redirect;
pub mod routes;

pub use health::{AppStartTime, HealthService, health_routes};
#[cfg(feature = "metrics")]
pub use metrics::MetricsService;
pub use redirect::{RedirectService, redirect_routes};
pub use routes::{RoutesService, routes_routes};

/// Register every HTTP route. The redirect catch-all goes last, so
/// `/api/routes`, `/health` and `/metrics` shadow route keys with those names.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(routes_routes()).service(health_routes());

    #[cfg(feature = "metrics")]
    cfg.route("/metrics", web::get().to(MetricsService::metrics));

    cfg.service(redirect_routes());
}
