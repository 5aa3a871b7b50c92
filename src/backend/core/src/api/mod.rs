//! Application wiring: shared state and the composed axum router.
//!
//! Grounded in the teacher's `api::build_router` (a `Router` assembled from
//! nested route groups plus a middleware stack of CORS/trace/compression
//! layers). Authentication, rate limiting, and API versioning are deliberately
//! not carried over here — they implement functionality this gateway doesn't
//! have (see the project's Non-goals).

use std::sync::Arc;

use axum::Router;
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::dispatcher::Dispatcher;
use crate::health::HealthMonitor;
use crate::pool::PoolManager;
use crate::registry::SharedRegistry;
use crate::source::ConfigSource;
use crate::stats::RequestStats;
use crate::{management, router};

/// State shared across every handler: the live registry, the components
/// built on top of it, and the source reload re-reads from.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<SharedRegistry>,
    pub pool_manager: Arc<PoolManager>,
    pub health_monitor: Arc<HealthMonitor>,
    pub dispatcher: Arc<Dispatcher>,
    pub stats: Arc<RequestStats>,
    pub config_source: Arc<dyn ConfigSource>,
}

/// Compose the dynamic dispatch router (one route per configured endpoint)
/// with the management API under `/api/management`, plus the standard
/// CORS/trace/compression middleware stack.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let dispatch_router = router::build(&state);

    Router::new()
        .merge(dispatch_router)
        .nest("/api/management", management::routes())
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(cors)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    // `build_router` is exercised end-to-end in the crate's top-level
    // integration tests, which spin up a real registry; unit tests here
    // would just restate the function body.
}
