//! Router assembly shared by `main` and the tests.

use axum::{Router, middleware, routing::get};
use axum_helpers::server::{create_router, health_router};
use core_config::AppInfo;
use observability::{metrics_handler, metrics_middleware};
use tower_http::cors::CorsLayer;

use crate::openapi::ApiDoc;

/// Full application router.
///
/// - `/api/...` from `api_routes`, with docs UIs and the shared middleware stack
/// - `/health` (liveness) and `/metrics`
/// - `ops` for stateful extras such as `/ready`
pub fn build_app(app: AppInfo, api_routes: Router, ops: Router, cors: CorsLayer) -> Router {
    create_router::<ApiDoc>(api_routes, cors)
        .merge(health_router(app))
        .merge(ops)
        .route("/metrics", get(metrics_handler))
        .layer(middleware::from_fn(metrics_middleware))
}
