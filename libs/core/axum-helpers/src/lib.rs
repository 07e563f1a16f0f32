//! # Axum Helpers
//!
//! Shared HTTP plumbing for the directory service.
//!
//! - **[`errors`]**: [`AppError`] and the JSON [`ErrorResponse`] body
//! - **[`extractors`]**: [`ValidatedJson`] and [`IdPath`]
//! - **[`server`]**: router assembly with OpenAPI UIs, health checks, graceful shutdown
//! - **[`http`]**: CORS and security headers
//!
//! ```ignore
//! let cors = cors_layer_from_env(&environment)?;
//! let router = create_router::<ApiDoc>(api_routes, cors).merge(health_router(app_info!()));
//! create_production_app(router, &server_config, async move { db.close().await.ok(); }).await?;
//! ```

pub mod errors;
pub mod extractors;
pub mod http;
pub mod server;

pub use errors::{AppError, ErrorResponse};
pub use extractors::{IdPath, ValidatedJson};
pub use http::{cors_layer_from_env, create_cors_layer, security_headers};
pub use server::{
    HealthCheckFuture, HealthResponse, ShutdownCoordinator, create_production_app, create_router,
    health_router, run_health_checks, shutdown_signal,
};
