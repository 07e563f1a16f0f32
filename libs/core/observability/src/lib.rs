//! Metrics for the user directory.
//!
//! - Prometheus recorder installation and the `/metrics` handler
//! - [`DirectoryMetrics`] for domain events (creates, conflicts, notifications)
//! - [`metrics_middleware`] for per-request HTTP metrics
//!
//! ```rust,ignore
//! use observability::{init_metrics, metrics_handler, metrics_middleware};
//!
//! init_metrics()?;
//! let app = Router::new()
//!     .route("/metrics", get(metrics_handler))
//!     .layer(axum::middleware::from_fn(metrics_middleware));
//! ```

pub mod directory;
pub mod middleware;

pub use directory::DirectoryMetrics;
pub use middleware::metrics_middleware;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;
use tracing::info;

static METRICS_HANDLE: OnceCell<PrometheusHandle> = OnceCell::new();

/// Install the global Prometheus recorder. Later calls return the same handle.
pub fn init_metrics() -> Result<&'static PrometheusHandle, BuildError> {
    METRICS_HANDLE.get_or_try_init(|| {
        let handle = PrometheusBuilder::new().install_recorder()?;
        info!("Prometheus metrics recorder initialized");
        register_metric_descriptions();
        Ok(handle)
    })
}

pub fn get_metrics_handle() -> Option<&'static PrometheusHandle> {
    METRICS_HANDLE.get()
}

/// Axum handler for `/metrics`
pub async fn metrics_handler() -> String {
    match get_metrics_handle() {
        Some(handle) => handle.render(),
        None => "# Metrics not initialized\n".to_string(),
    }
}

fn register_metric_descriptions() {
    use metrics::{describe_counter, describe_histogram};

    describe_counter!("http_requests_total", "Total number of HTTP requests");
    describe_histogram!(
        "http_request_duration_seconds",
        "HTTP request duration in seconds"
    );
    describe_counter!(
        "http_requests_errors_total",
        "HTTP responses with a 4xx or 5xx status"
    );

    describe_counter!(
        "user_operations_total",
        "Completed user directory operations by kind"
    );
    describe_counter!(
        "user_rejections_total",
        "User writes rejected by validation or email uniqueness"
    );
    describe_counter!(
        "user_notifications_total",
        "Change notifications published, by event type"
    );
    describe_counter!(
        "user_notification_failures_total",
        "Change notifications that could not be published"
    );
}
