//! Prometheus metrics for the accounts service.
//!
//! - a global recorder installed once by [`init_metrics`]
//! - [`metrics_handler`] rendering the text exposition format for `/metrics`
//! - [`middleware::metrics_middleware`] counting and timing every request
//! - [`AccountMetrics`] for domain counters
//!
//! ```rust,ignore
//! use axum::{Router, middleware, routing::get};
//! use observability::{init_metrics, metrics_handler, middleware::metrics_middleware};
//!
//! init_metrics()?;
//! let app = Router::new()
//!     .route("/metrics", get(metrics_handler))
//!     .layer(middleware::from_fn(metrics_middleware));
//! ```

pub mod accounts;
pub mod middleware;

pub use accounts::{AccountMetrics, Operation, Outcome};

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;
use tracing::info;

static METRICS_HANDLE: OnceCell<PrometheusHandle> = OnceCell::new();

/// Installs the Prometheus recorder. Later calls return the same handle.
pub fn init_metrics() -> Result<&'static PrometheusHandle, BuildError> {
    METRICS_HANDLE.get_or_try_init(|| {
        let handle = PrometheusBuilder::new().install_recorder()?;
        describe_metrics();
        info!("Prometheus metrics recorder installed");
        Ok(handle)
    })
}

pub fn get_metrics_handle() -> Option<&'static PrometheusHandle> {
    METRICS_HANDLE.get()
}

/// `GET /metrics`
pub async fn metrics_handler() -> String {
    match get_metrics_handle() {
        Some(handle) => handle.render(),
        None => "# metrics recorder not installed\n".to_string(),
    }
}

fn describe_metrics() {
    use metrics::{describe_counter, describe_histogram};

    describe_counter!("http_requests_total", "HTTP requests by method, route and status");
    describe_histogram!(
        "http_request_duration_seconds",
        "HTTP request latency in seconds"
    );
    describe_counter!(
        "http_requests_errors_total",
        "HTTP responses with a 4xx or 5xx status"
    );

    describe_counter!(
        accounts::REGISTRATIONS_TOTAL,
        "Successful self-service registrations"
    );
    describe_counter!(
        accounts::USER_OPERATIONS_TOTAL,
        "User operations by operation and outcome"
    );
    describe_counter!(
        accounts::VALIDATION_FAILURES_TOTAL,
        "Rejected payloads by operation and offending field"
    );
}
