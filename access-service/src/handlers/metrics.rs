use service_core::axum::{http::header::CONTENT_TYPE, response::IntoResponse};

/// Prometheus text exposition of every registered collector.
pub async fn metrics() -> impl IntoResponse {
    (
        [(CONTENT_TYPE, "text/plain; version=0.0.4")],
        crate::services::metrics::get_metrics(),
    )
}
