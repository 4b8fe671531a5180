use prometheus::{Encoder, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder};
use std::sync::{Once, OnceLock};

// Global registry
pub static REGISTRY: OnceLock<Registry> = OnceLock::new();
static INIT: Once = Once::new();

// Metrics
pub static HTTP_REQUESTS_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();
pub static HTTP_REQUEST_DURATION_SECONDS: OnceLock<HistogramVec> = OnceLock::new();
pub static ACCESS_DECISIONS_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();
pub static SESSION_RESOLUTIONS_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();

fn counter(name: &str, help: &str, labels: &[&str]) -> IntCounterVec {
    match IntCounterVec::new(Opts::new(name, help), labels) {
        Ok(metric) => metric,
        Err(e) => {
            tracing::error!("Failed to create {} metric: {}", name, e);
            panic!("Failed to initialize metrics: {}", e);
        }
    }
}

fn register<C>(registry: &Registry, name: &str, collector: &C)
where
    C: prometheus::core::Collector + Clone + 'static,
{
    if let Err(e) = registry.register(Box::new(collector.clone())) {
        tracing::error!("Failed to register {} collector: {}", name, e);
        panic!("Failed to initialize metrics: {}", e);
    }
}

/// Create and register every collector. Calling it again is a no-op.
pub fn init_metrics() {
    INIT.call_once(install);
}

fn install() {
    let registry = Registry::new();

    let requests_total = counter(
        "http_requests_total",
        "Total number of HTTP requests",
        &["method", "route", "status"],
    );

    let request_duration = match HistogramVec::new(
        prometheus::HistogramOpts::new(
            "http_request_duration_seconds",
            "HTTP request duration in seconds",
        ),
        &["method", "route", "status"],
    ) {
        Ok(metric) => metric,
        Err(e) => {
            tracing::error!(
                "Failed to create http_request_duration_seconds metric: {}",
                e
            );
            panic!("Failed to initialize metrics: {}", e);
        }
    };

    let access_decisions = counter(
        "access_decisions_total",
        "ACL decisions by resource, privilege and outcome",
        &["resource", "privilege", "outcome"],
    );

    let session_resolutions = counter(
        "session_resolutions_total",
        "Session resolutions by outcome",
        &["outcome"],
    );

    register(&registry, "http_requests_total", &requests_total);
    register(&registry, "http_request_duration_seconds", &request_duration);
    register(&registry, "access_decisions_total", &access_decisions);
    register(&registry, "session_resolutions_total", &session_resolutions);

    // Initialize globals
    let _ = REGISTRY.set(registry);
    let _ = HTTP_REQUESTS_TOTAL.set(requests_total);
    let _ = HTTP_REQUEST_DURATION_SECONDS.set(request_duration);
    let _ = ACCESS_DECISIONS_TOTAL.set(access_decisions);
    let _ = SESSION_RESOLUTIONS_TOTAL.set(session_resolutions);
}

/// Count one served request under its route template and time it.
pub fn record_http_request(method: &str, route: &str, status: u16, seconds: f64) {
    let status = status.to_string();
    let labels = [method, route, status.as_str()];
    if let Some(counter) = HTTP_REQUESTS_TOTAL.get() {
        counter.with_label_values(&labels).inc();
    }
    if let Some(histogram) = HTTP_REQUEST_DURATION_SECONDS.get() {
        histogram.with_label_values(&labels).observe(seconds);
    }
}

pub fn record_access_decision(resource: &str, privilege: &str, allowed: bool) {
    if let Some(counter) = ACCESS_DECISIONS_TOTAL.get() {
        let outcome = if allowed { "allow" } else { "deny" };
        counter
            .with_label_values(&[resource, privilege, outcome])
            .inc();
    }
}

pub fn record_session_resolution(outcome: &str) {
    if let Some(counter) = SESSION_RESOLUTIONS_TOTAL.get() {
        counter.with_label_values(&[outcome]).inc();
    }
}

pub fn get_metrics() -> String {
    let mut buffer = Vec::new();
    let encoder = TextEncoder::new();

    let registry = match REGISTRY.get() {
        Some(r) => r,
        None => {
            tracing::error!("Metrics registry not initialized");
            return "# Metrics registry not initialized\n".to_string();
        }
    };

    let metric_families = registry.gather();

    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!("Failed to encode metrics: {}", e);
        return format!("# Failed to encode metrics: {}\n", e);
    }

    match String::from_utf8(buffer) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!("Failed to convert metrics to UTF-8: {}", e);
            format!("# Failed to convert metrics to UTF-8: {}\n", e)
        }
    }
}
