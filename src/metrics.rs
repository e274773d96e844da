/// Metrics for the Battery OS API
///
/// Provides Prometheus-compatible metrics for monitoring:
/// - HTTP request counts and latencies
/// - Signups and diagnostic submissions
/// - Raised alerts
/// - Authentication failures
/// - Documentation proxy outcomes

use axum::{
    extract::{MatchedPath, Request},
    middleware::Next,
    response::Response,
};
use lazy_static::lazy_static;
use prometheus::{
    register_histogram_vec, register_int_counter, register_int_counter_vec, register_int_gauge,
    Encoder, HistogramVec, IntCounter, IntCounterVec, IntGauge, TextEncoder,
};
use std::time::Instant;

lazy_static! {
    // ========== HTTP Metrics ==========

    /// Total HTTP requests by method, path, and status
    pub static ref HTTP_REQUESTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "http_requests_total",
        "Total number of HTTP requests",
        &["method", "path", "status"]
    )
    .unwrap();

    /// HTTP request duration in seconds
    pub static ref HTTP_REQUEST_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "http_request_duration_seconds",
        "HTTP request latencies in seconds",
        &["method", "path"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]
    )
    .unwrap();

    /// Active HTTP requests
    pub static ref HTTP_REQUESTS_ACTIVE: IntGauge = register_int_gauge!(
        "http_requests_active",
        "Number of HTTP requests currently being processed"
    )
    .unwrap();

    // ========== Domain Metrics ==========

    pub static ref USERS_CREATED_TOTAL: IntCounter = register_int_counter!(
        "users_created_total",
        "Total number of API users created"
    )
    .unwrap();

    pub static ref DIAGNOSTICS_SUBMITTED_TOTAL: IntCounterVec = register_int_counter_vec!(
        "diagnostics_submitted_total",
        "Total number of battery diagnostics submitted, by battery chemistry",
        &["battery_type"]
    )
    .unwrap();

    /// Threshold breaches by parameter and severity
    pub static ref ALERTS_RAISED_TOTAL: IntCounterVec = register_int_counter_vec!(
        "alerts_raised_total",
        "Total number of alert threshold breaches recorded",
        &["parameter", "severity"]
    )
    .unwrap();

    pub static ref AUTH_FAILURES_TOTAL: IntCounterVec = register_int_counter_vec!(
        "auth_failures_total",
        "Total number of rejected API key checks",
        &["reason"]
    )
    .unwrap();

    /// Proxied requests by target (docs, health) and outcome
    pub static ref PROXY_REQUESTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "proxy_requests_total",
        "Total number of requests proxied to the documentation service",
        &["target", "outcome"]
    )
    .unwrap();
}

/// Render metrics in Prometheus text format
pub fn render_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
}

/// Record an HTTP request
pub fn record_http_request(method: &str, path: &str, status: u16, duration: f64) {
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[method, path, &status.to_string()])
        .inc();
    HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&[method, path])
        .observe(duration);
}

pub fn record_user_created() {
    USERS_CREATED_TOTAL.inc();
}

pub fn record_diagnostic_submitted(battery_type: &str) {
    DIAGNOSTICS_SUBMITTED_TOTAL
        .with_label_values(&[battery_type_label(battery_type)])
        .inc();
}

/// Fold caller-supplied battery types onto a fixed label set
pub fn battery_type_label(battery_type: &str) -> &'static str {
    match battery_type.trim().to_ascii_lowercase().as_str() {
        "li-ion" | "lithium-ion" => "Li-ion",
        "lfp" | "lifepo4" => "LFP",
        "lead-acid" => "Lead-acid",
        _ => "other",
    }
}

pub fn record_alert_raised(parameter: &str, severity: &str) {
    ALERTS_RAISED_TOTAL
        .with_label_values(&[parameter, severity])
        .inc();
}

/// Record a rejected API key ("missing" or "invalid")
pub fn record_auth_failure(reason: &str) {
    AUTH_FAILURES_TOTAL.with_label_values(&[reason]).inc();
}

pub fn record_proxy_request(target: &str, success: bool) {
    PROXY_REQUESTS_TOTAL
        .with_label_values(&[target, if success { "success" } else { "failure" }])
        .inc();
}

/// Router middleware recording count, latency and in-flight requests.
///
/// Labels use the matched route template so path parameters don't explode
/// cardinality.
pub async fn track_metrics(request: Request, next: Next) -> Response {
    let method = request.method().to_string();
    let path = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());

    HTTP_REQUESTS_ACTIVE.inc();
    let start = Instant::now();
    let response = next.run(request).await;
    HTTP_REQUESTS_ACTIVE.dec();

    record_http_request(
        &method,
        &path,
        response.status().as_u16(),
        start.elapsed().as_secs_f64(),
    );

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_http_request() {
        record_http_request("GET", "/api/v1/diagnostics/voltage", 200, 0.05);
        let metrics = render_metrics().unwrap();
        assert!(metrics.contains("http_requests_total"));
        assert!(metrics.contains("http_request_duration_seconds"));
    }

    #[test]
    fn test_record_domain_events() {
        record_user_created();
        record_diagnostic_submitted("LFP");
        record_alert_raised("voltage", "critical");
        let metrics = render_metrics().unwrap();
        assert!(metrics.contains("users_created_total"));
        assert!(metrics.contains("diagnostics_submitted_total"));
        assert!(metrics.contains("alerts_raised_total"));
    }

    #[test]
    fn test_battery_type_label_is_bounded() {
        assert_eq!(battery_type_label("LFP"), "LFP");
        assert_eq!(battery_type_label(" li-ion "), "Li-ion");
        assert_eq!(battery_type_label("Lead-Acid"), "Lead-acid");
        assert_eq!(battery_type_label("junk-42"), "other");
    }

    #[test]
    fn test_free_form_battery_types_share_one_series() {
        for i in 0..50 {
            record_diagnostic_submitted(&format!("junk-{}", i));
        }
        let families = prometheus::gather();
        let family = families
            .iter()
            .find(|f| f.get_name() == "diagnostics_submitted_total")
            .unwrap();
        assert!(family.get_metric().len() <= 4);
        assert!(!render_metrics().unwrap().contains("junk-"));
    }

    #[test]
    fn test_record_auth_and_proxy() {
        record_auth_failure("missing");
        record_proxy_request("docs", false);
        let metrics = render_metrics().unwrap();
        assert!(metrics.contains("auth_failures_total"));
        assert!(metrics.contains(r#"outcome="failure""#));
    }
}
