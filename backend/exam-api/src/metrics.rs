use lazy_static::lazy_static;
use prometheus::{
    register_histogram_vec, register_int_counter, register_int_counter_vec, Encoder, HistogramVec,
    IntCounter, IntCounterVec, TextEncoder,
};

lazy_static! {
    // HTTP Metrics
    pub static ref HTTP_REQUESTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "http_requests_total",
        "Total number of HTTP requests",
        &["method", "path", "status"]
    )
    .unwrap();

    pub static ref HTTP_REQUEST_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "http_request_duration_seconds",
        "HTTP request duration in seconds",
        &["method", "path"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]
    )
    .unwrap();

    // Business Metrics
    pub static ref MASTERY_SESSIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "mastery_sessions_total",
        "Total number of flashcard mastery sessions",
        &["status"]
    )
    .unwrap();

    pub static ref FLASHCARD_ANSWERS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "flashcard_answers_total",
        "Total number of flashcard answers submitted",
        &["correct"]
    )
    .unwrap();

    pub static ref TEST_ATTEMPTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "test_attempts_total",
        "Total number of test attempts",
        &["kind", "status"]
    )
    .unwrap();

    pub static ref DAILY_ASSIGNMENTS_TOTAL: IntCounter = register_int_counter!(
        "daily_assignments_total",
        "Total number of daily test papers generated"
    )
    .unwrap();

    pub static ref QUESTIONS_IMPORTED_TOTAL: IntCounter = register_int_counter!(
        "questions_imported_total",
        "Total number of questions imported from CSV"
    )
    .unwrap();
}

/// Renders all metrics in Prometheus text format
pub fn render_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    String::from_utf8(buffer)
        .map_err(|e| prometheus::Error::Msg(format!("Failed to convert metrics to UTF-8: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_registration() {
        let _ = HTTP_REQUESTS_TOTAL
            .with_label_values(&["GET", "/health", "200"])
            .get();
        let _ = TEST_ATTEMPTS_TOTAL
            .with_label_values(&["full", "started"])
            .get();
    }

    #[test]
    fn test_render_metrics() {
        HTTP_REQUESTS_TOTAL
            .with_label_values(&["GET", "/test", "200"])
            .inc();

        let output = render_metrics().unwrap();
        assert!(output.contains("http_requests_total"));
    }
}
