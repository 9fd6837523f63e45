//! Metrics module for payment-service.
//! Provides Prometheus metrics for the submission, verification, and
//! reconciliation paths.

use once_cell::sync::Lazy;
use prometheus::{
    histogram_opts, opts, register_histogram_vec, register_int_counter_vec, Encoder, HistogramVec,
    IntCounterVec, TextEncoder,
};
use std::sync::OnceLock;

/// Database query duration histogram
pub static DB_QUERY_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        histogram_opts!(
            "payment_db_query_duration_seconds",
            "Database query duration"
        ),
        &["operation"]
    )
    .expect("Failed to register DB_QUERY_DURATION")
});

/// Payment submissions counter
pub static SUBMISSIONS_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();

/// Oracle verification attempts counter
pub static VERIFICATION_ATTEMPTS_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();

/// Reconciliation outcomes counter
pub static RECONCILIATIONS_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();

/// Initialize all metrics. Call once at startup.
pub fn init_metrics() {
    Lazy::force(&DB_QUERY_DURATION);

    SUBMISSIONS_TOTAL.get_or_init(|| {
        register_int_counter_vec!(
            opts!(
                "payment_submissions_total",
                "Total payment submissions by method"
            ),
            &["method"]
        )
        .expect("Failed to register SUBMISSIONS_TOTAL")
    });

    VERIFICATION_ATTEMPTS_TOTAL.get_or_init(|| {
        register_int_counter_vec!(
            opts!(
                "payment_verification_attempts_total",
                "Total chain-oracle verification attempts by outcome"
            ),
            &["outcome"]
        )
        .expect("Failed to register VERIFICATION_ATTEMPTS_TOTAL")
    });

    RECONCILIATIONS_TOTAL.get_or_init(|| {
        register_int_counter_vec!(
            opts!(
                "payment_reconciliations_total",
                "Total subscription reconciliations by outcome"
            ),
            &["outcome"]
        )
        .expect("Failed to register RECONCILIATIONS_TOTAL")
    });
}

/// Render all registered metrics in the Prometheus text format.
pub fn get_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer).ok();
    String::from_utf8(buffer).unwrap_or_default()
}

/// Record a payment submission.
pub fn record_submission(method: &str) {
    if let Some(counter) = SUBMISSIONS_TOTAL.get() {
        counter.with_label_values(&[method]).inc();
    }
}

/// Record a verification attempt outcome.
pub fn record_verification(verified: bool) {
    if let Some(counter) = VERIFICATION_ATTEMPTS_TOTAL.get() {
        let outcome = if verified { "verified" } else { "not_verified" };
        counter.with_label_values(&[outcome]).inc();
    }
}

/// Record a reconciliation outcome.
pub fn record_reconciliation(outcome: &str) {
    if let Some(counter) = RECONCILIATIONS_TOTAL.get() {
        counter.with_label_values(&[outcome]).inc();
    }
}
