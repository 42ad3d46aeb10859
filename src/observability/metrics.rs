//! # Metrics
//!
//! Prometheus metrics for monitoring the controller.
//!
//! ## Metrics Exposed
//!
//! - `sentry_controller_reconciliations_total` - Reconcile attempts, by kind
//! - `sentry_controller_reconciliation_errors_total` - Failed attempts, by kind
//! - `sentry_controller_reconciliation_duration_seconds` - Attempt duration, by kind
//! - `sentry_controller_api_requests_total` - Sentry API requests, by verb
//! - `sentry_controller_secret_writes_total` - Creates/overwrites of derived Secrets

use anyhow::Result;
use prometheus::{HistogramTimer, HistogramVec, IntCounter, IntCounterVec, Registry};
use std::sync::LazyLock;

pub(crate) static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

static RECONCILIATIONS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "sentry_controller_reconciliations_total",
            "Total number of reconcile attempts",
        ),
        &["kind"],
    )
    .expect("Failed to create RECONCILIATIONS_TOTAL metric - this should never happen")
});

static RECONCILIATION_ERRORS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "sentry_controller_reconciliation_errors_total",
            "Total number of failed reconcile attempts",
        ),
        &["kind"],
    )
    .expect("Failed to create RECONCILIATION_ERRORS_TOTAL metric - this should never happen")
});

static RECONCILIATION_DURATION: LazyLock<HistogramVec> = LazyLock::new(|| {
    HistogramVec::new(
        prometheus::HistogramOpts::new(
            "sentry_controller_reconciliation_duration_seconds",
            "Duration of reconcile attempts in seconds",
        )
        .buckets(vec![0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0]),
        &["kind"],
    )
    .expect("Failed to create RECONCILIATION_DURATION metric - this should never happen")
});

static SENTRY_API_REQUESTS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "sentry_controller_api_requests_total",
            "Total number of Sentry API requests",
        ),
        &["method"],
    )
    .expect("Failed to create SENTRY_API_REQUESTS_TOTAL metric - this should never happen")
});

static SECRET_WRITES_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "sentry_controller_secret_writes_total",
        "Total number of derived Secret creates and overwrites",
    )
    .expect("Failed to create SECRET_WRITES_TOTAL metric - this should never happen")
});

/// Register all metrics with the controller registry. Call once at startup.
pub fn register_metrics() -> Result<()> {
    REGISTRY.register(Box::new(RECONCILIATIONS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(RECONCILIATION_ERRORS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(RECONCILIATION_DURATION.clone()))?;
    REGISTRY.register(Box::new(SENTRY_API_REQUESTS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(SECRET_WRITES_TOTAL.clone()))?;
    Ok(())
}

pub fn observe_reconciliation(kind: &str) {
    RECONCILIATIONS_TOTAL.with_label_values(&[kind]).inc();
}

pub fn observe_reconciliation_error(kind: &str) {
    RECONCILIATION_ERRORS_TOTAL.with_label_values(&[kind]).inc();
}

/// Start a duration timer for one reconcile attempt; observes on
/// `observe_duration` or drop.
pub fn reconcile_timer(kind: &str) -> HistogramTimer {
    RECONCILIATION_DURATION
        .with_label_values(&[kind])
        .start_timer()
}

pub fn observe_sentry_request(method: &str) {
    SENTRY_API_REQUESTS_TOTAL.with_label_values(&[method]).inc();
}

pub fn observe_secret_write() {
    SECRET_WRITES_TOTAL.inc();
}
