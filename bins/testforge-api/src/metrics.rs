// Prometheus metrics for the testforge API

use lazy_static::lazy_static;
use prometheus::{CounterVec, Encoder, Opts, Registry, TextEncoder};

lazy_static! {
    // Global registry
    pub static ref REGISTRY: Registry = Registry::new();

    // Uploads turned into bundles (counter with format label)
    pub static ref BUNDLES_PARSED: CounterVec = CounterVec::new(
        Opts::new("testforge_bundles_parsed_total", "Total test case uploads parsed into bundles"),
        &["format"]
    )
    .expect("metric can be created");

    // Uploads rejected before or during parsing
    pub static ref INGESTION_REJECTED: CounterVec = CounterVec::new(
        Opts::new("testforge_ingestion_rejected_total", "Total test case uploads rejected"),
        &["reason"]
    )
    .expect("metric can be created");

    // Question validations by outcome (valid / invalid)
    pub static ref QUESTIONS_VALIDATED: CounterVec = CounterVec::new(
        Opts::new("testforge_questions_validated_total", "Total question drafts validated"),
        &["outcome"]
    )
    .expect("metric can be created");

    // Publish attempts by outcome (published or the error kind)
    pub static ref PUBLISH_ATTEMPTS: CounterVec = CounterVec::new(
        Opts::new("testforge_publish_attempts_total", "Total test publish attempts"),
        &["outcome"]
    )
    .expect("metric can be created");
}

/// Initialize metrics registry
pub fn init_metrics() {
    REGISTRY
        .register(Box::new(BUNDLES_PARSED.clone()))
        .expect("collector can be registered");

    REGISTRY
        .register(Box::new(INGESTION_REJECTED.clone()))
        .expect("collector can be registered");

    REGISTRY
        .register(Box::new(QUESTIONS_VALIDATED.clone()))
        .expect("collector can be registered");

    REGISTRY
        .register(Box::new(PUBLISH_ATTEMPTS.clone()))
        .expect("collector can be registered");
}

/// Render metrics in Prometheus text format
pub fn render_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!("Failed to encode metrics: {}", e);
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}

pub fn record_bundle_parsed(format: &str) {
    BUNDLES_PARSED.with_label_values(&[format]).inc();
}

pub fn record_ingestion_rejected(reason: &str) {
    INGESTION_REJECTED.with_label_values(&[reason]).inc();
}

pub fn record_question_validated(outcome: &str) {
    QUESTIONS_VALIDATED.with_label_values(&[outcome]).inc();
}

pub fn record_publish_attempt(outcome: &str) {
    PUBLISH_ATTEMPTS.with_label_values(&[outcome]).inc();
}
