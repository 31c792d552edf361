//! Metrics and observability utilities
//!
//! Thin helpers over the `metrics` facade with standardized naming.
//! Nothing is exported unless the binary installs a recorder.

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram, Unit};

/// Metrics prefix for all PaperRank metrics
pub const METRICS_PREFIX: &str = "paperrank";

/// Register all metric descriptions
pub fn register_metrics() {
    // Ingestion metrics
    describe_counter!(
        format!("{}_ingested_papers_total", METRICS_PREFIX),
        Unit::Count,
        "Total paper records parsed from the dataset"
    );

    describe_histogram!(
        format!("{}_ingestion_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Dataset parsing latency in seconds"
    );

    describe_histogram!(
        format!("{}_authority_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Authority propagation latency in seconds"
    );

    describe_gauge!(
        format!("{}_authority_rounds", METRICS_PREFIX),
        Unit::Count,
        "Propagation rounds run by the last authority computation"
    );

    describe_histogram!(
        format!("{}_index_build_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Text index build latency in seconds"
    );

    describe_gauge!(
        format!("{}_indexed_documents", METRICS_PREFIX),
        Unit::Count,
        "Documents in the most recently built text index"
    );

    // Search metrics
    describe_counter!(
        format!("{}_search_queries_total", METRICS_PREFIX),
        Unit::Count,
        "Total number of search queries"
    );

    describe_histogram!(
        format!("{}_search_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Search query latency in seconds"
    );

    describe_gauge!(
        format!("{}_search_candidates_count", METRICS_PREFIX),
        Unit::Count,
        "Number of fused candidates returned by the last query"
    );

    describe_gauge!(
        format!("{}_clusters_count", METRICS_PREFIX),
        Unit::Count,
        "Number of clusters returned by the last query"
    );
}

/// Helper to record ingestion metrics
pub fn record_ingestion(duration_secs: f64, papers: usize) {
    counter!(format!("{}_ingested_papers_total", METRICS_PREFIX)).increment(papers as u64);

    histogram!(format!("{}_ingestion_duration_seconds", METRICS_PREFIX)).record(duration_secs);
}

/// Helper to record authority computation metrics
pub fn record_authority(duration_secs: f64, rounds: usize) {
    histogram!(format!("{}_authority_duration_seconds", METRICS_PREFIX)).record(duration_secs);

    gauge!(format!("{}_authority_rounds", METRICS_PREFIX)).set(rounds as f64);
}

/// Helper to record a text index build
pub fn record_index_build(duration_secs: f64, documents: usize) {
    histogram!(format!("{}_index_build_duration_seconds", METRICS_PREFIX)).record(duration_secs);

    gauge!(format!("{}_indexed_documents", METRICS_PREFIX)).set(documents as f64);
}

/// Helper to record search metrics
pub fn record_search(duration_secs: f64, outcome: &str, candidate_count: usize) {
    counter!(
        format!("{}_search_queries_total", METRICS_PREFIX),
        "outcome" => outcome.to_string()
    )
    .increment(1);

    histogram!(
        format!("{}_search_duration_seconds", METRICS_PREFIX),
        "outcome" => outcome.to_string()
    )
    .record(duration_secs);

    gauge!(format!("{}_search_candidates_count", METRICS_PREFIX)).set(candidate_count as f64);
}

/// Helper to record clustering metrics
pub fn record_clusters(cluster_count: usize) {
    gauge!(format!("{}_clusters_count", METRICS_PREFIX)).set(cluster_count as f64);
}
