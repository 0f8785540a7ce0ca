//! Prometheus-compatible metrics for the theme engine.

use prometheus::{self, Encoder, Histogram, HistogramOpts, IntCounter, Registry, TextEncoder};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::RwLock;

/// Global metrics instance.
static METRICS: std::sync::OnceLock<Arc<Metrics>> = std::sync::OnceLock::new();

/// Get or initialize the process-wide metrics instance.
pub fn get_metrics() -> Arc<Metrics> {
    METRICS.get_or_init(|| Arc::new(Metrics::new())).clone()
}

/// Latency buckets in seconds, 1ms to 30s.
fn default_latency_buckets() -> Vec<f64> {
    vec![
        0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0,
    ]
}

/// All metrics for the theme engine.
pub struct Metrics {
    /// Prometheus registry for all metrics.
    pub registry: Registry,

    /// Completed vectorize, partition and label runs.
    pub clustering_runs_total: IntCounter,
    /// Result cache hits.
    pub cache_hits_total: IntCounter,
    /// Result cache misses.
    pub cache_misses_total: IntCounter,
    /// Failed labeling calls.
    pub labeling_errors_total: IntCounter,
    /// Labeling responses whose cluster count differed from the request.
    pub cluster_count_mismatches_total: IntCounter,

    /// Full pipeline duration in seconds.
    pub clustering_duration_seconds: Histogram,
    /// Labeling call duration in seconds.
    pub labeling_duration_seconds: Histogram,

    start_time: RwLock<Instant>,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

fn counter(registry: &Registry, name: &str, help: &str) -> IntCounter {
    let counter = IntCounter::new(name, help).expect("failed to create counter");
    registry
        .register(Box::new(counter.clone()))
        .expect("failed to register counter");
    counter
}

fn histogram(registry: &Registry, name: &str, help: &str) -> Histogram {
    let histogram = Histogram::with_opts(HistogramOpts::new(name, help).buckets(default_latency_buckets()))
        .expect("failed to create histogram");
    registry
        .register(Box::new(histogram.clone()))
        .expect("failed to register histogram");
    histogram
}

impl Metrics {
    /// Create a new metrics instance with all metrics registered.
    pub fn new() -> Self {
        let registry = Registry::new();

        Self {
            clustering_runs_total: counter(
                &registry,
                "themes_clustering_runs_total",
                "Total number of clustering pipeline runs",
            ),
            cache_hits_total: counter(&registry, "themes_cache_hits_total", "Total number of cache hits"),
            cache_misses_total: counter(
                &registry,
                "themes_cache_misses_total",
                "Total number of cache misses",
            ),
            labeling_errors_total: counter(
                &registry,
                "themes_labeling_errors_total",
                "Total number of failed labeling calls",
            ),
            cluster_count_mismatches_total: counter(
                &registry,
                "themes_cluster_count_mismatches_total",
                "Total number of labeling responses with an unexpected cluster count",
            ),
            clustering_duration_seconds: histogram(
                &registry,
                "themes_clustering_duration_seconds",
                "Clustering pipeline duration in seconds",
            ),
            labeling_duration_seconds: histogram(
                &registry,
                "themes_labeling_duration_seconds",
                "Labeling call duration in seconds",
            ),
            registry,
            start_time: RwLock::new(Instant::now()),
        }
    }

    pub fn record_clustering(&self, duration: Duration) {
        self.clustering_runs_total.inc();
        self.clustering_duration_seconds.observe(duration.as_secs_f64());
    }

    pub fn record_labeling(&self, duration: Duration, ok: bool) {
        self.labeling_duration_seconds.observe(duration.as_secs_f64());
        if !ok {
            self.labeling_errors_total.inc();
        }
    }

    pub fn record_cache(&self, hit: bool) {
        if hit {
            self.cache_hits_total.inc();
        } else {
            self.cache_misses_total.inc();
        }
    }

    pub fn record_cluster_count_mismatch(&self) {
        self.cluster_count_mismatches_total.inc();
    }

    /// Seconds since this instance was created.
    pub fn uptime(&self) -> Duration {
        self.start_time.read().elapsed()
    }

    /// Point-in-time copy of the counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            clustering_runs_total: self.clustering_runs_total.get(),
            cache_hits_total: self.cache_hits_total.get(),
            cache_misses_total: self.cache_misses_total.get(),
            labeling_errors_total: self.labeling_errors_total.get(),
            cluster_count_mismatches_total: self.cluster_count_mismatches_total.get(),
            uptime_seconds: self.uptime().as_secs(),
        }
    }

    /// Render all metrics in the Prometheus text format.
    pub fn export(&self) -> String {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        if let Err(e) = encoder.encode(&self.registry.gather(), &mut buffer) {
            tracing::warn!("Failed to encode metrics: {}", e);
            return String::new();
        }
        String::from_utf8(buffer).unwrap_or_default()
    }
}

/// Serializable counter snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub clustering_runs_total: u64,
    pub cache_hits_total: u64,
    pub cache_misses_total: u64,
    pub labeling_errors_total: u64,
    pub cluster_count_mismatches_total: u64,
    pub uptime_seconds: u64,
}
