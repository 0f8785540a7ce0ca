//! Theme engine: vectorize, partition, label, cache.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{
    Clock, ClusterAssembler, ClusterCache, ClusteringAnomaly, KMeans, KMeansParams, LabeledCluster,
    Partition, SystemClock, TfidfVectorizer,
};
use crate::config::Config;
use crate::error::Result;
use crate::labeling::{ClusterLabeler, LabelerFactory};
use crate::metrics::{get_metrics, Metrics};
use crate::tickets::{rejoin_tickets, ClusteredTicketReport, Ticket};

/// Labeled clusters for one batch of documents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThemeReport {
    pub clusters: Vec<LabeledCluster>,
    /// Number of clusters the partitioner was asked for.
    pub requested_clusters: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anomaly: Option<ClusteringAnomaly>,
    pub total_documents: usize,
    /// Name of the labeler that produced the descriptions.
    pub labeler: String,
    pub created_at: DateTime<Utc>,
}

impl ThemeReport {
    pub fn has_anomaly(&self) -> bool {
        self.anomaly.is_some()
    }
}

/// Runs the clustering pipeline and caches the latest ticket result.
pub struct ThemeEngine {
    config: Config,
    assembler: ClusterAssembler,
    cache: ClusterCache<Vec<Ticket>, ThemeReport>,
    clock: Arc<dyn Clock>,
    metrics: Arc<Metrics>,
}

impl ThemeEngine {
    pub fn new(config: Config, labeler: Arc<dyn ClusterLabeler>) -> Self {
        Self::with_parts(config, labeler, get_metrics(), Arc::new(SystemClock))
    }

    /// Create an engine with the labeler chosen by `config.labeling`.
    pub fn from_config(config: Config) -> Result<Self> {
        let labeler = LabelerFactory::create(&config.labeling)?;
        Ok(Self::new(config, labeler))
    }

    /// Create an engine with explicit metrics and cache clock.
    pub fn with_parts(
        config: Config,
        labeler: Arc<dyn ClusterLabeler>,
        metrics: Arc<Metrics>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let assembler = ClusterAssembler::new(labeler)
            .with_timeout(Duration::from_secs(config.labeling.timeout_secs))
            .with_metrics(metrics.clone());
        let cache = ClusterCache::from_config(&config.cache)
            .with_clock(clock.clone())
            .with_metrics(metrics.clone());

        Self {
            config,
            assembler,
            cache,
            clock,
            metrics,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn cache(&self) -> &ClusterCache<Vec<Ticket>, ThemeReport> {
        &self.cache
    }

    /// Vectorize and partition without labeling.
    pub fn partition_documents<S: AsRef<str>>(&self, documents: &[S]) -> Result<Partition> {
        let mut vectorizer = TfidfVectorizer::new();
        let vectors = vectorizer.fit_transform(documents);
        tracing::debug!(
            documents = documents.len(),
            vocabulary = vectorizer.vocabulary_size(),
            "Vectorized documents"
        );

        KMeans::new(KMeansParams::from_config(&self.config.clustering)).partition(&vectors)
    }

    /// Run the full pipeline on `documents`, bypassing the cache.
    pub async fn cluster_documents<S: AsRef<str> + Sync>(&self, documents: &[S]) -> Result<ThemeReport> {
        let started = Instant::now();
        let partition = self.partition_documents(documents)?;
        let assembly = self.assembler.assemble(documents, &partition).await?;

        let elapsed = started.elapsed();
        self.metrics.record_clustering(elapsed);
        tracing::info!(
            documents = documents.len(),
            clusters = assembly.clusters.len(),
            inertia = partition.inertia,
            elapsed_ms = elapsed.as_millis() as u64,
            "Clustered documents"
        );

        Ok(ThemeReport {
            clusters: assembly.clusters,
            requested_clusters: self.config.clustering.num_clusters,
            anomaly: assembly.anomaly,
            total_documents: documents.len(),
            labeler: self.assembler.labeler_name().to_string(),
            created_at: self.clock.now(),
        })
    }

    /// Cluster tickets by short description and attach the tickets to
    /// each cluster.
    ///
    /// While the cache is enabled, an identical ticket list within the
    /// freshness window reuses the previous result without recomputing.
    pub async fn cluster_tickets(&self, tickets: Vec<Ticket>) -> Result<ClusteredTicketReport> {
        let texts: Vec<String> = tickets.iter().map(|t| t.short_description.clone()).collect();

        let report = if self.config.cache.enabled {
            self.cache
                .get_or_compute(tickets.clone(), || self.cluster_documents(&texts))
                .await?
        } else {
            self.cluster_documents(&texts).await?
        };

        Ok(rejoin_tickets(&report, &tickets))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clustering::ManualClock;
    use crate::error::ThemeError;
    use crate::labeling::KeywordLabeler;
    use chrono::TimeZone;

    fn engine() -> ThemeEngine {
        let mut config = Config::default();
        config.clustering.num_clusters = 2;
        ThemeEngine::with_parts(
            config,
            Arc::new(KeywordLabeler::default()),
            Arc::new(Metrics::new()),
            Arc::new(SystemClock),
        )
    }

    #[test]
    fn test_partition_documents() {
        let partition = engine()
            .partition_documents(&["disk full", "disk full again", "vpn login", "vpn login failed"])
            .unwrap();

        assert_eq!(partition.num_clusters(), 2);
        assert_eq!(partition.cluster_of(0), partition.cluster_of(1));
        assert_eq!(partition.cluster_of(2), partition.cluster_of(3));
        assert_ne!(partition.cluster_of(0), partition.cluster_of(2));
    }

    #[tokio::test]
    async fn test_cluster_documents_report() {
        let engine = engine();
        let report = engine
            .cluster_documents(&["disk full", "disk full again", "vpn login", "vpn login failed"])
            .await
            .unwrap();

        assert_eq!(report.requested_clusters, 2);
        assert_eq!(report.total_documents, 4);
        assert_eq!(report.labeler, "keywords");
        assert!(!report.has_anomaly());
        let members: usize = report.clusters.iter().map(|c| c.members.len()).sum();
        assert_eq!(members, 4);
        assert_eq!(engine.metrics.snapshot().clustering_runs_total, 1);
    }

    #[tokio::test]
    async fn test_report_stamped_by_engine_clock() {
        let start = Utc.with_ymd_and_hms(2024, 5, 2, 14, 30, 0).unwrap();
        let clock = Arc::new(ManualClock::new(start));
        let engine = ThemeEngine::with_parts(
            Config::default(),
            Arc::new(KeywordLabeler::default()),
            Arc::new(Metrics::new()),
            clock.clone(),
        );

        let tickets = vec![
            Ticket::new("1", "disk full"),
            Ticket::new("2", "vpn login"),
            Ticket::new("3", "printer jam"),
        ];
        let report = engine.cluster_tickets(tickets.clone()).await.unwrap();
        assert_eq!(report.created_at, start);

        let later = start + chrono::Duration::minutes(10);
        clock.set(later);
        let report = engine.cluster_tickets(tickets).await.unwrap();
        assert_eq!(report.created_at, later);
        assert_eq!(engine.cache().stats().await.entry_age_secs, Some(0));
    }

    #[tokio::test]
    async fn test_empty_input_is_invalid() {
        let err = engine().cluster_documents::<&str>(&[]).await.unwrap_err();
        assert!(matches!(err, ThemeError::InvalidPartitionRequest(_)));
    }

    #[tokio::test]
    async fn test_cache_disabled_always_recomputes() {
        let mut config = Config::default();
        config.clustering.num_clusters = 1;
        config.cache.enabled = false;
        let metrics = Arc::new(Metrics::new());
        let engine = ThemeEngine::with_parts(
            config,
            Arc::new(KeywordLabeler::default()),
            metrics.clone(),
            Arc::new(SystemClock),
        );

        let tickets = vec![Ticket::new("1", "printer offline")];
        engine.cluster_tickets(tickets.clone()).await.unwrap();
        engine.cluster_tickets(tickets).await.unwrap();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.clustering_runs_total, 2);
        assert_eq!(snapshot.cache_hits_total, 0);
    }
}
