//! Joins partitions back to document texts and attaches labels.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use super::Partition;
use crate::error::{LabelingError, Result, ThemeError};
use crate::labeling::{ClusterLabeler, LabelRequest};
use crate::metrics::{get_metrics, Metrics};

/// A cluster of document texts with its description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabeledCluster {
    /// Position of the cluster in the result.
    pub cluster_id: usize,
    /// Short human-readable title.
    pub description: String,
    /// Member document texts.
    pub members: Vec<String>,
}

/// Non-fatal problems found while assembling clusters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ClusteringAnomaly {
    /// The labeler returned a different number of clusters than requested.
    ClusterCountMismatch { expected: usize, got: usize },
}

impl std::fmt::Display for ClusteringAnomaly {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClusteringAnomaly::ClusterCountMismatch { expected, got } => {
                write!(f, "expected {} clusters, labeler returned {}", expected, got)
            }
        }
    }
}

/// Labeled clusters plus any anomaly observed on the way.
#[derive(Debug, Clone, PartialEq)]
pub struct Assembly {
    pub clusters: Vec<LabeledCluster>,
    pub anomaly: Option<ClusteringAnomaly>,
}

/// Maps partitions to texts and asks a labeler for descriptions.
pub struct ClusterAssembler {
    labeler: Arc<dyn ClusterLabeler>,
    timeout: Option<Duration>,
    metrics: Arc<Metrics>,
}

impl ClusterAssembler {
    pub fn new(labeler: Arc<dyn ClusterLabeler>) -> Self {
        Self {
            labeler,
            timeout: None,
            metrics: get_metrics(),
        }
    }

    /// Bound the labeling call; expiry surfaces as [`LabelingError::Timeout`].
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn labeler_name(&self) -> &str {
        self.labeler.name()
    }

    /// Member texts per cluster, in cluster order, preserving the order of
    /// each cluster's index set.
    pub fn group_texts<S: AsRef<str>>(documents: &[S], partition: &Partition) -> Vec<Vec<String>> {
        partition
            .clusters
            .values()
            .map(|indices| {
                indices
                    .iter()
                    .filter_map(|&i| documents.get(i).map(|d| d.as_ref().to_string()))
                    .collect()
            })
            .collect()
    }

    /// Label every cluster of `partition` with a single labeler call.
    ///
    /// When the labeler answers with the requested number of clusters, the
    /// members come from the partition and the descriptions from the
    /// labeler. Otherwise the labeler's clusters are returned as given and
    /// the mismatch is reported in [`Assembly::anomaly`].
    pub async fn assemble<S: AsRef<str>>(&self, documents: &[S], partition: &Partition) -> Result<Assembly> {
        let groups = Self::group_texts(documents, partition);
        let expected = groups.len();
        let request = LabelRequest::new(groups);

        let started = Instant::now();
        let outcome = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, self.labeler.label(&request)).await {
                Ok(result) => result,
                Err(_) => Err(LabelingError::Timeout(limit.as_millis() as u64).into()),
            },
            None => self.labeler.label(&request).await,
        };
        let outcome = outcome
            .map_err(into_labeling_error)
            .and_then(|response| {
                response.validate()?;
                Ok(response)
            });
        self.metrics.record_labeling(started.elapsed(), outcome.is_ok());

        let response = match outcome {
            Ok(response) => response,
            Err(e) => {
                tracing::error!(labeler = self.labeler.name(), "Cluster labeling failed: {}", e);
                return Err(e);
            }
        };

        let got = response.clusters.len();
        if got != expected {
            let anomaly = ClusteringAnomaly::ClusterCountMismatch { expected, got };
            tracing::warn!(expected, got, "Labeling response cluster count mismatch");
            self.metrics.record_cluster_count_mismatch();

            let clusters = response
                .clusters
                .into_iter()
                .enumerate()
                .map(|(cluster_id, entry)| LabeledCluster {
                    cluster_id,
                    description: entry.description,
                    members: entry.text_entries,
                })
                .collect();
            return Ok(Assembly {
                clusters,
                anomaly: Some(anomaly),
            });
        }

        let clusters = request
            .clusters
            .into_iter()
            .zip(response.clusters)
            .enumerate()
            .map(|(cluster_id, (members, entry))| LabeledCluster {
                cluster_id,
                description: entry.description,
                members,
            })
            .collect();

        Ok(Assembly {
            clusters,
            anomaly: None,
        })
    }
}

fn into_labeling_error(error: ThemeError) -> ThemeError {
    match error {
        ThemeError::ExternalLabeling(_) => error,
        other => LabelingError::Provider(other.to_string()).into(),
    }
}
