//! Shared helpers for integration tests.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use incident_themes::{ClusterLabeler, Config, LabelEntry, LabelRequest, LabelResponse, Result};

/// Labeler that titles each cluster with its first member and counts calls.
#[derive(Default)]
pub struct CountingLabeler {
    calls: AtomicUsize,
}

impl CountingLabeler {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ClusterLabeler for CountingLabeler {
    async fn label(&self, request: &LabelRequest) -> Result<LabelResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(LabelResponse {
            clusters: request
                .clusters
                .iter()
                .map(|texts| LabelEntry {
                    description: texts
                        .first()
                        .map(|t| format!("About {}", t))
                        .unwrap_or_else(|| "Empty".to_string()),
                    text_entries: texts.clone(),
                })
                .collect(),
        })
    }

    fn name(&self) -> &str {
        "counting"
    }
}

/// Deterministic configuration with `k` clusters.
pub fn test_config(k: usize) -> Config {
    let mut config = Config::default();
    config.clustering.num_clusters = k;
    config.clustering.seed = Some(7);
    config.clustering.n_init = 25;
    config
}
