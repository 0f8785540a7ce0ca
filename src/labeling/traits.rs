//! Labeling trait and the typed request/response exchanged with labelers.

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::LabelingError;

/// Text groups sent to a labeler, one inner list per cluster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelRequest {
    pub clusters: Vec<Vec<String>>,
}

impl LabelRequest {
    pub fn new(clusters: Vec<Vec<String>>) -> Self {
        Self { clusters }
    }
}

/// Structured labeler output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct LabelResponse {
    pub clusters: Vec<LabelEntry>,
}

/// Description for one cluster plus the texts the labeler saw for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct LabelEntry {
    /// Short title for the cluster.
    #[serde(alias = "cluster_description")]
    pub description: String,
    /// Member texts of the cluster.
    pub text_entries: Vec<String>,
}

impl LabelResponse {
    /// Decode and validate a labeler payload.
    pub fn decode(content: &str) -> Result<Self, LabelingError> {
        let response: LabelResponse = serde_json::from_str(content)
            .map_err(|e| LabelingError::MalformedResponse(format!("invalid JSON payload: {}", e)))?;
        response.validate()?;
        Ok(response)
    }

    /// Every cluster must carry a non-blank description.
    pub fn validate(&self) -> Result<(), LabelingError> {
        if let Some(index) = self
            .clusters
            .iter()
            .position(|entry| entry.description.trim().is_empty())
        {
            return Err(LabelingError::MalformedResponse(format!(
                "cluster {} has an empty description",
                index
            )));
        }
        Ok(())
    }
}

/// Trait for cluster labeling capabilities.
///
/// A labeler sees every cluster in a single call so it can contrast them.
#[async_trait]
pub trait ClusterLabeler: Send + Sync {
    /// Produce one description per cluster.
    async fn label(&self, request: &LabelRequest) -> crate::error::Result<LabelResponse>;

    /// Get the name of this labeler.
    fn name(&self) -> &str;
}
