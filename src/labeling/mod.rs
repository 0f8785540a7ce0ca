//! Cluster labeling.
//!
//! Labelers receive every cluster's member texts in one call and return one
//! short description per cluster.
//!
//! - **OpenAI**: structured chat completion against an OpenAI-compatible API
//! - **Keywords**: offline TF-IDF keyword titles

mod keywords;
mod openai;
mod traits;

use std::sync::Arc;

pub use keywords::KeywordLabeler;
pub use openai::{response_schema, OpenAiLabeler};
pub use traits::*;

use crate::config::{LabelingConfig, LabelingProvider};
use crate::error::Result;

/// Factory for creating labelers based on configuration.
pub struct LabelerFactory;

impl LabelerFactory {
    /// Create a labeler based on configuration.
    pub fn create(config: &LabelingConfig) -> Result<Arc<dyn ClusterLabeler>> {
        match config.provider {
            LabelingProvider::OpenAi => Ok(Arc::new(OpenAiLabeler::from_config(config)?)),
            LabelingProvider::Keywords => Ok(Arc::new(KeywordLabeler::new(config.max_keywords))),
        }
    }
}
