//! CLI command handlers.

use std::path::PathBuf;

use anyhow::{bail, Result};
use incident_themes::{Config, LabelingProvider, TfidfVectorizer, ThemeEngine};

use super::input::{self, InputDocuments};
use super::output;

/// Overrides applied on top of the loaded configuration.
#[derive(Debug, Default, Clone)]
pub struct ClusterOptions {
    pub num_clusters: Option<usize>,
    pub seed: Option<u64>,
    pub labeler: Option<LabelingProvider>,
}

impl ClusterOptions {
    fn apply(&self, mut config: Config) -> Result<Config> {
        if let Some(k) = self.num_clusters {
            config.clustering.num_clusters = k;
        }
        if let Some(seed) = self.seed {
            config.clustering.seed = Some(seed);
        }
        if let Some(provider) = self.labeler {
            config.labeling.provider = provider;
        }
        config.validate()?;
        Ok(config)
    }
}

/// Run the full pipeline and print labeled clusters.
pub async fn run_cluster(config: Config, input: PathBuf, options: ClusterOptions, json: bool) -> Result<()> {
    let config = options.apply(config)?;
    let documents = input::load(&input).await?;
    if documents.is_empty() {
        bail!("No documents found in {}", input.display());
    }

    let engine = ThemeEngine::from_config(config)?;
    match documents {
        InputDocuments::Tickets(tickets) => {
            let report = engine.cluster_tickets(tickets).await?;
            output::print_ticket_report(&report, json)
        }
        InputDocuments::Lines(lines) => {
            let report = engine.cluster_documents(&lines).await?;
            output::print_theme_report(&report, json)
        }
    }
}

/// Vectorize and partition without calling a labeler.
pub async fn run_partition(config: Config, input: PathBuf, options: ClusterOptions, json: bool) -> Result<()> {
    let config = options.apply(config)?;
    let texts = input::load(&input).await?.texts();

    // Partitioning never labels, so skip constructing a remote labeler.
    let labeler = std::sync::Arc::new(incident_themes::KeywordLabeler::default());
    let engine = ThemeEngine::new(config, labeler);
    let partition = engine.partition_documents(&texts)?;
    output::print_partition(&partition, &texts, json)
}

/// Print the vocabulary fitted on the input documents.
pub async fn run_vocabulary(input: PathBuf, json: bool) -> Result<()> {
    let texts = input::load(&input).await?.texts();
    let mut vectorizer = TfidfVectorizer::new();
    vectorizer.fit_transform(&texts);
    output::print_vocabulary(&vectorizer, json)
}
