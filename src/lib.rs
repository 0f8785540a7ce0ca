//! Incident Themes: clustering of incident tickets into labeled themes
//!
//! Ticket short descriptions are turned into TF-IDF vectors, partitioned
//! with k-means, and each partition is titled by a pluggable labeler. The
//! most recent result is cached for a short freshness window.

pub mod clustering;
pub mod config;
pub mod error;
pub mod labeling;
pub mod metrics;
pub mod tickets;

pub use clustering::{
    partition, tokenize, Assembly, CacheStats, Clock, ClusterAssembler, ClusterCache,
    ClusteringAnomaly, KMeans, KMeansParams, LabeledCluster, ManualClock, Partition, SystemClock,
    TfidfVectorizer, ThemeEngine, ThemeReport,
};
pub use config::{CacheConfig, ClusteringConfig, Config, LabelingConfig, LabelingProvider};
pub use error::{ConfigError, LabelingError, Result, ThemeError};
pub use labeling::{
    ClusterLabeler, KeywordLabeler, LabelEntry, LabelRequest, LabelResponse, LabelerFactory,
    OpenAiLabeler,
};
pub use metrics::{get_metrics, Metrics, MetricsSnapshot};
pub use tickets::{rejoin_tickets, ClusteredTicketReport, ClusteredTickets, IncidentFeed, Ticket};
