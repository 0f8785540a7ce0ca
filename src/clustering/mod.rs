//! Incident text clustering.
//!
//! The pipeline turns free-text documents into labeled themes:
//!
//! 1. [`TfidfVectorizer`] builds TF-IDF feature vectors
//! 2. [`KMeans`] partitions the vectors into `k` index groups
//! 3. [`ClusterAssembler`] maps the groups back to texts and asks a
//!    [`ClusterLabeler`](crate::labeling::ClusterLabeler) for titles
//! 4. [`ClusterCache`] keeps the most recent result for five minutes
//!
//! [`ThemeEngine`] wires these together.

mod assembler;
mod cache;
mod engine;
mod kmeans;
mod vectorizer;

pub use assembler::{Assembly, ClusterAssembler, ClusteringAnomaly, LabeledCluster};
pub use cache::{CacheStats, Clock, ClusterCache, ManualClock, SystemClock};
pub use engine::{ThemeEngine, ThemeReport};
pub use kmeans::{partition, KMeans, KMeansParams, Partition};
pub use vectorizer::{tokenize, TfidfVectorizer};
