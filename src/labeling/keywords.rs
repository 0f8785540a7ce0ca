//! Offline labeler that titles clusters with their most distinctive keywords.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;

use crate::error::Result;

use super::{ClusterLabeler, LabelEntry, LabelRequest, LabelResponse};

// Common English stopwords
const STOPWORDS: &[&str] = &[
    "the", "a", "an", "and", "or", "but", "in", "on", "at", "to", "for", "of", "with", "by",
    "from", "is", "are", "was", "were", "be", "been", "being", "have", "has", "had", "do",
    "does", "did", "will", "would", "could", "should", "may", "might", "must", "shall", "can",
    "this", "that", "these", "those", "it", "its", "as", "if", "then", "else", "when", "where",
    "why", "how", "all", "each", "every", "both", "few", "more", "most", "other", "some", "such",
    "no", "nor", "not", "only", "own", "same", "so", "than", "too", "very", "just", "also",
];

/// Labels each cluster with its top keywords, scored by TF-IDF where each
/// cluster counts as one document.
pub struct KeywordLabeler {
    max_keywords: usize,
}

impl KeywordLabeler {
    pub fn new(max_keywords: usize) -> Self {
        Self {
            max_keywords: max_keywords.max(1),
        }
    }
}

impl Default for KeywordLabeler {
    fn default() -> Self {
        Self::new(3)
    }
}

fn clean(word: &str) -> String {
    word.chars()
        .filter(|c| c.is_alphanumeric())
        .collect::<String>()
        .to_lowercase()
}

/// Rank each cluster's terms against the other clusters.
fn extract_keywords(clusters: &[Vec<String>], max_keywords: usize) -> Vec<Vec<String>> {
    let stopwords: HashSet<&str> = STOPWORDS.iter().copied().collect();

    let term_freqs: Vec<HashMap<String, usize>> = clusters
        .iter()
        .map(|texts| {
            let mut term_freq: HashMap<String, usize> = HashMap::new();
            for word in texts.iter().flat_map(|t| t.split_whitespace()) {
                let cleaned = clean(word);
                if cleaned.len() >= 3 && !stopwords.contains(cleaned.as_str()) {
                    *term_freq.entry(cleaned).or_insert(0) += 1;
                }
            }
            term_freq
        })
        .collect();

    let mut doc_freq: HashMap<&str, usize> = HashMap::new();
    for term_freq in &term_freqs {
        for term in term_freq.keys() {
            *doc_freq.entry(term.as_str()).or_insert(0) += 1;
        }
    }

    let num_clusters = clusters.len() as f64;
    term_freqs
        .iter()
        .map(|term_freq| {
            let mut scores: Vec<(&str, f64)> = term_freq
                .iter()
                .map(|(term, &tf)| {
                    let df = doc_freq.get(term.as_str()).copied().unwrap_or(1) as f64;
                    let idf = (num_clusters / df).ln() + 1.0;
                    (term.as_str(), tf as f64 * idf)
                })
                .collect();

            // Highest score first, alphabetical among equals
            scores.sort_by(|a, b| {
                b.1.partial_cmp(&a.1)
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then_with(|| a.0.cmp(b.0))
            });
            scores
                .into_iter()
                .take(max_keywords)
                .map(|(term, _)| term.to_string())
                .collect()
        })
        .collect()
}

#[async_trait]
impl ClusterLabeler for KeywordLabeler {
    async fn label(&self, request: &LabelRequest) -> Result<LabelResponse> {
        let keywords = extract_keywords(&request.clusters, self.max_keywords);

        let clusters = request
            .clusters
            .iter()
            .zip(keywords)
            .enumerate()
            .map(|(index, (texts, keywords))| LabelEntry {
                description: if keywords.is_empty() {
                    format!("Cluster {}", index)
                } else {
                    keywords.join(", ")
                },
                text_entries: texts.clone(),
            })
            .collect();

        Ok(LabelResponse { clusters })
    }

    fn name(&self) -> &str {
        "keywords"
    }
}
