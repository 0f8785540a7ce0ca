//! TF-IDF vectorization of short incident descriptions.
//!
//! Tokens are the lower-cased, whitespace-separated words of a document.
//! No stemming and no stop-word filtering is applied.

use std::collections::{HashMap, HashSet};

/// Split a document into lower-cased whitespace tokens.
pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

/// TF-IDF vectorizer with a vocabulary that grows across fits.
///
/// Calling [`TfidfVectorizer::fit_transform`] a second time keeps the
/// existing term indices, appends newly seen terms, and replaces the IDF
/// table with weights computed over the new document set only. Construct a
/// fresh vectorizer (or call [`TfidfVectorizer::reset`]) to fit an unrelated
/// document set in isolation.
#[derive(Debug, Clone, Default)]
pub struct TfidfVectorizer {
    vocabulary: HashMap<String, usize>,
    idf: HashMap<String, f64>,
}

impl TfidfVectorizer {
    /// Create an empty vectorizer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fit the vocabulary and IDF table on `documents` and return one
    /// feature vector per document, in input order.
    ///
    /// Every returned vector has length [`Self::vocabulary_size`] as of the
    /// end of this call.
    pub fn fit_transform<S: AsRef<str>>(&mut self, documents: &[S]) -> Vec<Vec<f64>> {
        let tokenized: Vec<Vec<String>> = documents.iter().map(|d| tokenize(d.as_ref())).collect();

        let mut doc_freq: HashMap<&str, usize> = HashMap::new();
        for tokens in &tokenized {
            let mut seen_in_doc: HashSet<&str> = HashSet::new();
            for token in tokens {
                if !self.vocabulary.contains_key(token) {
                    let index = self.vocabulary.len();
                    self.vocabulary.insert(token.clone(), index);
                }
                if seen_in_doc.insert(token.as_str()) {
                    *doc_freq.entry(token.as_str()).or_insert(0) += 1;
                }
            }
        }

        let num_docs = tokenized.len() as f64;
        self.idf.clear();
        for (term, df) in doc_freq {
            self.idf.insert(term.to_string(), (num_docs / df as f64).ln());
        }

        let dim = self.vocabulary.len();
        tokenized
            .iter()
            .map(|tokens| self.weigh(tokens, dim))
            .collect()
    }

    fn weigh(&self, tokens: &[String], dim: usize) -> Vec<f64> {
        let mut vector = vec![0.0; dim];
        if tokens.is_empty() {
            return vector;
        }

        let mut counts: HashMap<&str, usize> = HashMap::new();
        for token in tokens {
            *counts.entry(token.as_str()).or_insert(0) += 1;
        }

        let token_count = tokens.len() as f64;
        for (term, count) in counts {
            if let (Some(&index), Some(&idf)) = (self.vocabulary.get(term), self.idf.get(term)) {
                vector[index] = (count as f64 / token_count) * idf;
            }
        }
        vector
    }

    /// Number of distinct terms seen so far.
    pub fn vocabulary_size(&self) -> usize {
        self.vocabulary.len()
    }

    /// Term to column index mapping.
    pub fn vocabulary(&self) -> &HashMap<String, usize> {
        &self.vocabulary
    }

    /// IDF weight of a term from the most recent fit.
    pub fn idf(&self, term: &str) -> Option<f64> {
        self.idf.get(term).copied()
    }

    /// Terms in column order, paired with their current IDF weight
    /// (None for terms absent from the most recent fit).
    pub fn terms(&self) -> Vec<(&str, Option<f64>)> {
        let mut terms: Vec<(&str, usize)> = self
            .vocabulary
            .iter()
            .map(|(term, &index)| (term.as_str(), index))
            .collect();
        terms.sort_by_key(|&(_, index)| index);
        terms
            .into_iter()
            .map(|(term, _)| (term, self.idf(term)))
            .collect()
    }

    /// Drop the vocabulary and IDF table.
    pub fn reset(&mut self) {
        self.vocabulary.clear();
        self.idf.clear();
    }
}
