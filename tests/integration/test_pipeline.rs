//! End-to-end pipeline tests.

use std::collections::BTreeSet;
use std::sync::Arc;

use incident_themes::{
    KeywordLabeler, Metrics, SystemClock, TfidfVectorizer, ThemeEngine, ThemeError, Ticket,
};

use crate::common::{test_config, CountingLabeler};

fn member_sets(clusters: &[Vec<String>]) -> BTreeSet<BTreeSet<String>> {
    clusters
        .iter()
        .map(|members| members.iter().cloned().collect())
        .collect()
}

fn set(items: &[&str]) -> BTreeSet<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[tokio::test]
async fn test_server_and_billing_documents_separate() {
    let labeler = Arc::new(CountingLabeler::default());
    let engine = ThemeEngine::with_parts(
        test_config(2),
        labeler.clone(),
        Arc::new(Metrics::new()),
        Arc::new(SystemClock),
    );

    let documents = ["server down", "server down again", "billing issue", "invoice wrong"];
    let report = engine.cluster_documents(&documents).await.unwrap();

    assert_eq!(labeler.calls(), 1);
    assert!(!report.has_anomaly());
    assert_eq!(report.clusters.len(), 2);
    assert_eq!(report.total_documents, 4);

    let groups: Vec<Vec<String>> = report.clusters.iter().map(|c| c.members.clone()).collect();
    let expected: BTreeSet<BTreeSet<String>> = [
        set(&["server down", "server down again"]),
        set(&["billing issue", "invoice wrong"]),
    ]
    .into_iter()
    .collect();
    assert_eq!(member_sets(&groups), expected);

    for cluster in &report.clusters {
        assert!(!cluster.description.is_empty());
    }
}

#[tokio::test]
async fn test_same_seed_same_partition() {
    let documents = [
        "vpn connection drops",
        "vpn login fails",
        "email not syncing",
        "email attachments missing",
        "printer out of toner",
        "printer jammed again",
    ];

    let first = ThemeEngine::new(test_config(3), Arc::new(KeywordLabeler::default()))
        .partition_documents(&documents)
        .unwrap();
    let second = ThemeEngine::new(test_config(3), Arc::new(KeywordLabeler::default()))
        .partition_documents(&documents)
        .unwrap();

    assert_eq!(first.clusters, second.clusters);
    assert_eq!(first.inertia, second.inertia);
}

#[tokio::test]
async fn test_more_clusters_than_documents() {
    let engine = ThemeEngine::with_parts(
        test_config(4),
        Arc::new(CountingLabeler::default()),
        Arc::new(Metrics::new()),
        Arc::new(SystemClock),
    );

    let report = engine.cluster_documents(&["disk full", "disk slow"]).await.unwrap();

    assert_eq!(report.clusters.len(), 4);
    let members: usize = report.clusters.iter().map(|c| c.members.len()).sum();
    assert_eq!(members, 2);
    assert!(report.clusters.iter().any(|c| c.members.is_empty()));
}

#[tokio::test]
async fn test_tickets_rejoined_with_keyword_labels() {
    let mut config = test_config(2);
    config.cache.enabled = false;
    let engine = ThemeEngine::with_parts(
        config,
        Arc::new(KeywordLabeler::default()),
        Arc::new(Metrics::new()),
        Arc::new(SystemClock),
    );

    let tickets = vec![
        Ticket::new("1", "mailbox quota exceeded"),
        Ticket::new("2", "mailbox quota warning"),
        Ticket::new("3", "badge reader offline"),
        Ticket::new("4", "badge reader broken"),
    ];
    let report = engine.cluster_tickets(tickets).await.unwrap();

    assert_eq!(report.clusters.len(), 2);
    let mut groups: Vec<Vec<&str>> = report
        .clusters
        .iter()
        .map(|c| {
            let mut ids: Vec<&str> = c.tickets.iter().map(|t| t.id.as_str()).collect();
            ids.sort();
            ids
        })
        .collect();
    groups.sort();
    assert_eq!(groups, vec![vec!["1", "2"], vec!["3", "4"]]);

    let descriptions: Vec<&str> = report.clusters.iter().map(|c| c.description.as_str()).collect();
    assert!(descriptions.iter().any(|d| d.contains("mailbox") || d.contains("quota")));
    assert!(descriptions.iter().any(|d| d.contains("badge") || d.contains("reader")));
}

#[tokio::test]
async fn test_empty_feed_is_rejected() {
    let engine = ThemeEngine::new(test_config(2), Arc::new(CountingLabeler::default()));
    let err = engine.cluster_tickets(Vec::new()).await.unwrap_err();
    assert!(matches!(err, ThemeError::InvalidPartitionRequest(_)));
}

#[test]
fn test_vocabulary_grows_across_fits() {
    let mut vectorizer = TfidfVectorizer::new();
    vectorizer.fit_transform(&["server down"]);
    let vectors = vectorizer.fit_transform(&["billing issue"]);

    assert_eq!(vectorizer.vocabulary_size(), 4);
    assert_eq!(vectors[0].len(), 4);
    assert_eq!(vectors[0][0], 0.0);
}
