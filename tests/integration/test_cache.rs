//! Result cache behavior through the theme engine.

use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeZone, Utc};
use incident_themes::{ManualClock, Metrics, ThemeEngine, Ticket};

use crate::common::{test_config, CountingLabeler};

struct Fixture {
    engine: ThemeEngine,
    labeler: Arc<CountingLabeler>,
    clock: Arc<ManualClock>,
    metrics: Arc<Metrics>,
}

fn fixture() -> Fixture {
    let labeler = Arc::new(CountingLabeler::default());
    let clock = Arc::new(ManualClock::new(Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap()));
    let metrics = Arc::new(Metrics::new());
    let engine = ThemeEngine::with_parts(test_config(2), labeler.clone(), metrics.clone(), clock.clone());
    Fixture {
        engine,
        labeler,
        clock,
        metrics,
    }
}

fn tickets() -> Vec<Ticket> {
    vec![
        Ticket::new("1", "server down"),
        Ticket::new("2", "server down again"),
        Ticket::new("3", "billing issue"),
        Ticket::new("4", "invoice wrong"),
    ]
}

#[tokio::test]
async fn test_repeat_within_window_is_served_from_cache() {
    let f = fixture();

    let first = f.engine.cluster_tickets(tickets()).await.unwrap();
    f.clock.advance(Duration::from_secs(60));
    let second = f.engine.cluster_tickets(tickets()).await.unwrap();

    assert_eq!(f.labeler.calls(), 1);
    assert_eq!(first, second);

    let snapshot = f.metrics.snapshot();
    assert_eq!(snapshot.cache_hits_total, 1);
    assert_eq!(snapshot.cache_misses_total, 1);
    assert_eq!(snapshot.clustering_runs_total, 1);
}

#[tokio::test]
async fn test_stale_result_is_recomputed() {
    let f = fixture();

    f.engine.cluster_tickets(tickets()).await.unwrap();
    f.clock.advance(Duration::from_secs(6 * 60));
    f.engine.cluster_tickets(tickets()).await.unwrap();

    assert_eq!(f.labeler.calls(), 2);
}

#[tokio::test]
async fn test_changed_ticket_list_is_recomputed() {
    let f = fixture();

    f.engine.cluster_tickets(tickets()).await.unwrap();

    let mut changed = tickets();
    changed[3].state = "Resolved".to_string();
    f.engine.cluster_tickets(changed).await.unwrap();

    assert_eq!(f.labeler.calls(), 2);

    let stats = f.engine.cache().stats().await;
    assert_eq!(stats.total_misses, 2);
    assert_eq!(stats.freshness_secs, 300);
}

#[tokio::test]
async fn test_invalidate_forces_recompute() {
    let f = fixture();

    f.engine.cluster_tickets(tickets()).await.unwrap();
    f.engine.cache().invalidate().await;
    f.engine.cluster_tickets(tickets()).await.unwrap();

    assert_eq!(f.labeler.calls(), 2);
}
