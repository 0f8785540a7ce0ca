//! Single-slot result cache with a freshness window.
//!
//! The cache remembers only the most recent computation: the input snapshot
//! it was computed from, the value, and when it was computed. A lookup hits
//! when the snapshot is structurally equal and the value is younger than
//! the freshness window. Misses recompute under the write lock and replace
//! the slot in one assignment, so readers see either the old or the new
//! entry and never a mix.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::config::CacheConfig;
use crate::error::Result;
use crate::metrics::Metrics;

/// Source of the current time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Manually advanced clock for tests and replays.
#[derive(Debug)]
pub struct ManualClock {
    now: parking_lot::Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: parking_lot::Mutex::new(start),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock();
        *now += chrono::Duration::from_std(by).unwrap_or(chrono::Duration::MAX);
    }

    pub fn set(&self, to: DateTime<Utc>) {
        *self.now.lock() = to;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock()
    }
}

struct CacheSlot<S, V> {
    snapshot: S,
    value: V,
    computed_at: DateTime<Utc>,
}

/// Statistics for the result cache.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheStats {
    /// Total number of cache hits.
    pub total_hits: u64,
    /// Total number of cache misses.
    pub total_misses: u64,
    /// Cache hit rate (0.0 to 1.0).
    pub hit_rate: f64,
    /// Age of the stored entry in seconds, if any.
    pub entry_age_secs: Option<i64>,
    /// Freshness window in seconds.
    pub freshness_secs: u64,
}

/// Most-recent-result cache keyed by an input snapshot.
pub struct ClusterCache<S, V> {
    slot: RwLock<Option<CacheSlot<S, V>>>,
    freshness: Duration,
    clock: Arc<dyn Clock>,
    hits: AtomicU64,
    misses: AtomicU64,
    metrics: Option<Arc<Metrics>>,
}

impl<S, V> ClusterCache<S, V>
where
    S: PartialEq + Send + Sync,
    V: Clone + Send + Sync,
{
    /// Freshness window used when none is configured.
    pub const DEFAULT_FRESHNESS: Duration = Duration::from_secs(300);

    /// Create an empty cache with the given freshness window.
    pub fn new(freshness: Duration) -> Self {
        Self {
            slot: RwLock::new(None),
            freshness,
            clock: Arc::new(SystemClock),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            metrics: None,
        }
    }

    /// Create a cache from configuration.
    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(Duration::from_secs(config.freshness_secs))
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    fn is_fresh(&self, slot: &CacheSlot<S, V>, snapshot: &S, now: DateTime<Utc>) -> bool {
        if slot.snapshot != *snapshot {
            return false;
        }
        let freshness = chrono::Duration::from_std(self.freshness).unwrap_or(chrono::Duration::MAX);
        now.signed_duration_since(slot.computed_at) < freshness
    }

    fn record(&self, hit: bool) {
        if hit {
            self.hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
        }
        if let Some(metrics) = &self.metrics {
            metrics.record_cache(hit);
        }
    }

    /// Fresh value for `snapshot`, if one is stored.
    pub async fn get(&self, snapshot: &S) -> Option<V> {
        let guard = self.slot.read().await;
        let slot = guard.as_ref()?;
        self.is_fresh(slot, snapshot, self.clock.now())
            .then(|| slot.value.clone())
    }

    /// Return the cached value for `snapshot` or compute and store a new one.
    ///
    /// A failed computation leaves the previous entry in place.
    pub async fn get_or_compute<F, Fut>(&self, snapshot: S, compute: F) -> Result<V>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V>>,
    {
        {
            let guard = self.slot.read().await;
            if let Some(slot) = guard.as_ref() {
                if self.is_fresh(slot, &snapshot, self.clock.now()) {
                    self.record(true);
                    tracing::debug!("Serving clusters from cache");
                    return Ok(slot.value.clone());
                }
            }
        }

        let mut guard = self.slot.write().await;

        // Another caller may have refreshed the slot while we waited.
        if let Some(slot) = guard.as_ref() {
            if self.is_fresh(slot, &snapshot, self.clock.now()) {
                self.record(true);
                return Ok(slot.value.clone());
            }
        }

        self.record(false);
        tracing::debug!("Cache miss, recomputing clusters");
        let value = compute().await?;

        *guard = Some(CacheSlot {
            snapshot,
            value: value.clone(),
            computed_at: self.clock.now(),
        });

        Ok(value)
    }

    /// Drop the stored entry.
    pub async fn invalidate(&self) {
        *self.slot.write().await = None;
    }

    /// True when an entry (fresh or stale) is stored.
    pub async fn has_entry(&self) -> bool {
        self.slot.read().await.is_some()
    }

    /// Get cache statistics.
    pub async fn stats(&self) -> CacheStats {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;
        let hit_rate = if total > 0 {
            hits as f64 / total as f64
        } else {
            0.0
        };

        let now = self.clock.now();
        let entry_age_secs = self
            .slot
            .read()
            .await
            .as_ref()
            .map(|slot| now.signed_duration_since(slot.computed_at).num_seconds());

        CacheStats {
            total_hits: hits,
            total_misses: misses,
            hit_rate,
            entry_age_secs,
            freshness_secs: self.freshness.as_secs(),
        }
    }
}

impl<S, V> Default for ClusterCache<S, V>
where
    S: PartialEq + Send + Sync,
    V: Clone + Send + Sync,
{
    fn default() -> Self {
        Self::new(Self::DEFAULT_FRESHNESS)
    }
}
