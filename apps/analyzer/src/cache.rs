//! Single-slot TTL cache for shared snapshots (criteria, historical corpus).
//!
//! Values are stored as `Arc<V>` so readers share one immutable snapshot.
//! Expiry uses `tokio::time::Instant`, which makes it controllable with
//! paused time in tests.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::debug;

struct Entry<V> {
    value: Arc<V>,
    inserted_at: Instant,
}

pub struct TtlCache<V> {
    name: &'static str,
    ttl: Duration,
    slot: RwLock<Option<Entry<V>>>,
}

impl<V> TtlCache<V> {
    pub fn new(name: &'static str, ttl: Duration) -> Self {
        Self {
            name,
            ttl,
            slot: RwLock::new(None),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Returns the cached snapshot unless it is missing or expired.
    pub async fn get(&self) -> Option<Arc<V>> {
        let slot = self.slot.read().await;
        match slot.as_ref() {
            Some(entry) if entry.inserted_at.elapsed() < self.ttl => Some(entry.value.clone()),
            _ => None,
        }
    }

    /// Replaces the cached snapshot and resets its age.
    pub async fn insert(&self, value: V) -> Arc<V> {
        let value = Arc::new(value);
        *self.slot.write().await = Some(Entry {
            value: value.clone(),
            inserted_at: Instant::now(),
        });
        value
    }

    pub async fn invalidate(&self) {
        if self.slot.write().await.take().is_some() {
            debug!(cache = self.name, "Cache invalidated");
        }
    }

    /// Returns the cached snapshot, or runs `load` and caches its result.
    ///
    /// No lock is held while `load` runs. A failed load leaves the cache empty
    /// and returns the error.
    pub async fn get_or_try_refresh<E, F, Fut>(&self, load: F) -> Result<Arc<V>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        if let Some(value) = self.get().await {
            debug!(cache = self.name, "Cache hit");
            return Ok(value);
        }
        debug!(cache = self.name, "Cache miss, loading");
        let value = load().await?;
        Ok(self.insert(value).await)
    }
}
