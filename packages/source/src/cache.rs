//! Time-to-live memoization for dataset fetches.
//!
//! [`CachedFetcher`] wraps any [`DatasetFetcher`] and remembers each
//! `(dataset_id, query)` result until the TTL elapses, so repeated
//! dashboard renders inside the window skip the network entirely.
//! Failed fetches are never cached.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use community_map_source_models::SocrataQuery;

use crate::{DatasetFetcher, SourceError};

/// Default TTL: the upstream datasets refresh daily.
pub const DEFAULT_TTL: Duration = Duration::from_secs(60 * 60 * 24);

type CacheKey = (String, SocrataQuery);

struct CacheEntry {
    fetched_at: Instant,
    records: Arc<Vec<serde_json::Value>>,
}

/// A [`DatasetFetcher`] that memoizes another fetcher's results.
pub struct CachedFetcher<F> {
    inner: F,
    ttl: Duration,
    entries: Mutex<BTreeMap<CacheKey, CacheEntry>>,
}

impl<F: DatasetFetcher> CachedFetcher<F> {
    /// Wraps `inner`, keeping results for `ttl`.
    #[must_use]
    pub const fn new(inner: F, ttl: Duration) -> Self {
        Self {
            inner,
            ttl,
            entries: Mutex::new(BTreeMap::new()),
        }
    }

    /// Number of results currently held, expired or not.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether nothing is cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<CacheKey, CacheEntry>> {
        // A poisoned map only means another fetch panicked mid-insert; the
        // entries themselves are still whole.
        self.entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn lookup(&self, key: &CacheKey) -> Option<Arc<Vec<serde_json::Value>>> {
        let mut entries = self.lock();
        match entries.get(key) {
            Some(entry) if entry.fetched_at.elapsed() < self.ttl => Some(entry.records.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    /// Stores `records` under `key`, first dropping every expired entry.
    fn store(&self, key: CacheKey, records: Arc<Vec<serde_json::Value>>) {
        let mut entries = self.lock();
        entries.retain(|_, entry| entry.fetched_at.elapsed() < self.ttl);
        entries.insert(
            key,
            CacheEntry {
                fetched_at: Instant::now(),
                records,
            },
        );
    }
}

#[async_trait]
impl<F: DatasetFetcher> DatasetFetcher for CachedFetcher<F> {
    async fn fetch(
        &self,
        dataset_id: &str,
        query: &SocrataQuery,
    ) -> Result<Vec<serde_json::Value>, SourceError> {
        let key = (dataset_id.to_string(), query.clone());

        if let Some(records) = self.lookup(&key) {
            log::debug!("Cache hit for {dataset_id} ({} records)", records.len());
            return Ok(records.as_ref().clone());
        }

        let records = self.inner.fetch(dataset_id, query).await?;
        let shared = Arc::new(records);
        self.store(key, shared.clone());

        Ok(shared.as_ref().clone())
    }
}
