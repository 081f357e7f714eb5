//! Time-boxed read-through cache in front of the [`ParallelFetcher`].
//!
//! One record per category selector is kept in the [`Store`] as
//! `{"data": [...], "timestamp": <ms>}`. A record younger than the TTL is
//! served as is; anything else triggers a fan-out. At most one load per key
//! is in flight; a second request for the same key is turned away with
//! [`TrendError::LoadInProgress`].

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::app::{Result, TrendError};
use crate::domain::{CanonicalItem, CategoryFilter};
use crate::fetcher::parallel::ParallelFetcher;
use crate::store::Store;

pub const DEFAULT_TTL: Duration = Duration::from_secs(30 * 60);
pub const DEFAULT_KEY_PREFIX: &str = "trendboard_news_";

/// Persisted shape of one cache entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheRecord {
    pub data: Vec<CanonicalItem>,
    pub timestamp: i64,
}

/// Items handed to the consumer plus the time they were produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheSnapshot {
    pub items: Vec<CanonicalItem>,
    pub cache_timestamp: i64,
    pub from_cache: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheState {
    Empty,
    Fresh { age: Duration },
    Stale { age: Duration },
    Loading,
}

pub struct CacheManager<S: Store> {
    store: Arc<S>,
    fetcher: ParallelFetcher,
    ttl: Duration,
    key_prefix: String,
    in_flight: Mutex<HashSet<String>>,
}

impl<S: Store + Send + Sync> CacheManager<S> {
    pub fn new(store: Arc<S>, fetcher: ParallelFetcher) -> Self {
        Self {
            store,
            fetcher,
            ttl: DEFAULT_TTL,
            key_prefix: DEFAULT_KEY_PREFIX.to_string(),
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn with_key_prefix(mut self, prefix: &str) -> Self {
        self.key_prefix = prefix.to_string();
        self
    }

    pub fn fetcher(&self) -> &ParallelFetcher {
        &self.fetcher
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn cache_key(&self, filter: CategoryFilter) -> String {
        format!("{}{}", self.key_prefix, filter.key())
    }

    /// Serve a fresh record, or fetch and store a new batch.
    pub async fn load_with_cache(&self, filter: CategoryFilter) -> Result<CacheSnapshot> {
        let now = Utc::now().timestamp_millis();

        if let Some(record) = self.read(filter) {
            if self.is_fresh(&record, now) {
                tracing::debug!("Serving {} from cache", self.cache_key(filter));
                return Ok(CacheSnapshot {
                    items: record.data,
                    cache_timestamp: record.timestamp,
                    from_cache: true,
                });
            }
        }

        self.load(filter).await
    }

    /// Drop the stored record and fetch a new batch regardless of age.
    pub async fn force_refresh(&self, filter: CategoryFilter) -> Result<CacheSnapshot> {
        if let Err(e) = self.invalidate(filter) {
            tracing::warn!("Failed to drop {}: {}", self.cache_key(filter), e);
        }
        self.load(filter).await
    }

    /// Reload only when a record exists and has gone stale.
    ///
    /// This is the visibility-regain path: nothing cached means nothing was
    /// on screen, so there is nothing to bring up to date.
    pub async fn refresh_if_stale(&self, filter: CategoryFilter) -> Result<Option<CacheSnapshot>> {
        let now = Utc::now().timestamp_millis();
        match self.read(filter) {
            Some(record) if !self.is_fresh(&record, now) => self.load(filter).await.map(Some),
            _ => Ok(None),
        }
    }

    pub fn invalidate(&self, filter: CategoryFilter) -> Result<()> {
        self.store.remove(&self.cache_key(filter))
    }

    /// Age of the stored record, if there is a readable one.
    pub fn cache_age(&self, filter: CategoryFilter) -> Option<Duration> {
        let now = Utc::now().timestamp_millis();
        self.read(filter).map(|record| age_of(&record, now))
    }

    pub fn state(&self, filter: CategoryFilter) -> CacheState {
        if self.is_loading(&self.cache_key(filter)) {
            return CacheState::Loading;
        }

        let now = Utc::now().timestamp_millis();
        match self.read(filter) {
            None => CacheState::Empty,
            Some(record) => {
                let age = age_of(&record, now);
                if self.is_fresh(&record, now) {
                    CacheState::Fresh { age }
                } else {
                    CacheState::Stale { age }
                }
            }
        }
    }

    async fn load(&self, filter: CategoryFilter) -> Result<CacheSnapshot> {
        let key = self.cache_key(filter);
        let _guard = InFlightGuard::acquire(&self.in_flight, &key)?;

        let batch = self.fetcher.gather(filter).await;
        if batch.all_failed() {
            return Err(TrendError::AllSourcesFailed { key });
        }

        let record = CacheRecord {
            data: batch.into_items(),
            timestamp: Utc::now().timestamp_millis(),
        };

        // The batch is still returned when it cannot be persisted.
        if let Err(e) = self.write(&key, &record) {
            tracing::warn!("Failed to persist {}: {}", key, e);
        }

        Ok(CacheSnapshot {
            items: record.data,
            cache_timestamp: record.timestamp,
            from_cache: false,
        })
    }

    /// Stored record for `filter`; unreadable records count as misses.
    fn read(&self, filter: CategoryFilter) -> Option<CacheRecord> {
        let key = self.cache_key(filter);

        let raw = match self.store.get(&key) {
            Ok(raw) => raw?,
            Err(e) => {
                tracing::warn!("Cache read failed for {}: {}", key, e);
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(record) => Some(record),
            Err(e) => {
                tracing::warn!("Cache parse error for {}: {}", key, e);
                None
            }
        }
    }

    fn write(&self, key: &str, record: &CacheRecord) -> Result<()> {
        let raw = serde_json::to_string(record)?;
        self.store.set(key, &raw)
    }

    fn is_fresh(&self, record: &CacheRecord, now: i64) -> bool {
        age_of(record, now) < self.ttl
    }

    fn is_loading(&self, key: &str) -> bool {
        self.in_flight
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains(key)
    }
}

fn age_of(record: &CacheRecord, now: i64) -> Duration {
    Duration::from_millis(now.saturating_sub(record.timestamp).max(0) as u64)
}

/// Marks a key as loading until dropped, including when the load is cancelled.
struct InFlightGuard<'a> {
    set: &'a Mutex<HashSet<String>>,
    key: String,
}

impl<'a> InFlightGuard<'a> {
    fn acquire(set: &'a Mutex<HashSet<String>>, key: &str) -> Result<Self> {
        let mut keys = set.lock().unwrap_or_else(|e| e.into_inner());
        if !keys.insert(key.to_string()) {
            tracing::debug!("Load for {} already in flight", key);
            return Err(TrendError::LoadInProgress(key.to_string()));
        }
        Ok(Self {
            set,
            key: key.to_string(),
        })
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.set
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&self.key);
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::domain::{Category, SourceDescriptor};
    use crate::fetcher::parallel::tests::{flat, flat_body};
    use crate::fetcher::stub::StubFetcher;
    use crate::registry::SourceRegistry;
    use crate::store::SqliteStore;

    pub fn manager(
        sources: Vec<SourceDescriptor>,
        stub: StubFetcher,
    ) -> (CacheManager<SqliteStore>, Arc<SqliteStore>, Arc<StubFetcher>) {
        let stub = Arc::new(stub);
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        let registry = Arc::new(SourceRegistry::new(sources).unwrap());
        let fetcher = ParallelFetcher::new(registry, stub.clone());
        (CacheManager::new(store.clone(), fetcher), store, stub)
    }

    pub fn two_sources() -> (Vec<SourceDescriptor>, StubFetcher) {
        let stub = StubFetcher::new()
            .with_body("https://t.example.com/hot.json", flat_body(&[("1", 100), ("2", 300)]))
            .with_body("https://d.example.com/hot.json", flat_body(&[("3", 200)]));
        (vec![flat("t", Category::Tech), flat("d", Category::Dev)], stub)
    }

    /// Store a record `age` old under the key for `filter`.
    pub fn seed(cache: &CacheManager<SqliteStore>, store: &SqliteStore, filter: CategoryFilter, age: Duration) {
        let record = CacheRecord {
            data: Vec::new(),
            timestamp: Utc::now().timestamp_millis() - age.as_millis() as i64,
        };
        store
            .set(&cache.cache_key(filter), &serde_json::to_string(&record).unwrap())
            .unwrap();
    }

    #[tokio::test]
    async fn test_second_load_is_served_from_cache() {
        let (sources, stub) = two_sources();
        let (cache, _, fetcher) = manager(sources, stub);

        let first = cache.load_with_cache(CategoryFilter::All).await.unwrap();
        assert!(!first.from_cache);
        assert_eq!(first.items.len(), 3);
        assert_eq!(fetcher.calls(), 2);

        let second = cache.load_with_cache(CategoryFilter::All).await.unwrap();
        assert!(second.from_cache);
        assert_eq!(fetcher.calls(), 2);
        assert_eq!(second.cache_timestamp, first.cache_timestamp);
        assert_eq!(
            serde_json::to_string(&second.items).unwrap(),
            serde_json::to_string(&first.items).unwrap()
        );
    }

    #[tokio::test]
    async fn test_force_refresh_refetches_and_replaces_timestamp() {
        let (sources, stub) = two_sources();
        let (cache, _, fetcher) = manager(sources, stub);

        let first = cache.load_with_cache(CategoryFilter::All).await.unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;

        let refreshed = cache.force_refresh(CategoryFilter::All).await.unwrap();
        assert!(!refreshed.from_cache);
        // One fan-out: one request per source.
        assert_eq!(fetcher.calls(), 4);
        assert!(refreshed.cache_timestamp > first.cache_timestamp);

        let cached = cache.load_with_cache(CategoryFilter::All).await.unwrap();
        assert_eq!(cached.cache_timestamp, refreshed.cache_timestamp);
        assert_eq!(fetcher.calls(), 4);
    }

    /// Store whose deletes always fail.
    struct NoRemove(SqliteStore);

    impl Store for NoRemove {
        fn get(&self, key: &str) -> Result<Option<String>> {
            self.0.get(key)
        }
        fn set(&self, key: &str, value: &str) -> Result<()> {
            self.0.set(key, value)
        }
        fn remove(&self, _key: &str) -> Result<()> {
            Err(TrendError::Other("store is read-only".into()))
        }
        fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>> {
            self.0.keys_with_prefix(prefix)
        }
    }

    #[tokio::test]
    async fn test_force_refresh_loads_even_when_remove_fails() {
        let (sources, stub) = two_sources();
        let stub = Arc::new(stub);
        let registry = Arc::new(SourceRegistry::new(sources).unwrap());
        let store = Arc::new(NoRemove(SqliteStore::in_memory().unwrap()));
        let cache = CacheManager::new(store, ParallelFetcher::new(registry, stub.clone()));

        cache.load_with_cache(CategoryFilter::All).await.unwrap();
        let refreshed = cache.force_refresh(CategoryFilter::All).await.unwrap();

        assert!(!refreshed.from_cache);
        assert_eq!(refreshed.items.len(), 3);
        assert_eq!(stub.calls(), 4);

        let cached = cache.load_with_cache(CategoryFilter::All).await.unwrap();
        assert!(cached.from_cache);
        assert_eq!(cached.cache_timestamp, refreshed.cache_timestamp);
    }

    #[tokio::test]
    async fn test_stale_record_is_refetched() {
        let (sources, stub) = two_sources();
        let (cache, store, fetcher) = manager(sources, stub);
        seed(&cache, &store, CategoryFilter::All, Duration::from_secs(31 * 60));

        let snapshot = cache.load_with_cache(CategoryFilter::All).await.unwrap();

        assert!(!snapshot.from_cache);
        assert_eq!(snapshot.items.len(), 3);
        assert_eq!(fetcher.calls(), 2);
    }

    #[tokio::test]
    async fn test_custom_ttl() {
        let (sources, stub) = two_sources();
        let (cache, store, fetcher) = manager(sources, stub);
        let cache = cache.with_ttl(Duration::from_secs(60));
        seed(&cache, &store, CategoryFilter::All, Duration::from_secs(120));

        assert!(!cache.load_with_cache(CategoryFilter::All).await.unwrap().from_cache);
        assert_eq!(fetcher.calls(), 2);
    }

    #[tokio::test]
    async fn test_corrupt_record_is_a_miss() {
        let (sources, stub) = two_sources();
        let (cache, store, _) = manager(sources, stub);
        store.set(&cache.cache_key(CategoryFilter::All), "{not json").unwrap();

        assert_eq!(cache.state(CategoryFilter::All), CacheState::Empty);
        let snapshot = cache.load_with_cache(CategoryFilter::All).await.unwrap();
        assert_eq!(snapshot.items.len(), 3);
    }

    #[tokio::test]
    async fn test_total_failure_is_an_error_and_stores_nothing() {
        let (cache, store, _) = manager(vec![flat("t", Category::Tech)], StubFetcher::new());

        let result = cache.load_with_cache(CategoryFilter::All).await;

        assert!(matches!(result, Err(TrendError::AllSourcesFailed { .. })));
        assert_eq!(store.get(&cache.cache_key(CategoryFilter::All)).unwrap(), None);
        assert_eq!(cache.state(CategoryFilter::All), CacheState::Empty);
    }

    #[tokio::test]
    async fn test_partial_failure_is_cached() {
        let stub = StubFetcher::new().with_body("https://t.example.com/hot.json", flat_body(&[("1", 1)]));
        let (cache, _, _) = manager(vec![flat("t", Category::Tech), flat("d", Category::Tech)], stub);

        let snapshot = cache.load_with_cache(CategoryFilter::All).await.unwrap();
        assert_eq!(snapshot.items.len(), 1);
        assert!(matches!(cache.state(CategoryFilter::All), CacheState::Fresh { .. }));
    }

    #[tokio::test]
    async fn test_concurrent_load_for_same_key_is_turned_away() {
        let (sources, stub) = two_sources();
        let (cache, _, fetcher) = manager(sources, stub.with_delay(Duration::from_millis(50)));

        let (a, b) = tokio::join!(
            cache.load_with_cache(CategoryFilter::All),
            cache.load_with_cache(CategoryFilter::All)
        );

        assert!(a.is_ok());
        assert!(matches!(b, Err(TrendError::LoadInProgress(_))));
        assert_eq!(fetcher.calls(), 2);
        // The guard is released once the load settles.
        assert!(matches!(cache.state(CategoryFilter::All), CacheState::Fresh { .. }));
    }

    #[tokio::test]
    async fn test_state_reports_loading_while_in_flight() {
        let (sources, stub) = two_sources();
        let (cache, _, _) = manager(sources, stub.with_delay(Duration::from_millis(20)));

        let mut load = tokio_test::task::spawn(cache.load_with_cache(CategoryFilter::All));
        tokio_test::assert_pending!(load.poll());
        assert_eq!(cache.state(CategoryFilter::All), CacheState::Loading);

        tokio::time::sleep(Duration::from_millis(100)).await;
        let snapshot = tokio_test::assert_ready_ok!(load.poll());
        drop(load);

        assert_eq!(snapshot.items.len(), 3);
        assert!(matches!(cache.state(CategoryFilter::All), CacheState::Fresh { .. }));
    }

    #[tokio::test]
    async fn test_cancelled_load_releases_key_and_its_requests() {
        let (sources, stub) = two_sources();
        let (cache, _, fetcher) = manager(sources, stub.with_delay(Duration::from_millis(50)));

        let mut load = tokio_test::task::spawn(cache.load_with_cache(CategoryFilter::All));
        tokio_test::assert_pending!(load.poll());
        // Let both source requests get under way before cancelling.
        tokio::time::sleep(Duration::from_millis(5)).await;
        assert_eq!(fetcher.calls(), 2);
        drop(load);
        tokio::time::sleep(Duration::from_millis(1)).await;

        assert_eq!(cache.state(CategoryFilter::All), CacheState::Empty);
        let snapshot = cache.load_with_cache(CategoryFilter::All).await.unwrap();

        assert_eq!(snapshot.items.len(), 3);
        assert_eq!(fetcher.calls(), 4);
        // The abandoned fan-out never overlaps the new one.
        assert_eq!(fetcher.peak_concurrency(), 2);
    }

    #[tokio::test]
    async fn test_different_keys_load_independently() {
        let (sources, stub) = two_sources();
        let (cache, store, _) = manager(sources, stub.with_delay(Duration::from_millis(20)));

        let (all, dev) = tokio::join!(
            cache.load_with_cache(CategoryFilter::All),
            cache.load_with_cache(CategoryFilter::Only(Category::Dev))
        );

        assert_eq!(all.unwrap().items.len(), 3);
        assert_eq!(dev.unwrap().items.len(), 1);
        assert_eq!(
            store.keys_with_prefix(DEFAULT_KEY_PREFIX).unwrap(),
            vec!["trendboard_news_all", "trendboard_news_dev"]
        );
    }

    #[tokio::test]
    async fn test_refresh_if_stale() {
        let (sources, stub) = two_sources();
        let (cache, store, fetcher) = manager(sources, stub);

        // Nothing cached: nothing to refresh.
        assert!(cache.refresh_if_stale(CategoryFilter::All).await.unwrap().is_none());
        assert_eq!(fetcher.calls(), 0);

        seed(&cache, &store, CategoryFilter::All, Duration::from_secs(60));
        assert!(cache.refresh_if_stale(CategoryFilter::All).await.unwrap().is_none());
        assert_eq!(fetcher.calls(), 0);

        seed(&cache, &store, CategoryFilter::All, Duration::from_secs(45 * 60));
        let refreshed = cache.refresh_if_stale(CategoryFilter::All).await.unwrap();
        assert_eq!(refreshed.unwrap().items.len(), 3);
        assert_eq!(fetcher.calls(), 2);
    }

    #[tokio::test]
    async fn test_persisted_record_shape() {
        let (sources, stub) = two_sources();
        let (cache, store, _) = manager(sources, stub);
        let snapshot = cache.load_with_cache(CategoryFilter::All).await.unwrap();

        let raw = store.get("trendboard_news_all").unwrap().unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();

        assert_eq!(value["timestamp"], snapshot.cache_timestamp);
        assert_eq!(value["data"].as_array().unwrap().len(), 3);
        assert_eq!(value["data"][0]["sourceId"], "t");
    }

    #[tokio::test]
    async fn test_cache_age_and_invalidate() {
        let (sources, stub) = two_sources();
        let (cache, store, _) = manager(sources, stub);
        assert!(cache.cache_age(CategoryFilter::All).is_none());

        seed(&cache, &store, CategoryFilter::All, Duration::from_secs(90));
        let age = cache.cache_age(CategoryFilter::All).unwrap();
        assert!(age >= Duration::from_secs(90) && age < Duration::from_secs(100));
        assert!(matches!(cache.state(CategoryFilter::All), CacheState::Fresh { .. }));

        cache.invalidate(CategoryFilter::All).unwrap();
        assert!(cache.cache_age(CategoryFilter::All).is_none());
    }

    #[test]
    fn test_cache_key_prefix() {
        let (sources, stub) = two_sources();
        let (cache, _, _) = manager(sources, stub);
        assert_eq!(cache.cache_key(CategoryFilter::All), "trendboard_news_all");

        let cache = cache.with_key_prefix("news_");
        assert_eq!(cache.cache_key(CategoryFilter::Only(Category::Tech)), "news_tech");
    }
}
