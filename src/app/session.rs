use std::sync::Arc;

use crate::app::Result;
use crate::cache::{CacheManager, CacheSnapshot};
use crate::domain::CategoryFilter;
use crate::store::Store;

/// Caller-owned view state: the selected category and when its data was
/// produced. Every trigger goes through the shared [`CacheManager`], which
/// owns the per-key in-flight guard.
pub struct Session<S: Store> {
    cache: Arc<CacheManager<S>>,
    category: CategoryFilter,
    last_updated: Option<i64>,
}

impl<S: Store + Send + Sync> Session<S> {
    pub fn new(cache: Arc<CacheManager<S>>, category: CategoryFilter) -> Self {
        Self {
            cache,
            category,
            last_updated: None,
        }
    }

    pub fn category(&self) -> CategoryFilter {
        self.category
    }

    /// Time the currently shown batch was produced.
    pub fn last_updated(&self) -> Option<i64> {
        self.last_updated
    }

    pub fn cache(&self) -> &CacheManager<S> {
        &self.cache
    }

    /// Switch category and load it, from cache when fresh.
    pub async fn select_category(&mut self, category: CategoryFilter) -> Result<CacheSnapshot> {
        if self.category != category {
            self.category = category;
            self.last_updated = None;
        }
        self.load().await
    }

    pub async fn load(&mut self) -> Result<CacheSnapshot> {
        let snapshot = self.cache.load_with_cache(self.category).await?;
        self.last_updated = Some(snapshot.cache_timestamp);
        Ok(snapshot)
    }

    pub async fn refresh(&mut self) -> Result<CacheSnapshot> {
        let snapshot = self.cache.force_refresh(self.category).await?;
        self.last_updated = Some(snapshot.cache_timestamp);
        Ok(snapshot)
    }

    /// Visibility regained: reload only if the shown data went stale.
    pub async fn on_visible(&mut self) -> Result<Option<CacheSnapshot>> {
        let snapshot = self.cache.refresh_if_stale(self.category).await?;
        if let Some(s) = &snapshot {
            self.last_updated = Some(s.cache_timestamp);
        }
        Ok(snapshot)
    }
}
