use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::app::error::{Result, TrendError};
use crate::app::Session;
use crate::cache::{CacheManager, CacheSnapshot};
use crate::config::Config;
use crate::domain::{CanonicalItem, CategoryFilter};
use crate::fetcher::http_fetcher::HttpFetcher;
use crate::fetcher::parallel::ParallelFetcher;
use crate::fetcher::Fetcher;
use crate::registry::SourceRegistry;
use crate::store::SqliteStore;

pub struct AppContext {
    pub config: Config,
    pub registry: Arc<SourceRegistry>,
    pub store: Arc<SqliteStore>,
    pub fetcher: Arc<dyn Fetcher + Send + Sync>,
    pub parallel_fetcher: ParallelFetcher,
    pub cache: Arc<CacheManager<SqliteStore>>,
}

impl AppContext {
    pub fn new(config: Config, db_path: Option<PathBuf>) -> Result<Self> {
        let db_path = match db_path {
            Some(p) => p,
            None => Self::default_db_path()?,
        };

        let store = Arc::new(SqliteStore::new(&db_path)?);
        Self::build(config, store)
    }

    pub fn in_memory(config: Config) -> Result<Self> {
        let store = Arc::new(SqliteStore::in_memory()?);
        Self::build(config, store)
    }

    fn build(config: Config, store: Arc<SqliteStore>) -> Result<Self> {
        let registry = Arc::new(SourceRegistry::builtin()?.with_disabled(&config.sources.disabled));
        let fetcher: Arc<dyn Fetcher + Send + Sync> = Arc::new(HttpFetcher::new(&config.fetch)?);

        let source_timeout = match config.fetch.source_timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        };
        let parallel_fetcher =
            ParallelFetcher::with_workers(registry.clone(), fetcher.clone(), config.fetch.workers)
                .with_source_timeout(source_timeout);

        let cache = Arc::new(
            CacheManager::new(store.clone(), parallel_fetcher.clone())
                .with_ttl(Duration::from_secs(config.cache.ttl_secs))
                .with_key_prefix(&config.cache.key_prefix),
        );

        Ok(Self {
            config,
            registry,
            store,
            fetcher,
            parallel_fetcher,
            cache,
        })
    }

    fn default_db_path() -> Result<PathBuf> {
        let data_dir = dirs::data_dir()
            .ok_or_else(|| TrendError::Config("Could not find data directory".into()))?;
        let trendboard_dir = data_dir.join("trendboard");
        std::fs::create_dir_all(&trendboard_dir)?;
        Ok(trendboard_dir.join("trendboard.db"))
    }

    /// A consumer session sharing this context's cache.
    pub fn session(&self, category: CategoryFilter) -> Session<SqliteStore> {
        Session::new(self.cache.clone(), category)
    }

    pub async fn fetch_source_news(&self, source_id: &str) -> Vec<CanonicalItem> {
        self.parallel_fetcher.fetch_one(source_id).await
    }

    pub async fn fetch_all_news(&self, category: CategoryFilter) -> Vec<CanonicalItem> {
        self.parallel_fetcher.fetch_all(category).await
    }

    pub async fn load_with_cache(&self, category: CategoryFilter) -> Result<CacheSnapshot> {
        self.cache.load_with_cache(category).await
    }

    pub async fn force_refresh(&self, category: CategoryFilter) -> Result<CacheSnapshot> {
        self.cache.force_refresh(category).await
    }
}
