use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::app::{Result, TrendError};
use crate::domain::item::sort_newest_first;
use crate::domain::{CanonicalItem, CategoryFilter, SourceDescriptor};
use crate::fetcher::Fetcher;
use crate::normalizer::Normalizer;
use crate::registry::SourceRegistry;

pub const DEFAULT_WORKERS: usize = 10;

/// What one source contributed to a batch.
#[derive(Debug)]
pub struct SourceOutcome {
    pub source_id: String,
    pub result: Result<Vec<CanonicalItem>>,
}

/// Every selected source's outcome, in catalog order.
#[derive(Debug, Default)]
pub struct Batch {
    pub outcomes: Vec<SourceOutcome>,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BatchReport {
    pub selected: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub items: usize,
}

impl Batch {
    pub fn report(&self) -> BatchReport {
        let mut report = BatchReport {
            selected: self.outcomes.len(),
            ..BatchReport::default()
        };
        for outcome in &self.outcomes {
            match &outcome.result {
                Ok(items) => {
                    report.succeeded += 1;
                    report.items += items.len();
                }
                Err(_) => report.failed += 1,
            }
        }
        report
    }

    /// True when sources were selected and none of them could be reached.
    pub fn all_failed(&self) -> bool {
        !self.outcomes.is_empty() && self.outcomes.iter().all(|o| o.result.is_err())
    }

    /// Merge successful contributions, newest first.
    pub fn into_items(self) -> Vec<CanonicalItem> {
        let mut items: Vec<CanonicalItem> = self
            .outcomes
            .into_iter()
            .filter_map(|o| o.result.ok())
            .flatten()
            .collect();
        sort_newest_first(&mut items);
        items
    }
}

/// Fan-out/fan-in over the registry.
///
/// Each source runs in its own task; the join waits for every task and a
/// failing source only loses its own contribution.
#[derive(Clone)]
pub struct ParallelFetcher {
    registry: Arc<SourceRegistry>,
    fetcher: Arc<dyn Fetcher + Send + Sync>,
    normalizer: Normalizer,
    semaphore: Arc<Semaphore>,
    source_timeout: Option<Duration>,
}

impl ParallelFetcher {
    pub fn new(registry: Arc<SourceRegistry>, fetcher: Arc<dyn Fetcher + Send + Sync>) -> Self {
        Self::with_workers(registry, fetcher, DEFAULT_WORKERS)
    }

    pub fn with_workers(
        registry: Arc<SourceRegistry>,
        fetcher: Arc<dyn Fetcher + Send + Sync>,
        workers: usize,
    ) -> Self {
        Self {
            normalizer: Normalizer::new(fetcher.clone()),
            registry,
            fetcher,
            semaphore: Arc::new(Semaphore::new(workers.max(1))),
            source_timeout: None,
        }
    }

    /// Bound each source's complete fetch, follow-up requests included.
    pub fn with_source_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.source_timeout = timeout;
        self
    }

    pub fn registry(&self) -> &SourceRegistry {
        &self.registry
    }

    /// Items for one source; unknown, disabled and failing sources yield nothing.
    pub async fn fetch_one(&self, source_id: &str) -> Vec<CanonicalItem> {
        let Some(source) = self.registry.get(source_id) else {
            tracing::debug!("Unknown source: {}", source_id);
            return Vec::new();
        };
        if !source.enabled {
            return Vec::new();
        }

        match self.try_fetch(&source).await {
            Ok(items) => items,
            Err(e) => {
                tracing::warn!("Failed to fetch {}: {}", source.name, e);
                Vec::new()
            }
        }
    }

    /// Merged items from every active source matching `filter`, newest first.
    pub async fn fetch_all(&self, filter: CategoryFilter) -> Vec<CanonicalItem> {
        self.gather(filter).await.into_items()
    }

    /// Run every active source matching `filter` and wait for all of them.
    ///
    /// The per-source tasks belong to this call: dropping the returned future
    /// aborts whatever is still running.
    pub async fn gather(&self, filter: CategoryFilter) -> Batch {
        let sources = self.registry.active(filter);
        let mut tasks = JoinSet::new();
        let mut positions = HashMap::with_capacity(sources.len());
        let mut results: Vec<Option<Result<Vec<CanonicalItem>>>> =
            sources.iter().map(|_| None).collect();

        for (pos, source) in sources.iter().enumerate() {
            let this = self.clone();
            let source = source.clone();

            let handle = tasks.spawn(async move {
                let _permit = match this.semaphore.acquire().await {
                    Ok(permit) => permit,
                    Err(e) => return (pos, Err(TrendError::Other(e.to_string()))),
                };
                (pos, this.try_fetch(&source).await)
            });
            positions.insert(handle.id(), pos);
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((pos, result)) => results[pos] = Some(result),
                Err(e) => {
                    let Some(&pos) = positions.get(&e.id()) else {
                        tracing::error!("Task join error: {}", e);
                        continue;
                    };
                    tracing::error!("Task join error for {}: {}", sources[pos].id, e);
                    results[pos] = Some(Err(TrendError::Other(e.to_string())));
                }
            }
        }

        let outcomes: Vec<SourceOutcome> = sources
            .iter()
            .zip(results)
            .map(|(source, result)| {
                let result = result
                    .unwrap_or_else(|| Err(TrendError::Other("task did not report".into())));
                if let Err(e) = &result {
                    tracing::warn!("Source {} failed: {}", source.id, e);
                }
                SourceOutcome {
                    source_id: source.id.clone(),
                    result,
                }
            })
            .collect();

        let batch = Batch { outcomes };
        let report = batch.report();
        tracing::info!(
            "Fetched {} items for {} ({} sources ok, {} failed)",
            report.items,
            filter,
            report.succeeded,
            report.failed
        );

        batch
    }

    async fn try_fetch(&self, source: &SourceDescriptor) -> Result<Vec<CanonicalItem>> {
        let fetched_at = Utc::now().timestamp_millis();

        let work = async {
            let body = self.fetcher.fetch(&source.endpoint).await?;
            Ok::<_, TrendError>(self.normalizer.normalize(source, &body, fetched_at).await)
        };

        match self.source_timeout {
            Some(limit) => tokio::time::timeout(limit, work)
                .await
                .map_err(|_| TrendError::Timeout {
                    source_id: source.id.clone(),
                    secs: limit.as_secs(),
                })?,
            None => work.await,
        }
    }
}
