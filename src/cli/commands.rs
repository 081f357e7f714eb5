use std::collections::HashSet;
use std::time::Duration;

use chrono::DateTime;
use tokio::sync::{mpsc, watch};

use crate::app::{AppContext, Result, TrendError};
use crate::cache::{CacheSnapshot, CacheState};
use crate::domain::{CanonicalItem, Category, CategoryFilter};
use crate::scheduler::{RefreshEvent, Scheduler, SchedulerConfig, Visibility};
use crate::store::Store;

pub fn list_sources(ctx: &AppContext, category: Option<Category>) -> Result<()> {
    let filter = CategoryFilter::from(category);
    let sources: Vec<_> = ctx
        .registry
        .all()
        .iter()
        .filter(|s| filter.matches(s.category))
        .collect();

    if sources.is_empty() {
        println!("No sources");
        return Ok(());
    }

    for source in sources {
        let marker = if source.enabled { "●" } else { " " };
        println!(
            "{} {:<20} {:<22} {:<9} {}",
            marker,
            source.id,
            source.name,
            source.category,
            source.adapter.as_str()
        );
    }

    Ok(())
}

/// Fetch from the network without touching the cache.
pub async fn fetch_news(
    ctx: &AppContext,
    category: Option<Category>,
    source: Option<String>,
) -> Result<()> {
    if let Some(id) = source {
        let descriptor = ctx
            .registry
            .get(&id)
            .ok_or_else(|| TrendError::SourceNotFound(id.clone()))?;
        if !descriptor.enabled {
            println!("Source {} is disabled", id);
            return Ok(());
        }

        let items = ctx.fetch_source_news(&id).await;
        print_items(&items);
        println!("{} items from {}", items.len(), descriptor.name);
        return Ok(());
    }

    let filter = CategoryFilter::from(category);
    let batch = ctx.parallel_fetcher.gather(filter).await;
    let report = batch.report();

    for outcome in &batch.outcomes {
        if let Err(e) = &outcome.result {
            eprintln!("  Error fetching {}: {}", outcome.source_id, e);
        }
    }

    let items = batch.into_items();
    print_items(&items);
    println!(
        "Fetch complete: {} items from {} sources, {} errors",
        report.items, report.succeeded, report.failed
    );
    Ok(())
}

pub async fn load_news(ctx: &AppContext, category: Option<Category>) -> Result<()> {
    let snapshot = ctx.load_with_cache(CategoryFilter::from(category)).await?;
    print_snapshot(&snapshot);
    Ok(())
}

pub async fn refresh_news(ctx: &AppContext, category: Option<Category>) -> Result<()> {
    let snapshot = ctx.force_refresh(CategoryFilter::from(category)).await?;
    print_snapshot(&snapshot);
    Ok(())
}

/// Run the refresh scheduler in the foreground until Ctrl-C.
pub async fn watch_news(
    ctx: &AppContext,
    category: Option<Category>,
    interval: Option<String>,
) -> Result<()> {
    let interval = interval.unwrap_or_else(|| ctx.config.refresh.interval.clone());
    let secs = SchedulerConfig::parse_interval(&interval).map_err(TrendError::Config)?;

    let scheduler = Scheduler::new(
        ctx.session(CategoryFilter::from(category)),
        SchedulerConfig {
            interval: Duration::from_secs(secs),
            load_on_start: true,
        },
    );
    let handle = scheduler.handle();

    // A terminal is always in view.
    let (_visibility_tx, visibility_rx) = watch::channel(Visibility::Visible);
    let (events_tx, mut events_rx) = mpsc::channel(8);
    let task = tokio::spawn(scheduler.run(visibility_rx, events_tx));

    println!(
        "Watching {} (every {}), press Ctrl-C to stop",
        CategoryFilter::from(category),
        SchedulerConfig::format_interval(secs)
    );

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            event = events_rx.recv() => match event {
                Some(RefreshEvent::Updated(snapshot)) => print_snapshot(&snapshot),
                Some(RefreshEvent::Failed(msg)) => eprintln!("Refresh failed: {}", msg),
                None => break,
            },
            _ = &mut ctrl_c => {
                println!("\nStopping...");
                handle.stop();
                break;
            }
        }
    }

    drop(events_rx);
    task.await
        .map_err(|e| TrendError::Other(format!("Scheduler task failed: {}", e)))?;
    Ok(())
}

pub fn show_status(ctx: &AppContext) -> Result<()> {
    let prefix = &ctx.config.cache.key_prefix;
    let stored: HashSet<String> = ctx.store.keys_with_prefix(prefix)?.into_iter().collect();

    if stored.is_empty() {
        println!("Cache is empty");
        return Ok(());
    }

    println!("Cache TTL: {}", format_age(ctx.cache.ttl()));

    let filters = std::iter::once(CategoryFilter::All)
        .chain(Category::ALL.into_iter().map(CategoryFilter::Only));

    let mut known = HashSet::new();
    for filter in filters {
        let key = ctx.cache.cache_key(filter);
        if !stored.contains(&key) {
            continue;
        }
        let status = match ctx.cache.state(filter) {
            CacheState::Fresh { age } => format!("fresh, {} old", format_age(age)),
            CacheState::Stale { age } => format!("stale, {} old", format_age(age)),
            CacheState::Loading => "loading".to_string(),
            CacheState::Empty => "unreadable".to_string(),
        };
        println!("  {:<30} {}", key, status);
        known.insert(key);
    }

    for key in stored.difference(&known) {
        println!("  {:<30} unknown key", key);
    }

    Ok(())
}

fn print_snapshot(snapshot: &CacheSnapshot) {
    print_items(&snapshot.items);
    let origin = if snapshot.from_cache { "cache" } else { "network" };
    println!(
        "{} items from {}, updated {}",
        snapshot.items.len(),
        origin,
        format_timestamp(snapshot.cache_timestamp)
    );
}

fn print_items(items: &[CanonicalItem]) {
    if items.is_empty() {
        println!("No items");
        return;
    }

    for item in items {
        println!(
            "{} [{}] {} ({})\n  {}",
            format_timestamp(item.timestamp),
            item.source_name,
            item.title,
            item.hot,
            item.url
        );
    }
}

fn format_timestamp(millis: i64) -> String {
    DateTime::from_timestamp_millis(millis)
        .map(|d| d.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "                ".to_string())
}

fn format_age(age: Duration) -> String {
    let secs = age.as_secs();
    if secs >= 3600 {
        format!("{}h{}m", secs / 3600, (secs % 3600) / 60)
    } else if secs >= 60 {
        format!("{}m", secs / 60)
    } else {
        format!("{}s", secs)
    }
}
