//! # Trendboard
//!
//! Trending news from many upstream sources, merged into one list.
//!
//! ## Architecture
//!
//! ```text
//! Registry → ParallelFetcher → Normalizer → CacheManager → Session / Scheduler
//! ```
//!
//! Each source speaks one of a handful of response shapes (RSS/Atom, id
//! lists with per-item lookups, listing envelopes, search results, flat
//! arrays). The normalizer turns all of them into [`CanonicalItem`]s; the
//! cache keeps the merged batch per category until it goes stale.
//!
//! ## Quick Start
//!
//! ```bash
//! # Show the source catalog
//! trendboard sources
//!
//! # Load news, served from the cache while fresh
//! trendboard load --category dev
//!
//! # Keep reloading every five minutes
//! trendboard watch --interval 5m
//! ```
//!
//! [`CanonicalItem`]: domain::CanonicalItem

/// Application context, consumer sessions and error handling.
///
/// The [`AppContext`](app::AppContext) struct wires together registry,
/// fetcher, cache and store from a [`Config`](config::Config).
pub mod app;

/// Read-through cache over the key-value store.
///
/// - [`CacheManager`](cache::CacheManager): freshness checks and per-key in-flight guard
/// - [`CacheRecord`](cache::CacheRecord): persisted `{data, timestamp}` shape
pub mod cache;

/// Command-line interface using clap.
///
/// - `sources [--category C]` - List the source catalog
/// - `fetch [--category C | --source ID]` - Fetch without the cache
/// - `load [--category C]` - Load through the cache
/// - `refresh [--category C]` - Discard the cache and fetch
/// - `watch [--category C] [--interval 5m]` - Background refresh until Ctrl-C
/// - `status` - Age of each cached batch
pub mod cli;

/// Configuration loaded from `~/.config/trendboard/config.toml`.
pub mod config;

/// Core domain models.
///
/// - [`Category`](domain::Category) and [`CategoryFilter`](domain::CategoryFilter)
/// - [`SourceDescriptor`](domain::SourceDescriptor) with its [`AdapterKind`](domain::AdapterKind)
/// - [`CanonicalItem`](domain::CanonicalItem): the unified item schema
pub mod domain;

/// HTTP fetching and the fan-out orchestrator.
///
/// - [`Fetcher`](fetcher::Fetcher): Async trait for a single GET
/// - [`HttpFetcher`](fetcher::http_fetcher::HttpFetcher): reqwest-based implementation
/// - [`ParallelFetcher`](fetcher::parallel::ParallelFetcher): Concurrent per-source fetching with semaphore
pub mod fetcher;

/// One adapter per upstream response shape.
pub mod normalizer;

/// Static source catalog with construction-time validation.
pub mod registry;

/// Interval and visibility driven background refresh.
pub mod scheduler;

/// SQLite key-value persistence.
///
/// - [`Store`](store::Store): Trait defining storage operations
/// - [`SqliteStore`](store::SqliteStore): SQLite implementation
pub mod store;
