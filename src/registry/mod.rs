//! Static catalog of upstream sources.
//!
//! The registry is validated once when it is built and is read-only
//! afterwards. Descriptors are handed out as `Arc`s so spawned fetch tasks
//! can hold them without borrowing the registry.

use std::collections::HashMap;
use std::sync::Arc;

use url::Url;

use crate::app::{Result, TrendError};
use crate::domain::source::ID_PLACEHOLDER;
use crate::domain::{AdapterKind, Category, CategoryFilter, SourceDescriptor};

const RSSHUB: &str = "https://rsshub.app";

#[derive(Debug, Clone)]
pub struct SourceRegistry {
    sources: Vec<Arc<SourceDescriptor>>,
    index: HashMap<String, usize>,
}

impl SourceRegistry {
    /// Build a registry, rejecting catalogs that could never be fetched.
    pub fn new(sources: Vec<SourceDescriptor>) -> Result<Self> {
        let mut index = HashMap::with_capacity(sources.len());

        for (pos, source) in sources.iter().enumerate() {
            validate(source)?;
            if index.insert(source.id.clone(), pos).is_some() {
                return Err(TrendError::Registry(format!(
                    "duplicate source id: {}",
                    source.id
                )));
            }
        }

        Ok(Self {
            sources: sources.into_iter().map(Arc::new).collect(),
            index,
        })
    }

    /// The built-in catalog.
    pub fn builtin() -> Result<Self> {
        Self::new(builtin_sources())
    }

    /// Copy of this registry with the given ids switched off.
    ///
    /// Unknown ids are reported and otherwise ignored.
    pub fn with_disabled<S: AsRef<str>>(&self, ids: &[S]) -> Self {
        let mut sources: Vec<SourceDescriptor> =
            self.sources.iter().map(|s| s.as_ref().clone()).collect();

        for id in ids {
            let id = id.as_ref();
            match self.index.get(id) {
                Some(&pos) => sources[pos].enabled = false,
                None => tracing::warn!("Cannot disable unknown source: {}", id),
            }
        }

        Self {
            sources: sources.into_iter().map(Arc::new).collect(),
            index: self.index.clone(),
        }
    }

    pub fn get(&self, id: &str) -> Option<Arc<SourceDescriptor>> {
        self.index.get(id).map(|&pos| self.sources[pos].clone())
    }

    pub fn all(&self) -> &[Arc<SourceDescriptor>] {
        &self.sources
    }

    /// Enabled sources matching the filter, in catalog order.
    pub fn active(&self, filter: CategoryFilter) -> Vec<Arc<SourceDescriptor>> {
        self.sources
            .iter()
            .filter(|s| s.enabled && filter.matches(s.category))
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

fn validate(source: &SourceDescriptor) -> Result<()> {
    let invalid = |msg: String| -> Result<()> {
        Err(TrendError::Registry(format!("{}: {}", source.id, msg)))
    };

    if source.id.trim().is_empty() {
        return Err(TrendError::Registry("source id must not be empty".into()));
    }
    if source.name.trim().is_empty() {
        return invalid("display name must not be empty".into());
    }
    if let Err(e) = Url::parse(&source.endpoint) {
        return invalid(format!("invalid endpoint {}: {}", source.endpoint, e));
    }

    if source.adapter == AdapterKind::PollById {
        match &source.item_endpoint {
            Some(t) if t.contains(ID_PLACEHOLDER) => {}
            Some(t) => {
                return invalid(format!("item endpoint {} lacks {}", t, ID_PLACEHOLDER));
            }
            None => return invalid("poll-by-id source needs an item endpoint".into()),
        }
    }

    Ok(())
}

fn rsshub(path: &str) -> String {
    format!("{}{}", RSSHUB, path)
}

fn builtin_sources() -> Vec<SourceDescriptor> {
    vec![
        SourceDescriptor::new(
            "github",
            "GitHub Trending",
            Category::Dev,
            AdapterKind::Feed,
            &rsshub("/github/trending/daily/any"),
        )
        .with_style("https://github.githubassets.com/favicons/favicon.svg", "#24292e"),
        SourceDescriptor::new(
            "hackernews",
            "Hacker News",
            Category::Tech,
            AdapterKind::PollById,
            "https://hacker-news.firebaseio.com/v0/topstories.json",
        )
        .with_style("https://news.ycombinator.com/favicon.ico", "#ff6600")
        .with_item_endpoint("https://hacker-news.firebaseio.com/v0/item/{id}.json")
        .with_permalink("https://news.ycombinator.com/item?id={id}"),
        SourceDescriptor::new(
            "v2ex",
            "V2EX",
            Category::Tech,
            AdapterKind::FlatArray,
            "https://www.v2ex.com/api/topics/hot.json",
        )
        .with_style("https://www.v2ex.com/static/icon-192.png", "#1a1a1a")
        .with_permalink("https://www.v2ex.com/t/{id}"),
        SourceDescriptor::new(
            "zhihu",
            "Zhihu Hot List",
            Category::General,
            AdapterKind::Feed,
            &rsshub("/zhihu/hotlist"),
        )
        .with_style("https://static.zhihu.com/heifetz/favicon.ico", "#0084ff"),
        SourceDescriptor::new(
            "weibo",
            "Weibo Hot Search",
            Category::General,
            AdapterKind::Feed,
            &rsshub("/weibo/search/hot"),
        )
        .with_style("https://weibo.com/favicon.ico", "#ff8200"),
        SourceDescriptor::new(
            "kr36",
            "36Kr",
            Category::Tech,
            AdapterKind::Feed,
            &rsshub("/36kr/newsflashes"),
        )
        .with_style("https://36kr.com/favicon.ico", "#0076f6"),
        SourceDescriptor::new(
            "arxiv",
            "arXiv CS",
            Category::Academic,
            AdapterKind::Feed,
            &rsshub("/arxiv/cs.AI"),
        )
        .with_style("https://arxiv.org/favicon.ico", "#b31b1b"),
        SourceDescriptor::new(
            "producthunt",
            "Product Hunt",
            Category::Tech,
            AdapterKind::Feed,
            &rsshub("/producthunt/today"),
        )
        .with_style("https://ph-static.imgix.net/ph-favicon.ico", "#da552f"),
        SourceDescriptor::new(
            "reddit-programming",
            "r/programming",
            Category::Dev,
            AdapterKind::ListingWithChildren,
            "https://www.reddit.com/r/programming/hot.json",
        )
        .with_style("https://www.reddit.com/favicon.ico", "#ff4500")
        .with_permalink("https://www.reddit.com{id}"),
        SourceDescriptor::new(
            "github-search",
            "GitHub Popular",
            Category::Dev,
            AdapterKind::SearchResult,
            "https://api.github.com/search/repositories?q=stars:%3E1000&sort=updated&order=desc&per_page=20",
        )
        .with_style("https://github.githubassets.com/favicons/favicon.svg", "#6e5494")
        .with_permalink("https://github.com/{id}"),
        SourceDescriptor::new(
            "lobsters",
            "Lobsters",
            Category::Dev,
            AdapterKind::FlatArray,
            "https://lobste.rs/hottest.json",
        )
        .with_style("https://lobste.rs/favicon.ico", "#ac130d")
        .with_permalink("https://lobste.rs/s/{id}"),
    ]
}
